mod bus;

pub use bus::{EventBus, InboundMessage};
