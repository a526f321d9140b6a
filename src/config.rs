use std::env;

// ============================================================================
// Configuration - resolved once at process start
// ============================================================================
//
// The resolved Config is shared by reference for the lifetime of the
// process; invocations read through it and never mutate it.
//
// ============================================================================

const TABLE_NAME_VAR: &str = "EVENT_STORE_TABLE_NAME";
const BACKEND_VAR: &str = "EVENT_STORE_BACKEND";
const SCYLLA_NODE_VAR: &str = "SCYLLA_NODE";
const HTTP_PORT_VAR: &str = "HTTP_PORT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Scylla,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Logical name of the backing store table.
    pub table_name: String,
    pub backend: StoreBackend,
    pub scylla_node: String,
    pub http_port: u16,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let table_name =
            env::var(TABLE_NAME_VAR).map_err(|_| ConfigError::Missing(TABLE_NAME_VAR))?;
        // The table name ends up inside CQL statements, where identifiers
        // cannot be bound as parameters. Reject anything but a plain one.
        if table_name.is_empty()
            || !table_name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ConfigError::Invalid {
                var: TABLE_NAME_VAR,
                value: table_name,
            });
        }

        let backend = match env::var(BACKEND_VAR) {
            Ok(value) => match value.as_str() {
                "scylla" => StoreBackend::Scylla,
                "memory" => StoreBackend::Memory,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: BACKEND_VAR,
                        value,
                    })
                }
            },
            Err(_) => StoreBackend::Scylla,
        };

        let scylla_node = env::var(SCYLLA_NODE_VAR).unwrap_or_else(|_| "127.0.0.1:9042".to_string());

        let http_port = match env::var(HTTP_PORT_VAR) {
            Ok(value) => value.parse().map_err(|_| ConfigError::Invalid {
                var: HTTP_PORT_VAR,
                value,
            })?,
            Err(_) => 8080,
        };

        Ok(Self {
            table_name,
            backend,
            scylla_node,
            http_port,
        })
    }
}
