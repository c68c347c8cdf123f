use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    /// Missing credential or bad CLI usage.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The server address cannot be served by any known transport.
    #[error("Invalid server address: {0}")]
    TransportValidation(String),

    #[error("Tool registry unavailable: {0}")]
    RegistryUnavailable(String),

    #[error("Tool '{tool}' failed: {message}")]
    ToolInvocation { tool: String, message: String },

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RelayError {
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        RelayError::ToolInvocation {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RelayError>;
