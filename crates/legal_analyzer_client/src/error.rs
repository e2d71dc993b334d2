//! crates/legal_analyzer_client/src/error.rs

use legal_analyzer_core::ports::PortError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid value for {0}: {1}")]
    Config(String, String),
}

impl From<ClientError> for PortError {
    fn from(e: ClientError) -> Self {
        PortError::Unexpected(e.to_string())
    }
}
