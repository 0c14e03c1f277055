use room_session_core::application::runtime::QueueError;
use room_session_core::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Command rejected: {0}")]
    Queue(#[from] QueueError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

impl CliError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        CliError::InvalidInput(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, CliError>;
