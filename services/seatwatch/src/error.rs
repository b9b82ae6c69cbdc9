//! Error types for the seatwatch service

/// Errors that can occur in the seatwatch service
#[derive(Debug, thiserror::Error)]
pub enum SeatWatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Usage error: {0}")]
    Usage(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Authorization failed: {0}")]
    Auth(String),

    #[error("Seat query failed: {0}")]
    Fetch(String),

    #[error("Alert delivery failed: {0}")]
    Alert(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for seatwatch operations
pub type Result<T> = std::result::Result<T, SeatWatchError>;
