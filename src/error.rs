use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid {field}: {value:?} is not a positive number")]
    InvalidInput { field: &'static str, value: String },

    #[error("Webcam not running")]
    NotRunning,

    #[error("Capture unavailable: {0}")]
    CaptureUnavailable(String),

    #[error("Invalid recording at line {line}: {reason}")]
    InvalidRecording { line: usize, reason: String },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
