use thiserror::Error;

use crate::models::QuotaExceededContext;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Quota exceeded: \"{}\" ({:.2} MB) does not fit in {:.2} MB available", .0.file_name, .0.file_size_mb, .0.available_mb)]
    QuotaExceeded(QuotaExceededContext),

    #[error("Rejected by server: {0}")]
    RemoteRejected(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Another upload is already in progress")]
    UploadInProgress,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        // A body we cannot parse is a transport failure, not a structured
        // decline from the server.
        AppError::Network(format!("Malformed response: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
