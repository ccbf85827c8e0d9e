//! Error type shared by the storage, history and user modules.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WikiError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Page not found: {0}")]
    PageNotFound(String),

    #[error("Page already exists: {0}")]
    PageExists(String),

    #[error("Possible write attempt outside content directory: {0}")]
    OutsideRoot(String),

    #[error("Invalid page url: {0:?}")]
    InvalidUrl(String),

    #[error("Invalid search pattern: {0}")]
    InvalidSearch(#[from] regex::Error),

    #[error("No revision {timestamp} for page {url}")]
    RevisionNotFound { url: String, timestamp: String },

    #[error("Rating must be between 1 and 5, got {0}")]
    InvalidRating(u32),

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("Invalid user name: {0:?}")]
    InvalidUserName(String),

    #[error("User not found: {0}")]
    UserNotFound(String),
}

pub type Result<T, E = WikiError> = std::result::Result<T, E>;
