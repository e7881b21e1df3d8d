//! Error types for the ROM browser.

use thiserror::Error;

/// Errors that can occur while browsing or loading.
///
/// None of these are fatal: the browser always returns to a navigable
/// listing after reporting one.
#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Path is too long: {0}")]
    PathTooLong(String),

    #[error("Out of memory: too many files! (limit {0})")]
    OutOfCapacity(usize),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Unknown file type: {0}")]
    UnknownFileType(String),

    #[error("{0}")]
    InvalidArchiveContent(String),

    #[error("Error opening archive: {0}")]
    ArchiveOpenFailed(String),

    #[error("Error loading game: {0}")]
    LoadFailed(String),

    #[error("No entry matching \"{0}\"")]
    NoMatch(String),

    #[error("Listing cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for browser operations.
pub type BrowserResult<T> = Result<T, BrowserError>;
