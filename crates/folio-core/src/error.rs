//! Error types for folio.

use thiserror::Error;

/// Result type alias using folio's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for folio operations.
///
/// Validation variants (`InvalidInput`, `FileTooLarge`, `QuotaExceeded`)
/// render as the exact message shown to the user.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Project not found
    #[error("Project not found: {0}")]
    ProjectNotFound(uuid::Uuid),

    /// A file is larger than the admission limit
    #[error("File size exceeds {}MB limit", .limit / (1024 * 1024))]
    FileTooLarge { size: u64, limit: u64 },

    /// A project-count or project-size quota would be exceeded
    #[error("{0}")]
    QuotaExceeded(String),

    /// Invalid input
    #[error("{0}")]
    InvalidInput(String),

    /// Blob storage operation failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// No authenticated identity
    #[error("{0}")]
    Unauthorized(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The error raised when an operation needs an identity and none is present.
    pub fn not_authenticated() -> Self {
        Error::Unauthorized("User not authenticated".to_string())
    }

    /// Whether this error was raised before any remote call was made.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_) | Error::FileTooLarge { .. } | Error::QuotaExceeded(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
