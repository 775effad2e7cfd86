//! Error type shared by the store, storage and filter layers.

use crate::types::ValidationError;

/// Errors returned by catalog operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Engine-level failure, carrying SQLite's diagnostic text.
    Store(String),
    /// No file record with this id.
    NotFound(i64),
    /// Title or tag rejected before reaching the database.
    InvalidInput(ValidationError),
    /// Unrecognized `:` flag in a filter list.
    InvalidFilter(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Store(msg) => write!(f, "store error: {}", msg),
            Error::NotFound(id) => write!(f, "file not found: {}", id),
            Error::InvalidInput(e) => write!(f, "invalid input: {}", e),
            Error::InvalidFilter(flag) => write!(f, "'{}' isn't a valid flag", flag),
        }
    }
}

impl std::error::Error for Error {}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(code, Some(msg)) => {
                Error::Store(format!("({}) {}", code.extended_code, msg))
            }
            rusqlite::Error::SqliteFailure(code, None) => {
                Error::Store(format!("({}) {}", code.extended_code, code))
            }
            other => Error::Store(other.to_string()),
        }
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Error::InvalidInput(err)
    }
}
