//! Core data types for the tagmage catalog.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Maximum length of a file title, in bytes.
pub const TITLE_MAX: usize = 4096;

/// Maximum length of a tag name, in bytes.
pub const TAG_MAX: usize = 4096;

/// Location sentinel for an ephemeral in-memory store.
pub const MEMORY: &str = ":memory:";

/// A file tracked by the catalog. Only metadata lives here; the bytes are
/// stored elsewhere, keyed by `id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct File {
    /// Store-assigned identifier, never reused
    pub id: i64,

    /// Free-form user text, not unique
    pub title: String,
}

/// Where a store keeps its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// Non-persistent, discarded on close.
    Memory,
    /// A SQLite database file.
    Path(PathBuf),
}

impl Location {
    pub fn is_memory(&self) -> bool {
        matches!(self, Location::Memory)
    }
}

impl From<&str> for Location {
    fn from(s: &str) -> Self {
        if s == MEMORY {
            Location::Memory
        } else {
            Location::Path(PathBuf::from(s))
        }
    }
}

impl From<&Path> for Location {
    fn from(path: &Path) -> Self {
        Location::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for Location {
    fn from(path: PathBuf) -> Self {
        Location::Path(path)
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Location::Memory => write!(f, "{}", MEMORY),
            Location::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Input rejected before it reaches the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    TitleTooLong(usize),
    EmptyTag,
    TagTooLong(usize),
    InvalidTag(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::TitleTooLong(len) => {
                write!(f, "title is {} bytes, limit is {}", len, TITLE_MAX)
            }
            ValidationError::EmptyTag => write!(f, "tag cannot be empty"),
            ValidationError::TagTooLong(len) => write!(f, "tag is {} bytes, limit is {}", len, TAG_MAX),
            ValidationError::InvalidTag(tag) => write!(f, "invalid tag '{}'", tag),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Check a title against the length limit. Empty titles are allowed.
pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    if title.len() > TITLE_MAX {
        return Err(ValidationError::TitleTooLong(title.len()));
    }
    Ok(())
}
