//! Error types for the boleto tools library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the boleto tools library
#[derive(Error, Debug)]
pub enum Error {
    /// Entity field failed validation (never stored)
    #[error("validation error: {0}")]
    Validation(String),

    /// CSV content is structurally unreadable
    #[error("CSV parse error: {0}")]
    Parse(String),

    /// PDF cannot be loaded, assembled or serialized
    #[error("document error: {0}")]
    Document(String),

    /// Bulk save rejected: active boletos already exist for these lotes
    #[error("bulk save rejected: {}", .0.join("; "))]
    Conflict(Vec<String>),

    /// An operation found no usable entities to work on
    #[error("{0}")]
    NotFound(String),

    /// File not found
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// Storage error
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
