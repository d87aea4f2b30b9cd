//! Error types for the store module.

use certmint_core::{IssuerId, TemplateId};
use thiserror::Error;

/// Errors that can occur during store operations.
///
/// A code collision is not an error; see
/// [`InsertResult::CodeCollision`](crate::InsertResult::CodeCollision).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// An issuer with this name already exists.
    #[error("issuer already exists: {0}")]
    DuplicateIssuer(String),

    /// Referenced issuer does not exist.
    #[error("unknown issuer: {0}")]
    UnknownIssuer(IssuerId),

    /// Referenced template does not exist.
    #[error("unknown template: {0}")]
    UnknownTemplate(TemplateId),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A lock guarding the store was poisoned.
    #[error("store lock poisoned: {0}")]
    Lock(String),

    /// A blocking task failed to complete.
    #[error("blocking task failed: {0}")]
    Task(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
