//! Error types for SQLite mapping storage.
//!
//! Provides a unified error type covering database access, conversion,
//! migration and validation failures, plus the pipeline and source errors
//! a build can raise.

use thiserror::Error;

/// Errors that can occur during SQLite mapping operations.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// SQLite database operation failure.
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// A fatal pipeline condition raised during a build.
    #[error(transparent)]
    Mapping(#[from] texmap_core::MappingError),

    /// A source document could not be read.
    #[error("source error: {0}")]
    Source(#[from] texmap_sources::SourceError),

    /// Stored value could not be converted back into a mapping type.
    #[error("conversion error: {0}")]
    ConversionError(String),

    /// Migration lifecycle operation failure.
    #[error("migration error: {0}")]
    MigrationError(String),

    /// Table prefix contains invalid characters.
    #[error("invalid prefix '{0}': must contain only alphanumeric characters and underscores")]
    InvalidPrefix(String),
}

/// Convenience alias for results with [`SqliteError`].
pub type Result<T> = std::result::Result<T, SqliteError>;
