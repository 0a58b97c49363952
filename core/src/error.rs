//! Error types for the mapping pipeline.
//!
//! Every variant signals a data or catalog defect that needs a human
//! correction; none of them is retried.

use thiserror::Error;

/// Fatal conditions raised by the pipeline stages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    /// An override substitution found no row spelled like its source.
    #[error("no mapping found for substitution source {existing:?}")]
    MissingSubstitutionSource {
        /// Representation the substitution expected to find.
        existing: String,
    },

    /// A representation matched no shape descriptor in the catalog.
    #[error("no pattern for {representation:?} (U+{charcode:04X})")]
    UnclassifiedRepresentation {
        /// Charcode of the offending row.
        charcode: u32,
        /// Normalized representation that failed to classify.
        representation: String,
    },

    /// A shape pattern does not compile as a regular expression.
    #[error("invalid shape pattern {pattern:?}: {reason}")]
    InvalidShapePattern {
        /// Source of the pattern.
        pattern: String,
        /// Compiler message.
        reason: String,
    },

    /// A shape pattern uses syntax the grammar emitter cannot lower.
    #[error("cannot lower shape {pattern:?} at offset {position}: {reason}")]
    UnsupportedShapeSyntax {
        /// Source of the pattern.
        pattern: String,
        /// Byte offset of the offending token.
        position: usize,
        /// What was not understood.
        reason: String,
    },

    /// A charcode is not a Unicode scalar value.
    #[error("invalid code point: 0x{0:X}")]
    InvalidCodepoint(u32),
}

/// Convenience alias for results with [`MappingError`].
pub type Result<T> = std::result::Result<T, MappingError>;
