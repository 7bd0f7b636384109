//! Error types for the catalogue crate.
//!
//! Only loading a feed can fail. Store queries never return errors: a missing
//! film, person or rating is an empty answer (`None`, `false` or an empty
//! `Vec`), not a failure.

use thiserror::Error;

/// Errors raised while reading and validating a catalogue feed
#[derive(Error, Debug)]
pub enum CatalogueError {
    /// Feed file is not in the feed directory
    #[error("Feed file not found: {path}")]
    FileNotFound { path: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A line split into the wrong number of `::` fields
    #[error("{file} line {line}: expected {expected} fields, found {found}")]
    FieldCountMismatch {
        file: String,
        line: usize,
        expected: usize,
        found: usize,
    },

    /// A field that should be a number, date or timestamp isn't one
    #[error("{file} line {line}: {reason}")]
    ParseError {
        file: String,
        line: usize,
        reason: String,
    },

    /// A field parsed but holds a value outside its domain
    #[error("Invalid {field}: {value:?}")]
    InvalidValue { field: String, value: String },

    /// A film the caller asked for by id is not catalogued
    #[error("{entity} {id} is not in the catalogue")]
    MissingReference { entity: String, id: u32 },

    /// The stores disagree with each other after loading
    #[error("Catalogue inconsistent: {0}")]
    ValidationError(String),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, CatalogueError>;
