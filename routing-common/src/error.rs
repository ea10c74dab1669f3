//! Error types for book ingestion.
//!
//! The routing engine itself has no recoverable failure modes: misuse of
//! the book (removing from an empty side, over-reducing a level, looking
//! up an unknown venue) is a programmer error and panics, while running
//! out of liquidity is a normal outcome visible in the plan's fulfillment
//! percentage. The fallible surface is loading books from the outside
//! world.

use thiserror::Error;

/// Errors while loading an order-book snapshot from CSV.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LoadError {
    /// Row did not split into the expected `price,volume,type` fields
    #[error("line {line}: expected 3 fields, got {count}")]
    FieldCount { line: usize, count: usize },

    /// Price field failed to parse as a decimal number
    #[error("line {line}: invalid price '{value}': {reason}")]
    InvalidPrice {
        line: usize,
        value: String,
        reason: String,
    },

    /// Volume field failed to parse as a decimal number
    #[error("line {line}: invalid volume '{value}': {reason}")]
    InvalidVolume {
        line: usize,
        value: String,
        reason: String,
    },

    /// Volume field parsed but is not strictly positive
    #[error("line {line}: volume '{value}' must be positive")]
    NonPositiveVolume { line: usize, value: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
