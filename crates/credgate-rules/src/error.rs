//! Error types for rule compilation
//!
//! Compilation is atomic: any error discards the whole rule set, so the
//! only error a caller sees is the first problem found in the text.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A rejected rule specification.
///
/// `offset` is a byte index into the compiled text pointing at the
/// offending token, suitable for underlining it in an error report.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("at offset {offset}: {message}")]
pub struct ParseError {
    /// Byte offset into the rule text.
    pub offset: usize,
    /// Human-readable reason.
    pub message: String,
}

impl ParseError {
    /// Create a new parse error.
    ///
    /// # Arguments
    ///
    /// * `offset` - Byte offset of the offending token
    /// * `message` - Reason the text was rejected
    pub fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// Result type for rule compilation.
pub type ParseResult<T> = Result<T, ParseError>;
