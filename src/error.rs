//! Error types for score analysis
//!
//! Distinguishes fatal invariant violations (bugs or corrupt data) from
//! content-quality problems, which are reported through validity flags
//! instead of errors.

use thiserror::Error;

/// Result type for all extraction operations
pub type ExtractorResult<T> = Result<T, ExtractorError>;

/// Top-level extraction error type
#[derive(Debug, Error)]
pub enum ExtractorError {
    /// Reading the score file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The score format has no reader implementation
    #[error("unsupported score format: {0}")]
    UnsupportedFormat(String),

    /// The score name does not follow the SymbTr naming convention
    #[error("malformed score name: {0}")]
    MalformedScoreName(String),

    /// A row of the score file could not be parsed
    #[error("malformed score content: {0}")]
    MalformedScore(String),

    /// A reference-data table failed to deserialize
    #[error("reference data error: {0}")]
    ReferenceData(#[from] serde_json::Error),

    /// An internal assumption was broken; indicates a bug or corrupt input
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// A caller-supplied parameter is outside its valid range
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}
