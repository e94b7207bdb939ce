use thiserror::Error;

/// Errors surfaced by a [`SplitReader`](crate::SplitReader).
///
/// Every variant is fatal for the reader instance that produced it. A
/// cancelled blocking fetch is not an error and never shows up here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SplitReaderError {
    #[error("Do not recognize split change: {0}")]
    UnrecognizedChangeKind(String),

    #[error("Caught unexpected interruption while reading split {split_id} in non-blocking mode")]
    UnexpectedInterruption { split_id: String },

    #[error("Split reader contract violated: {0}")]
    ContractViolation(String),

    #[error("Invalid split reader configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, SplitReaderError>;
