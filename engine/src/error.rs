//! Error types for the medisync engine.

use crate::OperationId;
use thiserror::Error;

/// All possible errors from the medisync engine.
///
/// These surface when decoding persisted queue rows back into typed
/// operations; a malformed row is reported, never panicked on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("unknown store: {0}")]
    UnknownStore(String),

    #[error("unknown operation kind: {0}")]
    UnknownOperationKind(String),

    #[error("unknown pass outcome: {0}")]
    UnknownOutcome(String),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("operation {0} is missing its payload")]
    MissingPayload(OperationId),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
