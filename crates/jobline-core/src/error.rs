//! Error types shared by every jobline backend.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The underlying store could not be reached or a write could not commit.
    /// Propagated to the caller as-is; backends never retry internally.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A stored attribute payload could not be decoded back into a mapping,
    /// whether the bytes are malformed or hold the wrong shape. The affected
    /// record cannot be reconstructed until it is repaired by hand.
    #[error("corrupt payload: {0}")]
    CorruptPayload(String),

    /// A write raced a constraint in the store. For dequeue callers this means
    /// "no job available"; for enqueue it should be escalated.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// A stored row does not satisfy the record invariants, e.g. an
    /// unrecognized status value.
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

pub type Result<T> = std::result::Result<T, Error>;
