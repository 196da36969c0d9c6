//! In-memory storage backend for the jobline work queue.
//!
//! Implements the same `Backend` contract as the PostgreSQL store over a
//! process-local map. Useful for tests and for running a pipeline without a
//! database; jobs do not survive the process.

pub mod store;

pub use store::MemoryStore;
