//! Core domain types and traits for the jobline work queue.
//!
//! This crate contains:
//! - Job identifiers, statuses, and record types
//! - The attribute codec used for opaque job payloads
//! - The `Backend` trait every storage engine implements
//! - Dequeue filters and the shared error taxonomy

pub mod backend;
pub mod codec;
pub mod error;
pub mod filter;
pub mod id;
pub mod job;

pub use backend::Backend;
pub use error::{Error, Result};
pub use filter::DequeueFilter;
pub use id::JobId;
pub use job::{JobAttrs, JobStatus, NewJob};
