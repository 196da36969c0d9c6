//! PostgreSQL storage backend for the jobline work queue.
//!
//! Implements the `Backend` contract on top of a shared `jobline_jobs` table.
//! Job claiming uses a single conditional UPDATE with `FOR UPDATE SKIP LOCKED`,
//! so mutual exclusion between workers is enforced by the database, not by
//! in-process locks.

pub mod config;
pub mod store;

pub use config::StoreConfig;
pub use store::PgStore;
