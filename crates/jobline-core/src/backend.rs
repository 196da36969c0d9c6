//! The storage backend contract.

use async_trait::async_trait;

use crate::{DequeueFilter, JobAttrs, JobId, NewJob, Result};

/// The operation set every jobline storage engine must expose.
///
/// The pipeline driver is polymorphic over this trait, so a relational,
/// document, or in-memory store can be substituted without touching the
/// driver. All mutual exclusion lives behind `dequeue`: implementations must
/// guarantee that at most one concurrent caller claims any given job, using
/// the store's own atomic conditional-update primitive rather than in-process
/// locks.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Persist a new job with a fresh id, `created_at` = now, and status
    /// `free`. Returns the freshly loaded record, re-read from the store, so
    /// the caller observes exactly what is durable (including the assigned
    /// id) without a second query.
    async fn enqueue(&self, job: NewJob) -> Result<JobAttrs>;

    /// Atomically claim the oldest free job matching the filter, or `None`
    /// when no eligible job exists. A claimed job is `locked`, stamped with a
    /// claim token and claim time, and invisible to every other caller.
    async fn dequeue(&self, filter: &DequeueFilter) -> Result<Option<JobAttrs>>;

    /// Look up one job by id. No locking, no state change.
    async fn find(&self, id: JobId) -> Result<Option<JobAttrs>>;

    /// Irreversibly remove every record. Test/reset use only; fails loudly
    /// if the store refuses rather than silently doing nothing.
    async fn clear(&self) -> Result<()>;

    /// Delete a claimed job's record. Terminal: no further read of this id
    /// will succeed. A mapping without an id is a benign no-op.
    async fn complete(&self, attrs: &JobAttrs) -> Result<()>;

    /// Return a claimed job to circulation: status back to `free`, claim
    /// token and claim time cleared, updated type and payload persisted.
    /// `className` is preserved from the original enqueue, never resubmitted.
    /// A mapping without an id is a benign no-op.
    async fn reset(&self, attrs: &JobAttrs) -> Result<()>;

    /// Park a claimed job as `failed` with updated type and payload. Failed
    /// jobs are excluded from every future `dequeue`. A mapping without an id
    /// is a benign no-op.
    async fn fail(&self, attrs: &JobAttrs) -> Result<()>;
}
