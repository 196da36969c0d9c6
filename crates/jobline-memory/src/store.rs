//! The in-memory job store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jobline_core::codec;
use jobline_core::{Backend, DequeueFilter, Error, JobAttrs, JobId, JobStatus, NewJob, Result};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// One stored job. The payload stays codec-encoded so corrupt bytes surface
/// the same way they would from a real store.
#[derive(Debug, Clone)]
struct StoredJob {
    id: JobId,
    seq: u64,
    created_at: DateTime<Utc>,
    status: JobStatus,
    class_name: String,
    job_type: String,
    lock_uuid: Option<Uuid>,
    locked_at: Option<DateTime<Utc>>,
    attributes: Vec<u8>,
}

impl StoredJob {
    fn load(&self) -> Result<JobAttrs> {
        let payload = codec::decode(&self.attributes)?;
        Ok(JobAttrs::from_row(
            self.id,
            self.status,
            &self.class_name,
            &self.job_type,
            payload,
        ))
    }
}

/// Job store backed by a process-local map.
///
/// The claim transition runs under the map's write guard, which stands in for
/// the database's atomic conditional update: concurrent `dequeue` calls
/// serialize on the guard, so each job is claimed by exactly one caller.
#[derive(Default)]
pub struct MemoryStore {
    jobs: RwLock<HashMap<JobId, StoredJob>>,
    // Tie-break for jobs created within one timestamp tick, keeping FIFO
    // order deterministic.
    seq: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Backend for MemoryStore {
    async fn enqueue(&self, job: NewJob) -> Result<JobAttrs> {
        let id = JobId::new();
        let stored = StoredJob {
            id,
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            created_at: Utc::now(),
            status: JobStatus::Free,
            class_name: job.class_name,
            job_type: job.job_type,
            lock_uuid: None,
            locked_at: None,
            attributes: codec::encode(&job.payload)?,
        };

        // Load from what is stored, so the caller sees the durable shape.
        let loaded = stored.load()?;

        let mut jobs = self.jobs.write().await;
        jobs.insert(id, stored);
        debug!(job_id = %id, "enqueued job");

        Ok(loaded)
    }

    async fn dequeue(&self, filter: &DequeueFilter) -> Result<Option<JobAttrs>> {
        let lock_uuid = Uuid::new_v4();
        let mut jobs = self.jobs.write().await;

        let candidate = jobs
            .values_mut()
            .filter(|j| j.status == JobStatus::Free && filter.matches(&j.job_type))
            .min_by_key(|j| (j.created_at, j.seq));

        let Some(job) = candidate else {
            return Ok(None);
        };

        job.status = JobStatus::Locked;
        job.lock_uuid = Some(lock_uuid);
        job.locked_at = Some(Utc::now());
        debug!(job_id = %job.id, lock_uuid = %lock_uuid, "claimed job");

        job.load().map(Some)
    }

    async fn find(&self, id: JobId) -> Result<Option<JobAttrs>> {
        let jobs = self.jobs.read().await;
        jobs.get(&id).map(StoredJob::load).transpose()
    }

    async fn clear(&self) -> Result<()> {
        self.jobs.write().await.clear();
        Ok(())
    }

    async fn complete(&self, attrs: &JobAttrs) -> Result<()> {
        let Some(id) = attrs.id() else {
            return Ok(());
        };
        self.jobs.write().await.remove(&id);
        debug!(job_id = %id, "completed job");
        Ok(())
    }

    async fn reset(&self, attrs: &JobAttrs) -> Result<()> {
        self.write_back(JobStatus::Free, attrs).await
    }

    async fn fail(&self, attrs: &JobAttrs) -> Result<()> {
        self.write_back(JobStatus::Failed, attrs).await
    }
}

impl MemoryStore {
    /// Shared mechanics of `reset` and `fail`. `class_name` and `created_at`
    /// are preserved from the original enqueue.
    async fn write_back(&self, status: JobStatus, attrs: &JobAttrs) -> Result<()> {
        let Some(id) = attrs.id() else {
            return Ok(());
        };
        let job_type = attrs
            .job_type()
            .ok_or_else(|| Error::InvalidRecord(format!("job {id} write-back is missing a type")))?;
        let attributes = codec::encode(&attrs.payload())?;

        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.get_mut(&id) {
            job.status = status;
            job.lock_uuid = None;
            job.locked_at = None;
            job.job_type = job_type.to_string();
            job.attributes = attributes;
            debug!(job_id = %id, status = %status, "released job");
        }
        Ok(())
    }
}
