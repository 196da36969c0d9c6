//! The PostgreSQL job store and its claiming protocol.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jobline_core::codec;
use jobline_core::{Backend, DequeueFilter, Error, JobAttrs, JobId, JobStatus, NewJob, Result};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::debug;
use uuid::Uuid;

use crate::StoreConfig;

/// One row of the `jobline_jobs` table.
///
/// `locked` rows carry both `lock_uuid` and `locked_at`; `free` and `failed`
/// rows carry neither.
#[derive(Debug, Clone, sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    #[allow(dead_code)]
    created_at: DateTime<Utc>,
    status: String,
    class_name: String,
    #[sqlx(rename = "type")]
    job_type: String,
    lock_uuid: Option<Uuid>,
    locked_at: Option<DateTime<Utc>>,
    attributes: Vec<u8>,
}

impl JobRow {
    /// Decode the stored payload and merge in the row's identity columns.
    fn load(self) -> Result<JobAttrs> {
        let status: JobStatus = self.status.parse()?;
        if status == JobStatus::Locked && (self.lock_uuid.is_none() || self.locked_at.is_none()) {
            return Err(Error::InvalidRecord(format!(
                "job {} is locked without a claim token",
                self.id
            )));
        }
        let payload = codec::decode(&self.attributes)?;
        Ok(JobAttrs::from_row(
            JobId::from_uuid(self.id),
            status,
            &self.class_name,
            &self.job_type,
            payload,
        ))
    }
}

/// Job store backed by PostgreSQL.
///
/// Holds its own connection pool; nothing here takes an in-process lock. The
/// claim transition is a single conditional UPDATE, so two stores pointed at
/// the same table race correctly no matter which processes they live in.
pub struct PgStore {
    config: StoreConfig,
    pool: PgPool,
}

impl PgStore {
    /// Connect to the store described by `config`.
    pub async fn connect(config: StoreConfig) -> Result<Self> {
        let pool = build_pool(&config).await?;
        Ok(Self { config, pool })
    }

    /// Drop the current pool and establish a fresh one. The old handle is
    /// closed before the new connection is attempted, so a failed reconnect
    /// never leaks it.
    pub async fn reconnect(&mut self) -> Result<()> {
        self.pool.close().await;
        self.pool = build_pool(&self.config).await?;
        Ok(())
    }

    /// Apply the schema migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::StoreUnavailable(e.to_string()))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

async fn build_pool(config: &StoreConfig) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .map_err(map_sqlx_err)
}

fn map_sqlx_err(err: sqlx::Error) -> Error {
    match err.as_database_error() {
        Some(db) if db.is_unique_violation() => Error::ConstraintViolation(db.to_string()),
        _ => Error::StoreUnavailable(err.to_string()),
    }
}

/// The claim statement. The inner select picks the oldest free row matching
/// the filter, with the id (UUIDv7, time-ordered) breaking ties between rows
/// created in the same timestamp tick; `FOR UPDATE SKIP LOCKED` makes
/// concurrent claimers skip past rows another transaction is taking, so at
/// most one caller wins each row.
/// The winning row comes back via RETURNING, stamped with this call's claim
/// token.
fn claim_sql(filter: &DequeueFilter) -> String {
    let type_clause = match filter {
        DequeueFilter::Any => "",
        DequeueFilter::Only(_) => " AND type = ANY($2)",
        DequeueFilter::Exclude(_) => " AND type <> ALL($2)",
    };
    format!(
        "UPDATE jobline_jobs \
         SET status = 'locked', lock_uuid = $1, locked_at = NOW() \
         WHERE id = ( \
             SELECT id FROM jobline_jobs \
             WHERE status = 'free'{type_clause} \
             ORDER BY created_at ASC, id ASC \
             FOR UPDATE SKIP LOCKED \
             LIMIT 1 \
         ) \
         RETURNING *"
    )
}

#[async_trait]
impl Backend for PgStore {
    async fn enqueue(&self, job: NewJob) -> Result<JobAttrs> {
        let id = JobId::new();
        let attributes = codec::encode(&job.payload)?;

        sqlx::query(
            "INSERT INTO jobline_jobs (id, created_at, status, class_name, type, attributes) \
             VALUES ($1, NOW(), 'free', $2, $3, $4)",
        )
        .bind(id.as_uuid())
        .bind(&job.class_name)
        .bind(&job.job_type)
        .bind(&attributes)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        debug!(job_id = %id, class_name = %job.class_name, job_type = %job.job_type, "enqueued job");

        // Re-read by id so the caller observes exactly what is durable.
        self.find(id)
            .await?
            .ok_or_else(|| Error::StoreUnavailable(format!("job {id} not readable after insert")))
    }

    async fn dequeue(&self, filter: &DequeueFilter) -> Result<Option<JobAttrs>> {
        let lock_uuid = Uuid::new_v4();
        let sql = claim_sql(filter);

        let query = sqlx::query_as::<_, JobRow>(&sql).bind(lock_uuid);
        let query = match filter {
            DequeueFilter::Any => query,
            DequeueFilter::Only(types) | DequeueFilter::Exclude(types) => query.bind(&types[..]),
        };

        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;

        match row {
            Some(row) => {
                debug!(job_id = %row.id, lock_uuid = %lock_uuid, "claimed job");
                row.load().map(Some)
            }
            None => Ok(None),
        }
    }

    async fn find(&self, id: JobId) -> Result<Option<JobAttrs>> {
        let row = sqlx::query_as::<_, JobRow>("SELECT * FROM jobline_jobs WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        row.map(JobRow::load).transpose()
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("TRUNCATE jobline_jobs")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
        Ok(())
    }

    async fn complete(&self, attrs: &JobAttrs) -> Result<()> {
        let Some(id) = attrs.id() else {
            return Ok(());
        };
        sqlx::query("DELETE FROM jobline_jobs WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_err)?;
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

impl PgStore {
    /// Shared mechanics of `reset` and `fail`: release the claim, persist the
    /// possibly-updated type and payload. `class_name` is never written here.
    async fn write_back(&self, status: JobStatus, attrs: &JobAttrs) -> Result<()> {
        let Some(id) = attrs.id() else {
            return Ok(());
        };
        let job_type = attrs
            .job_type()
            .ok_or_else(|| Error::InvalidRecord(format!("job {id} write-back is missing a type")))?;
        let attributes = codec::encode(&attrs.payload())?;

        sqlx::query(
            "UPDATE jobline_jobs \
             SET status = $2, lock_uuid = NULL, locked_at = NULL, type = $3, attributes = $4 \
             WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(status.as_str())
        .bind(job_type)
        .bind(&attributes)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        debug!(job_id = %id, status = %status, "released job");
        Ok(())
    }
}
