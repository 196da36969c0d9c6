//! Job records and lifecycle status.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::AttrMap;
use crate::{Error, JobId, Result};

/// Lifecycle status of a stored job.
///
/// Transitions happen only through the store: `enqueue` creates a `Free` job,
/// `dequeue` claims it (`Locked`), and `complete`/`reset`/`fail` finalize,
/// recirculate, or park it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Free,
    Locked,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Free => "free",
            JobStatus::Locked => "locked",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "free" => Ok(JobStatus::Free),
            "locked" => Ok(JobStatus::Locked),
            "failed" => Ok(JobStatus::Failed),
            other => Err(Error::InvalidRecord(format!("unknown job status {other:?}"))),
        }
    }
}

/// Input for `enqueue`: everything a job needs before it has an identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    /// Which executable job type these attributes construct. Immutable after
    /// enqueue.
    pub class_name: String,
    /// Application-defined category used for selective dequeue filtering.
    pub job_type: String,
    /// Opaque business payload, round-tripped through the attribute codec.
    pub payload: AttrMap,
}

impl NewJob {
    pub fn new(class_name: impl Into<String>, job_type: impl Into<String>, payload: AttrMap) -> Self {
        Self {
            class_name: class_name.into(),
            job_type: job_type.into(),
            payload,
        }
    }
}

const KEY_ID: &str = "id";
const KEY_STATUS: &str = "status";
const KEY_CLASS_NAME: &str = "className";
const KEY_TYPE: &str = "type";

const RESERVED_KEYS: [&str; 4] = [KEY_ID, KEY_STATUS, KEY_CLASS_NAME, KEY_TYPE];

/// The merged attribute mapping that fully describes one job.
///
/// Produced by a backend's `load`: the decoded business payload plus the
/// reserved keys `id`, `status`, `className`, and `type` from the stored row.
/// The external job-class registry consumes this mapping (keyed by
/// `className`) to instantiate an executable job; write-back calls
/// (`complete`/`reset`/`fail`) hand the same mapping back to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobAttrs(AttrMap);

impl JobAttrs {
    /// Merge a stored row's columns with its decoded payload.
    pub fn from_row(
        id: JobId,
        status: JobStatus,
        class_name: &str,
        job_type: &str,
        payload: AttrMap,
    ) -> Self {
        let mut map = payload;
        map.insert(KEY_ID.into(), Value::String(id.to_string()));
        map.insert(KEY_STATUS.into(), Value::String(status.as_str().into()));
        map.insert(KEY_CLASS_NAME.into(), Value::String(class_name.into()));
        map.insert(KEY_TYPE.into(), Value::String(job_type.into()));
        Self(map)
    }

    /// The job's identity, if this mapping came from a stored record.
    ///
    /// A mapping without an `id` was never dequeued from a store; write-back
    /// calls treat it as having nothing to act on.
    pub fn id(&self) -> Option<JobId> {
        self.0.get(KEY_ID)?.as_str()?.parse().ok()
    }

    pub fn status(&self) -> Option<JobStatus> {
        self.0.get(KEY_STATUS)?.as_str()?.parse().ok()
    }

    pub fn class_name(&self) -> Option<&str> {
        self.0.get(KEY_CLASS_NAME)?.as_str()
    }

    pub fn job_type(&self) -> Option<&str> {
        self.0.get(KEY_TYPE)?.as_str()
    }

    /// Change the filter category. Takes effect on the next `reset`/`fail`.
    pub fn set_job_type(&mut self, job_type: impl Into<String>) {
        self.0.insert(KEY_TYPE.into(), Value::String(job_type.into()));
    }

    /// A business attribute by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Set a business attribute.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    /// The business payload alone, with the reserved row keys stripped back
    /// out. This is what goes through the codec into the `attributes` column.
    pub fn payload(&self) -> AttrMap {
        let mut map = self.0.clone();
        for key in RESERVED_KEYS {
            map.remove(key);
        }
        map
    }

    pub fn as_map(&self) -> &AttrMap {
        &self.0
    }

    pub fn into_map(self) -> AttrMap {
        self.0
    }
}

impl From<AttrMap> for JobAttrs {
    fn from(map: AttrMap) -> Self {
        Self(map)
    }
}
