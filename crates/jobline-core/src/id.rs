//! Job identifiers.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The sole stable handle callers retain for a job across claim, release,
/// and finalize. Uses UUIDv7 so ids sort by creation time.
///
/// Ids are minted by the store at enqueue time and never reused; everything
/// else holds one it got from a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("{_0}")]
pub struct JobId(Uuid);

impl JobId {
    /// Mint a fresh id for a job being enqueued.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Rebuild an id from a stored row's UUID column.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// The underlying UUID, for binding into queries.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl std::str::FromStr for JobId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_display_and_parse() {
        let id = JobId::new();
        assert_eq!(id.to_string().parse::<JobId>().unwrap(), id);
    }

    #[test]
    fn rebuilding_from_the_stored_uuid_preserves_identity() {
        let id = JobId::new();
        assert_eq!(JobId::from_uuid(*id.as_uuid()), id);
    }

    #[test]
    fn rejects_non_uuid_strings() {
        assert!("not-a-uuid".parse::<JobId>().is_err());
    }
}
