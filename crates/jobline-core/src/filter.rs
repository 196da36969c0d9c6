//! Dequeue filters.

use serde::{Deserialize, Serialize};

/// Restricts which job types a `dequeue` call may claim.
///
/// `Only` and `Exclude` are mutually exclusive by construction. Failed jobs
/// are never eligible regardless of the filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DequeueFilter {
    /// Claim the oldest free job of any type.
    #[default]
    Any,
    /// Claim only jobs whose type is in the set.
    Only(Vec<String>),
    /// Claim any job except those whose type is in the set.
    Exclude(Vec<String>),
}

impl DequeueFilter {
    pub fn only<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(types.into_iter().map(Into::into).collect())
    }

    pub fn exclude<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Exclude(types.into_iter().map(Into::into).collect())
    }

    /// Whether a job of the given type is eligible under this filter.
    pub fn matches(&self, job_type: &str) -> bool {
        match self {
            DequeueFilter::Any => true,
            DequeueFilter::Only(types) => types.iter().any(|t| t == job_type),
            DequeueFilter::Exclude(types) => !types.iter().any(|t| t == job_type),
        }
    }
}
