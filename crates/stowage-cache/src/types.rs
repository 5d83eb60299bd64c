//! Cache operation outcomes.

use serde::Serialize;
use std::fmt;
use stowage_core::ObjectLocation;

/// Result of a cache restore operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreOutcome {
    /// Whether any candidate key matched.
    pub cache_hit: bool,
    /// The primary key that was requested.
    pub primary_key: String,
    /// The key that matched (may be a restore key).
    pub matched_key: Option<String>,
    /// Whether the primary key itself matched.
    pub exact_match: bool,
    /// Location the archive was restored from.
    pub location: Option<ObjectLocation>,
    /// Time taken to restore in milliseconds.
    pub duration_ms: u64,
}

impl RestoreOutcome {
    pub fn hit(
        primary_key: &str,
        matched_key: &str,
        location: ObjectLocation,
        duration_ms: u64,
    ) -> Self {
        Self {
            cache_hit: true,
            primary_key: primary_key.to_string(),
            matched_key: Some(matched_key.to_string()),
            exact_match: primary_key == matched_key,
            location: Some(location),
            duration_ms,
        }
    }

    pub fn miss(primary_key: &str, duration_ms: u64) -> Self {
        Self {
            cache_hit: false,
            primary_key: primary_key.to_string(),
            matched_key: None,
            exact_match: false,
            location: None,
            duration_ms,
        }
    }

    /// Matched key as reported to the CI platform; empty on a miss.
    pub fn matched_key_output(&self) -> &str {
        self.matched_key.as_deref().unwrap_or("")
    }
}

/// Why a save finished without uploading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// None of the configured paths exist.
    NoValidPaths,
    /// An archive already exists at the target location.
    AlreadyExists,
    /// The primary key was restored earlier in the job.
    AlreadyRestored,
    /// The job did not succeed.
    JobFailed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoValidPaths => write!(f, "no valid cache paths found"),
            SkipReason::AlreadyExists => write!(f, "cache already exists"),
            SkipReason::AlreadyRestored => write!(f, "cache was restored for the primary key"),
            SkipReason::JobFailed(status) => write!(f, "job status is '{}'", status),
        }
    }
}

/// Result of a cache save operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SaveOutcome {
    Saved {
        location: ObjectLocation,
        size_bytes: u64,
        duration_ms: u64,
    },
    Skipped {
        reason: SkipReason,
    },
}

impl SaveOutcome {
    pub fn skipped(reason: SkipReason) -> Self {
        SaveOutcome::Skipped { reason }
    }

    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved { .. })
    }
}
