/// Crawl task status definitions
///
/// This module defines the states a per-domain crawl task moves through.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the scheduling state of a crawl task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Task is eligible for scheduling
    Active,

    /// Task is claimed by a running job
    Taken,

    /// Last run completed; waits for its cooldown
    Finished,

    /// Last run crashed; waits for a reactivation sweep
    Failed,
}

impl TaskStatus {
    /// All statuses, in lifecycle order
    pub const ALL: [TaskStatus; 4] = [Self::Active, Self::Taken, Self::Finished, Self::Failed];

    /// Returns true if a job currently owns the task
    pub fn is_claimed(&self) -> bool {
        matches!(self, Self::Taken)
    }

    /// Returns true if the task is waiting for a sweep to reactivate it
    pub fn is_resting(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }

    /// Converts the status to a database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Taken => "taken",
            Self::Finished => "finished",
            Self::Failed => "failed",
        }
    }

    /// Parses a status from a database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "taken" => Some(Self::Taken),
            "finished" => Some(Self::Finished),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Active => "ACTIVE",
            Self::Taken => "TAKEN",
            Self::Finished => "FINISHED",
            Self::Failed => "FAILED",
        };
        write!(f, "{}", s)
    }
}
