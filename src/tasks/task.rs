use crate::tasks::TaskStatus;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Default priority weight for newly discovered domains
pub const DEFAULT_IMPORTANCE: i64 = 0;

/// Default re-crawl cooldown in days
pub const DEFAULT_FREQUENCY: u8 = 1;

/// One persisted crawl task; exactly one exists per domain
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrawlTask {
    pub domain: String,
    pub status: TaskStatus,
    /// Set exactly while the task is TAKEN
    pub current_job_id: Option<String>,
    pub last_launch_time: Option<DateTime<Utc>>,
    pub last_finished_time: Option<DateTime<Utc>>,
    pub launch_count: u32,
    pub finished_count: u32,
    /// Running mean of successful run durations, in seconds
    pub average_duration: Option<f64>,
    pub importance: i64,
    /// Re-crawl cooldown in days (1..=7)
    pub frequency: u8,
    pub created_at: DateTime<Utc>,
}

impl CrawlTask {
    /// Length of the cooldown between runs
    pub fn cooldown(&self) -> Duration {
        Duration::days(i64::from(self.frequency))
    }

    /// Returns the moment a resting task becomes eligible again
    ///
    /// FINISHED tasks count from their last finish, FAILED ones from their
    /// last launch. Other statuses have no cooldown.
    pub fn eligible_at(&self) -> Option<DateTime<Utc>> {
        let anchor = match self.status {
            TaskStatus::Finished => self.last_finished_time,
            TaskStatus::Failed => self.last_launch_time,
            TaskStatus::Active | TaskStatus::Taken => return None,
        };
        Some(anchor.unwrap_or(self.created_at) + self.cooldown())
    }
}
