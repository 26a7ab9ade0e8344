//! Storage traits and error types
//!
//! This module defines the trait interfaces for the task store and the job
//! registry, and the associated error types.

use crate::tasks::{CrawlTask, TaskStatus};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Task not found: {0}")]
    TaskNotFound(String),

    #[error("Corrupt value in column {column}: {value}")]
    Corrupt { column: &'static str, value: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Persisted crawl tasks shared by every worker in the fleet
///
/// Every transition is a single conditional update. Methods returning
/// `bool` report whether the row was in the expected state and the update
/// applied; `false` means another worker got there first.
pub trait TaskStore {
    // ===== Creation and lookup =====

    /// Inserts a task for the domain unless one exists, then returns the stored row
    ///
    /// # Arguments
    ///
    /// * `domain` - The domain (unique key)
    /// * `importance` - Priority weight used only when the task is created
    /// * `frequency` - Cooldown in days used only when the task is created
    fn get_or_create_task(
        &mut self,
        domain: &str,
        importance: i64,
        frequency: u8,
    ) -> StorageResult<CrawlTask>;

    /// Gets a task by domain
    fn get_task(&self, domain: &str) -> StorageResult<Option<CrawlTask>>;

    /// Finds the ACTIVE, unowned task that should run next
    ///
    /// Never-launched tasks come first, then the oldest launch; ties go to
    /// the higher importance.
    fn find_next_active(&self) -> StorageResult<Option<CrawlTask>>;

    // ===== Transitions =====

    /// ACTIVE (no job) → TAKEN, stamping the job id and launch time
    fn claim_task(
        &mut self,
        domain: &str,
        job_id: &str,
        launch_time: DateTime<Utc>,
    ) -> StorageResult<bool>;

    /// TAKEN by `job_id` → FINISHED, folding `duration_secs` into the running mean
    fn finish_task(
        &mut self,
        domain: &str,
        job_id: &str,
        finished_time: DateTime<Utc>,
        duration_secs: f64,
    ) -> StorageResult<bool>;

    /// TAKEN by `job_id` → FAILED, counters untouched
    fn fail_task(&mut self, domain: &str, job_id: &str) -> StorageResult<bool>;

    /// `from` (owned by `job_id`, or unowned when `None`) → ACTIVE
    fn activate_task(
        &mut self,
        domain: &str,
        from: TaskStatus,
        job_id: Option<&str>,
    ) -> StorageResult<bool>;

    // ===== Queries =====

    /// Gets all tasks in a status
    fn list_tasks_by_status(&self, status: TaskStatus) -> StorageResult<Vec<CrawlTask>>;

    /// Counts tasks in a status
    fn count_tasks_by_status(&self, status: TaskStatus) -> StorageResult<u64>;

    /// Gets the most launched tasks, highest first
    fn top_tasks_by_launches(&self, limit: usize) -> StorageResult<Vec<CrawlTask>>;
}

/// Registry of running jobs, answering which job ids are still alive
pub trait JobRegistry {
    /// Records a job that is about to crawl `domain`
    fn register_job(&mut self, job_id: &str, domain: &str, now: DateTime<Utc>)
        -> StorageResult<()>;

    /// Refreshes a job's heartbeat; returns false if the job is unknown
    fn heartbeat_job(&mut self, job_id: &str, now: DateTime<Utc>) -> StorageResult<bool>;

    /// Removes a finished job
    fn remove_job(&mut self, job_id: &str) -> StorageResult<()>;

    /// Gets the ids of jobs whose heartbeat is newer than `stale_before`
    fn live_job_ids(&self, stale_before: DateTime<Utc>) -> StorageResult<HashSet<String>>;

    /// Deletes jobs whose heartbeat is older than `stale_before`
    fn prune_stale_jobs(&mut self, stale_before: DateTime<Utc>) -> StorageResult<usize>;
}
