//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the TaskStore and
//! JobRegistry traits. Several worker processes may open the same database
//! file; every state transition is a single conditional `UPDATE`.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{JobRegistry, StorageError, StorageResult, TaskStore};
use crate::tasks::{CrawlTask, TaskStatus};
use crate::ScoutError;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// How long a connection waits for another worker's write lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

const TASK_COLUMNS: &str = "domain, status, current_job_id, last_launch_time, \
    last_finished_time, launch_count, finished_count, average_duration, importance, \
    frequency, created_at";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(ScoutError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, ScoutError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, ScoutError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn to_unix(time: DateTime<Utc>) -> i64 {
    time.timestamp()
}

fn from_unix(secs: Option<i64>) -> Option<DateTime<Utc>> {
    secs.and_then(|s| DateTime::from_timestamp(s, 0))
}

fn row_to_task(row: &Row<'_>) -> rusqlite::Result<CrawlTask> {
    let status_raw: String = row.get(1)?;
    let status = TaskStatus::from_db_string(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            Type::Text,
            Box::new(StorageError::Corrupt {
                column: "status",
                value: status_raw.clone(),
            }),
        )
    })?;

    Ok(CrawlTask {
        domain: row.get(0)?,
        status,
        current_job_id: row.get(2)?,
        last_launch_time: from_unix(row.get(3)?),
        last_finished_time: from_unix(row.get(4)?),
        launch_count: row.get(5)?,
        finished_count: row.get(6)?,
        average_duration: row.get(7)?,
        importance: row.get(8)?,
        frequency: row.get(9)?,
        created_at: from_unix(row.get(10)?).unwrap_or_default(),
    })
}

impl TaskStore for SqliteStorage {
    // ===== Creation and lookup =====

    fn get_or_create_task(
        &mut self,
        domain: &str,
        importance: i64,
        frequency: u8,
    ) -> StorageResult<CrawlTask> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO crawl_tasks (domain, status, importance, frequency, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                domain,
                TaskStatus::Active.to_db_string(),
                importance,
                frequency,
                to_unix(Utc::now())
            ],
        )?;

        if inserted > 0 {
            tracing::debug!("Created crawl task for {}", domain);
        }

        self.get_task(domain)?
            .ok_or_else(|| StorageError::TaskNotFound(domain.to_string()))
    }

    fn get_task(&self, domain: &str) -> StorageResult<Option<CrawlTask>> {
        let sql = format!("SELECT {} FROM crawl_tasks WHERE domain = ?1", TASK_COLUMNS);
        let task = self
            .conn
            .query_row(&sql, params![domain], row_to_task)
            .optional()?;
        Ok(task)
    }

    fn find_next_active(&self) -> StorageResult<Option<CrawlTask>> {
        let sql = format!(
            "SELECT {} FROM crawl_tasks
             WHERE status = ?1 AND current_job_id IS NULL
             ORDER BY last_launch_time ASC, importance DESC, domain ASC
             LIMIT 1",
            TASK_COLUMNS
        );
        let task = self
            .conn
            .query_row(&sql, params![TaskStatus::Active.to_db_string()], row_to_task)
            .optional()?;
        Ok(task)
    }

    // ===== Transitions =====

    fn claim_task(
        &mut self,
        domain: &str,
        job_id: &str,
        launch_time: DateTime<Utc>,
    ) -> StorageResult<bool> {
        let changed = self.conn.execute(
            "UPDATE crawl_tasks
             SET status = ?3, current_job_id = ?4, last_launch_time = ?5,
                 launch_count = launch_count + 1
             WHERE domain = ?1 AND status = ?2 AND current_job_id IS NULL",
            params![
                domain,
                TaskStatus::Active.to_db_string(),
                TaskStatus::Taken.to_db_string(),
                job_id,
                to_unix(launch_time)
            ],
        )?;
        Ok(changed == 1)
    }

    fn finish_task(
        &mut self,
        domain: &str,
        job_id: &str,
        finished_time: DateTime<Utc>,
        duration_secs: f64,
    ) -> StorageResult<bool> {
        // SET expressions see the row as it was before the update
        let changed = self.conn.execute(
            "UPDATE crawl_tasks
             SET status = ?4, current_job_id = NULL, last_finished_time = ?5,
                 finished_count = finished_count + 1,
                 average_duration = CASE
                     WHEN finished_count = 0 OR average_duration IS NULL THEN ?6
                     ELSE (average_duration + ?6) / (finished_count + 1)
                 END
             WHERE domain = ?1 AND status = ?2 AND current_job_id = ?3",
            params![
                domain,
                TaskStatus::Taken.to_db_string(),
                job_id,
                TaskStatus::Finished.to_db_string(),
                to_unix(finished_time),
                duration_secs
            ],
        )?;
        Ok(changed == 1)
    }

    fn fail_task(&mut self, domain: &str, job_id: &str) -> StorageResult<bool> {
        let changed = self.conn.execute(
            "UPDATE crawl_tasks SET status = ?4, current_job_id = NULL
             WHERE domain = ?1 AND status = ?2 AND current_job_id = ?3",
            params![
                domain,
                TaskStatus::Taken.to_db_string(),
                job_id,
                TaskStatus::Failed.to_db_string()
            ],
        )?;
        Ok(changed == 1)
    }

    fn activate_task(
        &mut self,
        domain: &str,
        from: TaskStatus,
        job_id: Option<&str>,
    ) -> StorageResult<bool> {
        let changed = self.conn.execute(
            "UPDATE crawl_tasks SET status = ?4, current_job_id = NULL
             WHERE domain = ?1 AND status = ?2 AND current_job_id IS ?3",
            params![
                domain,
                from.to_db_string(),
                job_id,
                TaskStatus::Active.to_db_string()
            ],
        )?;
        Ok(changed == 1)
    }

    // ===== Queries =====

    fn list_tasks_by_status(&self, status: TaskStatus) -> StorageResult<Vec<CrawlTask>> {
        let sql = format!(
            "SELECT {} FROM crawl_tasks WHERE status = ?1 ORDER BY domain",
            TASK_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let tasks = stmt
            .query_map(params![status.to_db_string()], row_to_task)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    fn count_tasks_by_status(&self, status: TaskStatus) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM crawl_tasks WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn top_tasks_by_launches(&self, limit: usize) -> StorageResult<Vec<CrawlTask>> {
        let sql = format!(
            "SELECT {} FROM crawl_tasks ORDER BY launch_count DESC, domain ASC LIMIT ?1",
            TASK_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let tasks = stmt
            .query_map(params![limit as i64], row_to_task)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }
}

impl JobRegistry for SqliteStorage {
    fn register_job(
        &mut self,
        job_id: &str,
        domain: &str,
        now: DateTime<Utc>,
    ) -> StorageResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO jobs (job_id, domain, started_at, heartbeat_at)
             VALUES (?1, ?2, ?3, ?3)",
            params![job_id, domain, to_unix(now)],
        )?;
        Ok(())
    }

    fn heartbeat_job(&mut self, job_id: &str, now: DateTime<Utc>) -> StorageResult<bool> {
        let changed = self.conn.execute(
            "UPDATE jobs SET heartbeat_at = ?2 WHERE job_id = ?1",
            params![job_id, to_unix(now)],
        )?;
        Ok(changed == 1)
    }

    fn remove_job(&mut self, job_id: &str) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM jobs WHERE job_id = ?1", params![job_id])?;
        Ok(())
    }

    fn live_job_ids(&self, stale_before: DateTime<Utc>) -> StorageResult<HashSet<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT job_id FROM jobs WHERE heartbeat_at >= ?1")?;
        let ids = stmt
            .query_map(params![to_unix(stale_before)], |row| row.get(0))?
            .collect::<Result<HashSet<String>, _>>()?;
        Ok(ids)
    }

    fn prune_stale_jobs(&mut self, stale_before: DateTime<Utc>) -> StorageResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM jobs WHERE heartbeat_at < ?1",
            params![to_unix(stale_before)],
        )?;
        Ok(removed)
    }
}
