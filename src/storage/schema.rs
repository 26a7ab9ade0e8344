//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Onion-Scout task
//! database. Timestamps are stored as unix seconds.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per domain ever seen
CREATE TABLE IF NOT EXISTS crawl_tasks (
    domain TEXT PRIMARY KEY,
    status TEXT NOT NULL DEFAULT 'active',
    current_job_id TEXT,
    last_launch_time INTEGER,
    last_finished_time INTEGER,
    launch_count INTEGER NOT NULL DEFAULT 0,
    finished_count INTEGER NOT NULL DEFAULT 0,
    average_duration REAL,
    importance INTEGER NOT NULL DEFAULT 0,
    frequency INTEGER NOT NULL DEFAULT 1 CHECK (frequency BETWEEN 1 AND 7),
    created_at INTEGER NOT NULL,
    CHECK ((status = 'taken') = (current_job_id IS NOT NULL))
);

CREATE INDEX IF NOT EXISTS idx_tasks_status ON crawl_tasks(status);
CREATE INDEX IF NOT EXISTS idx_tasks_schedule
    ON crawl_tasks(status, last_launch_time, importance);

-- Jobs currently running a crawl
CREATE TABLE IF NOT EXISTS jobs (
    job_id TEXT PRIMARY KEY,
    domain TEXT NOT NULL,
    started_at INTEGER NOT NULL,
    heartbeat_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_jobs_heartbeat ON jobs(heartbeat_at);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
