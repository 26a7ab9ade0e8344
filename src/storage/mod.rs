//! Storage module for persisting crawl tasks
//!
//! This module handles all database operations shared by the worker fleet:
//! - SQLite database initialization and schema management
//! - Crawl task records and their conditional state transitions
//! - The registry of running jobs used by the reconciliation sweep

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{JobRegistry, StorageError, StorageResult, TaskStore};

use crate::ScoutError;
use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(ScoutError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, ScoutError> {
    SqliteStorage::new(path)
}
