//! Statistics generation from the task store
//!
//! This module provides functionality for extracting and displaying
//! fleet-wide crawl task statistics.

use crate::storage::TaskStore;
use crate::tasks::{CrawlTask, TaskStatus};
use crate::ScoutError;
use std::collections::HashMap;

/// Number of tasks listed in the launch ranking
pub const TOP_TASKS: usize = 10;

/// Crawl task statistics summary
#[derive(Debug, Clone)]
pub struct TaskStatistics {
    /// Total number of known domains
    pub total_tasks: u64,

    /// Count of tasks by status
    pub tasks_by_status: HashMap<TaskStatus, u64>,

    /// Most launched tasks, highest first
    pub top_launched: Vec<CrawlTask>,
}

impl TaskStatistics {
    pub fn count(&self, status: TaskStatus) -> u64 {
        self.tasks_by_status.get(&status).copied().unwrap_or(0)
    }
}

/// Loads statistics from the task store
///
/// # Arguments
///
/// * `store` - The task store to query
///
/// # Returns
///
/// * `Ok(TaskStatistics)` - Successfully loaded statistics
/// * `Err(ScoutError)` - Failed to query statistics
pub fn load_statistics<S: TaskStore + ?Sized>(store: &S) -> Result<TaskStatistics, ScoutError> {
    let mut tasks_by_status = HashMap::new();
    for status in TaskStatus::ALL {
        tasks_by_status.insert(status, store.count_tasks_by_status(status)?);
    }

    Ok(TaskStatistics {
        total_tasks: tasks_by_status.values().sum(),
        tasks_by_status,
        top_launched: store.top_tasks_by_launches(TOP_TASKS)?,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &TaskStatistics) {
    println!("=== Crawl Task Statistics ===\n");

    println!("Overview:");
    println!("  Known domains: {}", stats.total_tasks);
    println!();

    println!("Tasks by Status:");
    for status in TaskStatus::ALL {
        let count = stats.count(status);
        let percentage = if stats.total_tasks > 0 {
            (count as f64 / stats.total_tasks as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    println!();

    if !stats.top_launched.is_empty() {
        println!("Most Launched ({}):", stats.top_launched.len());
        for task in &stats.top_launched {
            let average = task
                .average_duration
                .map(|d| format!("{:.1}s", d))
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  - {} [{}] launched {}, finished {}, avg {}",
                task.domain, task.status, task.launch_count, task.finished_count, average
            );
        }
    }
}
