use crate::storage::{JobRegistry, StorageError, TaskStore};
use crate::tasks::{CrawlTaskAdapter, TaskStatus};
use crate::{TaskError, TaskResult};
use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex};

/// Counts of tasks moved back to ACTIVE by one sweep
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// TAKEN tasks whose job is gone
    pub reclaimed: usize,
    /// FINISHED or FAILED tasks whose cooldown elapsed
    pub reactivated: usize,
    /// Job rows removed because their heartbeat went stale
    pub pruned_jobs: usize,
}

/// Periodic maintenance of the task table
///
/// The reconciliation sweep heals tasks left TAKEN by workers that died
/// without reporting. The cooldown sweep makes rested tasks eligible again
/// after `frequency` days.
pub struct Sweeper<S> {
    store: Arc<Mutex<S>>,
    adapter: CrawlTaskAdapter<S>,
    job_stale_after: Duration,
}

impl<S: TaskStore + JobRegistry> Sweeper<S> {
    pub fn new(store: Arc<Mutex<S>>, job_stale_after: Duration) -> Self {
        let adapter = CrawlTaskAdapter::new(Arc::clone(&store));
        Self {
            store,
            adapter,
            job_stale_after,
        }
    }

    /// Runs both sweeps, then drops stale job rows
    pub fn run(&self, now: DateTime<Utc>) -> TaskResult<SweepReport> {
        let reclaimed = self.reconcile_taken(now)?;
        let reactivated = self.reactivate_cooled(now)?;
        let pruned_jobs = self
            .store
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?
            .prune_stale_jobs(now - self.job_stale_after)?;

        let report = SweepReport {
            reclaimed,
            reactivated,
            pruned_jobs,
        };
        tracing::info!(
            "Sweep complete: {} reclaimed, {} reactivated, {} stale jobs pruned",
            report.reclaimed,
            report.reactivated,
            report.pruned_jobs
        );
        Ok(report)
    }

    /// Reactivates TAKEN tasks whose job id is missing or not among live jobs
    pub fn reconcile_taken(&self, now: DateTime<Utc>) -> TaskResult<usize> {
        let (taken, live) = {
            let store = self.store.lock().map_err(|_| StorageError::LockPoisoned)?;
            (
                store.list_tasks_by_status(TaskStatus::Taken)?,
                store.live_job_ids(now - self.job_stale_after)?,
            )
        };

        let mut reclaimed = 0;
        for task in taken {
            let alive = task
                .current_job_id
                .as_ref()
                .map_or(false, |id| live.contains(id));
            if alive {
                continue;
            }

            tracing::warn!(
                "Task {} held by dead job {:?}, returning it to ACTIVE",
                task.domain,
                task.current_job_id
            );
            if self.reactivate(&task)? {
                reclaimed += 1;
            }
        }
        Ok(reclaimed)
    }

    /// Reactivates FINISHED and FAILED tasks whose cooldown has elapsed
    pub fn reactivate_cooled(&self, now: DateTime<Utc>) -> TaskResult<usize> {
        let resting = {
            let store = self.store.lock().map_err(|_| StorageError::LockPoisoned)?;
            let mut tasks = store.list_tasks_by_status(TaskStatus::Finished)?;
            tasks.extend(store.list_tasks_by_status(TaskStatus::Failed)?);
            tasks
        };

        let mut reactivated = 0;
        for task in resting {
            let due = task.eligible_at().map_or(false, |at| at <= now);
            if due && self.reactivate(&task)? {
                reactivated += 1;
            }
        }
        Ok(reactivated)
    }

    /// Returns false if the task moved on since it was listed
    fn reactivate(&self, task: &crate::tasks::CrawlTask) -> TaskResult<bool> {
        match self.adapter.mark_active(task) {
            Ok(_) => Ok(true),
            Err(TaskError::TransitionRejected { .. }) => {
                tracing::debug!("Task {} changed during sweep, skipping", task.domain);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
