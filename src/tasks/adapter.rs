use crate::storage::{StorageError, TaskStore};
use crate::tasks::task::{DEFAULT_FREQUENCY, DEFAULT_IMPORTANCE};
use crate::tasks::{CrawlTask, TaskStatus};
use crate::{TaskError, TaskResult};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard};

/// The only component that mutates crawl task scheduling state
///
/// Wraps a shared [`TaskStore`] and exposes the task lifecycle:
/// ACTIVE → TAKEN → FINISHED | FAILED, and back to ACTIVE through
/// [`mark_active`](Self::mark_active). Each transition is one conditional
/// update; when the row is no longer in the state this worker last saw, the
/// transition fails with [`TaskError::TransitionRejected`].
pub struct CrawlTaskAdapter<S> {
    store: Arc<Mutex<S>>,
}

impl<S> Clone for CrawlTaskAdapter<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: TaskStore> CrawlTaskAdapter<S> {
    pub fn new(store: Arc<Mutex<S>>) -> Self {
        Self { store }
    }

    fn lock(&self) -> TaskResult<MutexGuard<'_, S>> {
        self.store
            .lock()
            .map_err(|_| TaskError::Storage(StorageError::LockPoisoned))
    }

    /// Returns the task for a domain, creating it with default priority and cooldown
    pub fn get_or_create_task(&self, domain: &str) -> TaskResult<CrawlTask> {
        self.ensure_task(domain, DEFAULT_IMPORTANCE, DEFAULT_FREQUENCY)
    }

    /// Returns the task for a domain, creating it with the given settings
    ///
    /// Settings of an existing task are left as they are.
    pub fn ensure_task(&self, domain: &str, importance: i64, frequency: u8) -> TaskResult<CrawlTask> {
        let task = self
            .lock()?
            .get_or_create_task(domain, importance, frequency)?;
        Ok(task)
    }

    /// Gets a task by domain
    pub fn get_task(&self, domain: &str) -> TaskResult<CrawlTask> {
        self.lock()?
            .get_task(domain)?
            .ok_or_else(|| TaskError::NotFound(domain.to_string()))
    }

    /// Claims the next eligible task for `job_id`
    ///
    /// Picks the ACTIVE task without a job that was launched longest ago
    /// (never-launched first), preferring higher importance on ties, and
    /// moves it to TAKEN. If another worker claims the candidate first, the
    /// next candidate is tried.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::NoActiveTasks` when no candidate remains.
    pub fn get_and_prepare(&self, job_id: &str, launch_time: DateTime<Utc>) -> TaskResult<CrawlTask> {
        loop {
            let candidate = self
                .lock()?
                .find_next_active()?
                .ok_or(TaskError::NoActiveTasks)?;

            if self
                .lock()?
                .claim_task(&candidate.domain, job_id, launch_time)?
            {
                tracing::info!("Job {} claimed task {}", job_id, candidate.domain);
                return self.get_task(&candidate.domain);
            }

            tracing::debug!(
                "Task {} was claimed by another worker, trying next candidate",
                candidate.domain
            );
        }
    }

    /// Marks a TAKEN task as successfully finished
    ///
    /// # Arguments
    ///
    /// * `task` - The task as claimed by this worker
    /// * `finished_time` - When the run ended
    /// * `duration_secs` - Wall time of the run, folded into the running mean
    ///
    /// # Errors
    ///
    /// `TaskError::MissingValue` if either argument is absent;
    /// `TaskError::TransitionRejected` if the task is no longer TAKEN by this job.
    pub fn mark_finished(
        &self,
        task: &CrawlTask,
        finished_time: Option<DateTime<Utc>>,
        duration_secs: Option<f64>,
    ) -> TaskResult<CrawlTask> {
        let finished_time = finished_time.ok_or(TaskError::MissingValue("finished_time"))?;
        let duration_secs = duration_secs.ok_or(TaskError::MissingValue("duration"))?;
        let job_id = task
            .current_job_id
            .as_deref()
            .ok_or(TaskError::MissingValue("current_job_id"))?;

        let applied = self
            .lock()?
            .finish_task(&task.domain, job_id, finished_time, duration_secs)?;
        if !applied {
            return Err(rejected(task, TaskStatus::Finished));
        }

        tracing::info!(
            "Task {} finished in {:.1}s",
            task.domain,
            duration_secs
        );
        self.get_task(&task.domain)
    }

    /// Marks a TAKEN task as failed, leaving its counters untouched
    pub fn mark_failed(&self, task: &CrawlTask) -> TaskResult<CrawlTask> {
        let job_id = task
            .current_job_id
            .as_deref()
            .ok_or(TaskError::MissingValue("current_job_id"))?;

        if !self.lock()?.fail_task(&task.domain, job_id)? {
            return Err(rejected(task, TaskStatus::Failed));
        }

        tracing::warn!("Task {} marked as failed", task.domain);
        self.get_task(&task.domain)
    }

    /// Returns a task to ACTIVE and clears its job id
    ///
    /// Applies only if the task is still in the status (and owned by the
    /// job) recorded in `task`. Calling it on an ACTIVE task is a no-op
    /// that succeeds.
    pub fn mark_active(&self, task: &CrawlTask) -> TaskResult<CrawlTask> {
        let applied = self.lock()?.activate_task(
            &task.domain,
            task.status,
            task.current_job_id.as_deref(),
        )?;
        if !applied {
            return Err(rejected(task, TaskStatus::Active));
        }

        if task.status != TaskStatus::Active {
            tracing::info!("Task {} reactivated from {}", task.domain, task.status);
        }
        self.get_task(&task.domain)
    }
}

fn rejected(task: &CrawlTask, to: TaskStatus) -> TaskError {
    TaskError::TransitionRejected {
        domain: task.domain.clone(),
        to,
    }
}
