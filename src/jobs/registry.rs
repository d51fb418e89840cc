//! In-memory job registry
//!
//! The registry is the single source of truth for job state. Every write is
//! a short metadata update under a lock; crawl work never runs while the
//! lock is held.

use crate::jobs::job::{Job, JobStatus};
use crate::jobs::JobError;
use crate::output::BatchReport;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

struct Entry {
    job: Job,
    cancel: CancellationToken,
}

/// Process-wide store of batch jobs
///
/// Cloning is cheap; clones share the same jobs.
#[derive(Clone, Default)]
pub struct JobRegistry {
    entries: Arc<RwLock<HashMap<Uuid, Entry>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new pending job and returns its snapshot
    pub fn create(&self) -> Job {
        let job = Job::new();
        let entry = Entry {
            job: job.clone(),
            cancel: CancellationToken::new(),
        };

        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(job.job_id, entry);

        tracing::debug!(job_id = %job.job_id, "Created job");
        job
    }

    /// Returns a snapshot of the job
    pub fn get(&self, job_id: Uuid) -> Result<Job, JobError> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&job_id)
            .map(|entry| entry.job.clone())
            .ok_or(JobError::NotFound(job_id))
    }

    /// Applies `mutation` to the job atomically
    ///
    /// The mutation is discarded if the job is already terminal or if it
    /// changes the status along a transition the state machine forbids.
    pub fn update<F>(&self, job_id: Uuid, mutation: F) -> Result<Job, JobError>
    where
        F: FnOnce(&mut Job),
    {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get_mut(&job_id).ok_or(JobError::NotFound(job_id))?;

        let mut next = entry.job.clone();
        mutation(&mut next);
        next.job_id = job_id;

        let from = entry.job.status;
        let changed = next.status != from;
        if from.is_terminal() || (changed && !from.can_transition_to(next.status)) {
            return Err(JobError::InvalidTransition {
                from,
                to: next.status,
            });
        }

        next.updated_at = Utc::now();
        entry.job = next;
        Ok(entry.job.clone())
    }

    /// Moves a pending job to running
    pub fn mark_running(&self, job_id: Uuid, total_urls: usize) -> Result<Job, JobError> {
        self.update(job_id, |job| {
            job.status = JobStatus::Running;
            job.message = Some(format!("Crawling {} URLs", total_urls));
        })
    }

    /// Records how many URLs have an outcome so far
    pub fn set_progress(&self, job_id: Uuid, done: usize, total: usize) -> Result<Job, JobError> {
        let progress = if total == 0 {
            0.0
        } else {
            (done as f64 / total as f64).clamp(0.0, 1.0)
        };
        self.update(job_id, |job| job.progress = progress)
    }

    /// Marks the job completed and attaches its report
    pub fn complete(&self, job_id: Uuid, report: BatchReport) -> Result<Job, JobError> {
        self.update(job_id, |job| {
            job.status = JobStatus::Completed;
            job.progress = 1.0;
            job.message = Some(format!(
                "Crawled {} of {} URLs successfully",
                report.metadata.successful_count, report.metadata.total_urls
            ));
            job.result = Some(report);
        })
    }

    /// Marks the job failed with a reason
    pub fn fail(&self, job_id: Uuid, message: impl Into<String>) -> Result<Job, JobError> {
        let message = message.into();
        self.update(job_id, |job| {
            job.status = JobStatus::Failed;
            job.message = Some(message);
        })
    }

    /// Token the orchestrator watches for cancellation of this job
    pub fn cancellation_token(&self, job_id: Uuid) -> Result<CancellationToken, JobError> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&job_id)
            .map(|entry| entry.cancel.clone())
            .ok_or(JobError::NotFound(job_id))
    }

    /// Requests cancellation of the job
    ///
    /// Cancelling a terminal job has no effect.
    pub fn cancel(&self, job_id: Uuid) -> Result<Job, JobError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let entry = entries.get(&job_id).ok_or(JobError::NotFound(job_id))?;

        if !entry.job.status.is_terminal() {
            tracing::info!(job_id = %job_id, "Cancelling job");
            entry.cancel.cancel();
        }

        Ok(entry.job.clone())
    }

    /// Requests cancellation of every unfinished job
    pub fn cancel_all(&self) {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        for entry in entries.values().filter(|e| !e.job.status.is_terminal()) {
            entry.cancel.cancel();
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
