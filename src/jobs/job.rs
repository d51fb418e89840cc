//! Job lifecycle definitions
//!
//! A submitted batch moves through `pending -> running -> {completed, failed}`.
use crate::output::BatchReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle state of a batch job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    // ===== Active States =====
    /// Job is registered but no URL has been admitted yet
    Pending,

    /// Fan-out has begun
    Running,

    // ===== Terminal States =====
    /// Aggregation finished; individual URLs may still have failed
    Completed,

    /// The orchestrator could not produce a report
    Failed,
}

impl JobStatus {
    /// Returns true if no further transition can occur
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if a job in this state may move to `next`
    ///
    /// `pending` may fail directly when the job cannot start.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Pending, Self::Failed)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Snapshot of a batch job as seen by clients polling for status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: Uuid,
    pub status: JobStatus,

    /// Fraction of URLs with an outcome, in `[0.0, 1.0]`
    pub progress: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Present once the job has completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<BatchReport>,
}

impl Job {
    /// Creates a pending job with a fresh identifier
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            job_id: Uuid::new_v4(),
            status: JobStatus::Pending,
            progress: 0.0,
            message: Some("Job queued".to_string()),
            created_at: now,
            updated_at: now,
            result: None,
        }
    }
}

impl Default for Job {
    fn default() -> Self {
        Self::new()
    }
}
