//! Job tracking for asynchronously submitted batches
//!
//! # Components
//!
//! - `JobStatus`: lifecycle state (pending, running, completed, failed)
//! - `Job`: the snapshot clients poll
//! - `JobRegistry`: in-memory store owning every job for the process lifetime

mod job;
mod registry;

pub use job::{Job, JobStatus};
pub use registry::JobRegistry;

use thiserror::Error;
use uuid::Uuid;

/// Errors from job registry operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum JobError {
    #[error("job {0} not found")]
    NotFound(Uuid),

    #[error("job cannot move from {from} to {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },
}
