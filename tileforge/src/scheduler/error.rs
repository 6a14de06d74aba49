//! Scheduler errors.

use thiserror::Error;

use crate::job::{JobId, ProductionMode};

/// Errors returned by [`JobScheduler`](super::JobScheduler) operations.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// No worker is bound to a strategy of this mode.
    #[error("No workers for {0} jobs")]
    NoWorkers(ProductionMode),

    /// The scheduler has been shut down.
    #[error("Scheduler is shut down")]
    ShutDown,

    /// The job is not pending or in progress.
    #[error("Unknown job: {0}")]
    UnknownJob(JobId),

    /// A worker thread could not be started.
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}
