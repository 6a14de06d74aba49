//! Job outcomes sent back to the requester.

use crate::job::{JobId, RenderJob};
use crate::strategy::{FailureKind, TileBitmap};

/// Outcome of a job, sent on the scheduler's delivery channel.
///
/// Every job delivers at most once. Cancelled jobs, and jobs dropped at
/// shutdown, deliver nothing.
#[derive(Debug)]
pub enum Delivery {
    Completed {
        id: JobId,
        job: RenderJob,
        bitmap: TileBitmap,
    },
    Failed {
        id: JobId,
        job: RenderJob,
        kind: FailureKind,
        /// Human-readable failure detail.
        detail: String,
    },
}

impl Delivery {
    pub fn id(&self) -> JobId {
        match self {
            Delivery::Completed { id, .. } | Delivery::Failed { id, .. } => *id,
        }
    }

    pub fn job(&self) -> &RenderJob {
        match self {
            Delivery::Completed { job, .. } | Delivery::Failed { job, .. } => job,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Delivery::Completed { .. })
    }

    /// The failure kind, or `None` for a completed job.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Delivery::Completed { .. } => None,
            Delivery::Failed { kind, .. } => Some(*kind),
        }
    }
}
