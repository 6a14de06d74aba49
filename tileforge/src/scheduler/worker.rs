//! Worker thread loop.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::delivery::Delivery;
use super::Shared;
use crate::job::{JobId, JobState, RenderJob};
use crate::strategy::{FailureKind, ProductionError, ProductionStrategy, TileBitmap};

/// Runs one worker until shutdown.
///
/// The worker drains the pending queue of its strategy's mode, running each
/// job through `prepare → produce → cleanup`.
pub(super) fn run(
    shared: Arc<Shared>,
    mut strategy: Box<dyn ProductionStrategy>,
    deliveries: mpsc::UnboundedSender<Delivery>,
) {
    let mode = strategy.mode();
    debug!(mode = %mode, "Worker started");

    while let Some((id, job, cancel)) = next_job(&shared, mode.index()) {
        debug!(
            job_id = %id,
            mode = %mode,
            zoom = job.tile().zoom(),
            column = job.tile().column(),
            row = job.tile().row(),
            priority = job.priority(),
            "Job started"
        );

        let started = Instant::now();
        strategy.prepare(&job);
        let result = strategy.produce(&job, &cancel);
        strategy.cleanup(&job);

        finish(&shared, &deliveries, id, job, &cancel, result, started);
    }

    debug!(mode = %mode, "Worker stopped");
}

/// Blocks until a job of the given mode is pending, then claims it.
///
/// Returns `None` once the scheduler shuts down.
fn next_job(shared: &Shared, mode: usize) -> Option<(JobId, RenderJob, CancellationToken)> {
    let mut inner = shared.inner.lock();
    loop {
        if inner.shutdown {
            return None;
        }

        if let Some((id, _)) = inner.queues[mode].pop() {
            let Some(tracked) = inner.jobs.get_mut(&id) else {
                continue;
            };
            let cancel = CancellationToken::new();
            tracked.state = JobState::InProgress;
            tracked.cancel = Some(cancel.clone());
            return Some((id, tracked.job.clone(), cancel));
        }

        shared.available[mode].wait(&mut inner);
    }
}

fn finish(
    shared: &Shared,
    deliveries: &mpsc::UnboundedSender<Delivery>,
    id: JobId,
    job: RenderJob,
    cancel: &CancellationToken,
    result: Result<TileBitmap, ProductionError>,
    started: Instant,
) {
    {
        let mut inner = shared.inner.lock();
        inner.jobs.remove(&id);
        if inner.identities.get(&job) == Some(&id) {
            inner.identities.remove(&job);
        }
    }

    let elapsed_ms = started.elapsed().as_millis() as u64;

    // A cancelled job delivers nothing, even if the strategy finished anyway.
    if cancel.is_cancelled() || matches!(result, Err(ProductionError::Cancelled)) {
        debug!(job_id = %id, elapsed_ms, "Job cancelled");
        return;
    }

    let delivery = match result {
        Ok(bitmap) => {
            shared.stats.record_completed();
            debug!(job_id = %id, tile = %job.tile(), elapsed_ms, "Job completed");
            Delivery::Completed { id, job, bitmap }
        }
        Err(err) => {
            shared.stats.record_failed();
            let kind = err.kind().unwrap_or(FailureKind::TransferFailure);
            match kind {
                FailureKind::UnreachableSource => {
                    debug!(job_id = %id, tile = %job.tile(), error = %err, "Source unreachable")
                }
                FailureKind::TransferFailure => {
                    warn!(job_id = %id, tile = %job.tile(), error = %err, "Transfer failed")
                }
                FailureKind::MalformedPayload => {
                    warn!(job_id = %id, tile = %job.tile(), error = %err, "Malformed payload")
                }
            }
            Delivery::Failed {
                id,
                job,
                kind,
                detail: err.to_string(),
            }
        }
    };

    if deliveries.send(delivery).is_err() {
        debug!(job_id = %id, "Delivery receiver dropped");
    }
}
