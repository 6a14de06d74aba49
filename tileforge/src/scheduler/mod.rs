//! Priority job scheduler.
//!
//! The [`JobScheduler`] orders pending [`RenderJob`]s by priority and
//! dispatches them to a fixed pool of worker threads, each permanently bound
//! to one [`ProductionStrategy`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          JobScheduler                            │
//! │                                                                  │
//! │  submit ─────► ┌──────────────┐  identity already pending?       │
//! │  reprioritize  │  Coalescing  │──► keep the more urgent priority  │
//! │  cancel        └──────┬───────┘                                  │
//! │                       ▼                                          │
//! │            ┌─────────────────────┐                               │
//! │            │ PendingQueue / mode │  (single lock)                │
//! │            └──────────┬──────────┘                               │
//! │                       ▼ pop min                                  │
//! │    ┌────────────┐ ┌────────────┐ ┌────────────┐                  │
//! │    │ Worker 0   │ │ Worker 1   │ │ Worker n   │  one strategy    │
//! │    │ (local)    │ │ (remote)   │ │ (remote)   │  each            │
//! │    └─────┬──────┘ └─────┬──────┘ └─────┬──────┘                  │
//! │          └──────────────┼──────────────┘                         │
//! │                         ▼                                        │
//! │                  Delivery channel                                │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Per job: `PENDING → IN_PROGRESS → {COMPLETED | FAILED}`. A pending job
//! can be cancelled outright; an in-progress job is signalled through its
//! cancellation token and stops at the strategy's next checkpoint. Failed
//! jobs are never retried by the scheduler.
//!
//! # Example
//!
//! ```ignore
//! use tileforge::scheduler::{JobScheduler, SchedulerConfig};
//!
//! let (scheduler, mut deliveries) = JobScheduler::start(&SchedulerConfig::default(), &factory)?;
//! let id = scheduler.submit(RenderJob::remote(TileAddress::new(35, 21, 6)).with_priority(5))?;
//! scheduler.reprioritize(id, 1)?;
//! let delivery = deliveries.blocking_recv();
//! ```

mod config;
mod delivery;
mod error;
mod queue;
mod worker;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub use config::{
    SchedulerConfig, DEFAULT_LOCAL_WORKERS, DEFAULT_REMOTE_WORKERS, DEFAULT_THREAD_NAME_PREFIX,
};
pub use delivery::Delivery;
pub use error::SchedulerError;
pub use queue::PendingQueue;

use crate::job::{JobId, JobState, ProductionMode, RenderJob};
use crate::strategy::{ProductionStrategy, StrategyFactory};

const MODES: usize = ProductionMode::ALL.len();

// =============================================================================
// Statistics
// =============================================================================

/// Snapshot of scheduler counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Jobs accepted as new work.
    pub submitted: u64,
    /// Submissions merged into an existing pending or in-progress job.
    pub coalesced: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
}

#[derive(Debug, Default)]
struct StatsCounters {
    submitted: AtomicU64,
    coalesced: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
}

impl StatsCounters {
    fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::Relaxed);
    }

    fn record_coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    fn record_cancelled(&self) {
        self.cancelled.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> SchedulerStats {
        SchedulerStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
        }
    }
}

// =============================================================================
// Shared State
// =============================================================================

#[derive(Debug)]
struct TrackedJob {
    job: RenderJob,
    state: JobState,
    /// Set when a worker claims the job.
    cancel: Option<CancellationToken>,
}

impl TrackedJob {
    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| c.is_cancelled())
    }
}

#[derive(Debug, Default)]
struct Inner {
    jobs: HashMap<JobId, TrackedJob>,
    /// Live (pending or uncancelled in-progress) job for each identity.
    identities: HashMap<RenderJob, JobId>,
    queues: [PendingQueue; MODES],
    next_id: u64,
    shutdown: bool,
}

struct Shared {
    inner: Mutex<Inner>,
    /// Signalled when a job of the corresponding mode becomes pending.
    available: [Condvar; MODES],
    workers: [usize; MODES],
    stats: StatsCounters,
}

// =============================================================================
// Job Scheduler
// =============================================================================

/// Priority scheduler dispatching render jobs to strategy-bound workers.
///
/// All methods take `&self` and may be called from any thread; they only
/// contend briefly for the pending-queue lock and never wait for
/// in-progress work. Dropping the scheduler shuts it down.
pub struct JobScheduler {
    shared: Arc<Shared>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl JobScheduler {
    /// Starts a scheduler with the worker layout of `config`, creating one
    /// strategy per worker from `factory`.
    ///
    /// Returns the scheduler and the receiving end of its delivery channel.
    pub fn start(
        config: &SchedulerConfig,
        factory: &StrategyFactory,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Delivery>), SchedulerError> {
        let mut strategies: Vec<Box<dyn ProductionStrategy>> =
            Vec::with_capacity(config.total_workers());
        for _ in 0..config.local_workers {
            strategies.push(Box::new(factory.create(ProductionMode::LocalRender)));
        }
        for _ in 0..config.remote_workers {
            strategies.push(Box::new(factory.create(ProductionMode::RemoteFetch)));
        }

        Self::from_strategies(strategies, &config.thread_name_prefix)
    }

    /// Starts one worker thread per strategy.
    ///
    /// Each worker drains the pending jobs of its strategy's mode. The
    /// delivery channel closes once every worker has stopped.
    pub fn from_strategies(
        strategies: Vec<Box<dyn ProductionStrategy>>,
        thread_name_prefix: &str,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Delivery>), SchedulerError> {
        let mut workers = [0usize; MODES];
        for strategy in &strategies {
            workers[strategy.mode().index()] += 1;
        }

        let (delivery_tx, delivery_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            inner: Mutex::new(Inner::default()),
            available: [Condvar::new(), Condvar::new()],
            workers,
            stats: StatsCounters::default(),
        });

        let scheduler = Self {
            shared,
            handles: Mutex::new(Vec::with_capacity(strategies.len())),
        };

        let mut ordinals = [0usize; MODES];
        for strategy in strategies {
            let mode = strategy.mode();
            let ordinal = ordinals[mode.index()];
            ordinals[mode.index()] += 1;

            let shared = Arc::clone(&scheduler.shared);
            let deliveries = delivery_tx.clone();
            let handle = std::thread::Builder::new()
                .name(format!("{}-{}-{}", thread_name_prefix, mode, ordinal))
                .spawn(move || worker::run(shared, strategy, deliveries))
                .map_err(SchedulerError::Spawn)?;
            scheduler.handles.lock().push(handle);
        }

        info!(
            local_workers = workers[ProductionMode::LocalRender.index()],
            remote_workers = workers[ProductionMode::RemoteFetch.index()],
            "Job scheduler started"
        );

        Ok((scheduler, delivery_rx))
    }

    /// Submits a job.
    ///
    /// If a job with the same identity is already pending, its priority
    /// becomes the more urgent of the two and its id is returned; if it is
    /// in progress, the submission has no effect and its id is returned.
    pub fn submit(&self, job: RenderJob) -> Result<JobId, SchedulerError> {
        let mode = job.mode();
        let mut inner = self.shared.inner.lock();

        if inner.shutdown {
            return Err(SchedulerError::ShutDown);
        }
        if self.shared.workers[mode.index()] == 0 {
            return Err(SchedulerError::NoWorkers(mode));
        }

        if let Some(&id) = inner.identities.get(&job) {
            let Inner { jobs, queues, .. } = &mut *inner;
            if let Some(tracked) = jobs.get_mut(&id) {
                if tracked.state == JobState::Pending && job.priority() < tracked.job.priority() {
                    queues[mode.index()].change_priority(id, job.priority());
                    tracked.job.set_priority(job.priority());
                }
                self.shared.stats.record_coalesced();
                debug!(job_id = %id, priority = tracked.job.priority(), "Job coalesced");
                return Ok(id);
            }
        }

        let id = JobId::new(inner.next_id);
        inner.next_id += 1;

        inner.queues[mode.index()].push(id, job.priority());
        inner.identities.insert(job.clone(), id);
        debug!(job_id = %id, job = %job, priority = job.priority(), "Job pending");
        inner.jobs.insert(
            id,
            TrackedJob {
                job,
                state: JobState::Pending,
                cancel: None,
            },
        );
        drop(inner);

        self.shared.stats.record_submitted();
        self.shared.available[mode.index()].notify_one();
        Ok(id)
    }

    /// Sets a job's priority.
    ///
    /// A pending job moves to its new place in the queue in O(log n). The
    /// priority of an in-progress job is recorded but has no effect.
    pub fn reprioritize(&self, id: JobId, priority: i32) -> Result<(), SchedulerError> {
        let mut inner = self.shared.inner.lock();
        let Inner { jobs, queues, .. } = &mut *inner;

        let tracked = jobs
            .get_mut(&id)
            .filter(|t| !t.is_cancelled())
            .ok_or(SchedulerError::UnknownJob(id))?;

        if tracked.state == JobState::Pending {
            queues[tracked.job.mode().index()].change_priority(id, priority);
        }
        tracked.job.set_priority(priority);
        debug!(job_id = %id, priority, "Job reprioritized");
        Ok(())
    }

    /// Cancels a job.
    ///
    /// A pending job is removed without invoking any strategy. An
    /// in-progress job is signalled and stops at the next checkpoint. Neither
    /// delivers. Returns `false` if the job already finished or is unknown.
    pub fn cancel(&self, id: JobId) -> bool {
        let mut inner = self.shared.inner.lock();
        let Inner {
            jobs,
            identities,
            queues,
            ..
        } = &mut *inner;

        let Some(tracked) = jobs.get(&id) else {
            return false;
        };

        let state = tracked.state;
        match state {
            JobState::Pending => {
                queues[tracked.job.mode().index()].remove(id);
                if let Some(tracked) = jobs.remove(&id) {
                    identities.remove(&tracked.job);
                }
                debug!(job_id = %id, "Pending job cancelled");
            }
            JobState::InProgress => {
                if tracked.is_cancelled() {
                    return false;
                }
                if let Some(cancel) = &tracked.cancel {
                    cancel.cancel();
                }
                if identities.get(&tracked.job) == Some(&id) {
                    identities.remove(&tracked.job);
                }
                debug!(job_id = %id, "In-progress job signalled to cancel");
            }
        }

        self.shared.stats.record_cancelled();
        true
    }

    /// Number of pending jobs across all modes.
    pub fn pending_len(&self) -> usize {
        let inner = self.shared.inner.lock();
        inner.queues.iter().map(PendingQueue::len).sum()
    }

    /// Current state of a job, or `None` once it has finished or been
    /// cancelled.
    pub fn state(&self, id: JobId) -> Option<JobState> {
        let inner = self.shared.inner.lock();
        inner
            .jobs
            .get(&id)
            .filter(|t| !t.is_cancelled())
            .map(|t| t.state)
    }

    /// Current priority of a live job.
    pub fn priority(&self, id: JobId) -> Option<i32> {
        let inner = self.shared.inner.lock();
        inner
            .jobs
            .get(&id)
            .filter(|t| !t.is_cancelled())
            .map(|t| t.job.priority())
    }

    /// Number of workers bound to a mode.
    pub fn workers(&self, mode: ProductionMode) -> usize {
        self.shared.workers[mode.index()]
    }

    pub fn stats(&self) -> SchedulerStats {
        self.shared.stats.snapshot()
    }

    /// Stops the scheduler.
    ///
    /// New submissions are rejected, pending jobs are dropped, in-progress
    /// jobs are signalled to cancel, and every worker thread is joined.
    /// None of the dropped or cancelled jobs deliver. Idempotent.
    pub fn shutdown(&self) {
        let handles = std::mem::take(&mut *self.handles.lock());

        let dropped = {
            let mut inner = self.shared.inner.lock();
            inner.shutdown = true;

            let mut dropped = 0;
            let Inner { jobs, identities, queues, .. } = &mut *inner;
            for queue in queues.iter_mut() {
                for id in queue.drain() {
                    if let Some(tracked) = jobs.remove(&id) {
                        identities.remove(&tracked.job);
                    }
                    dropped += 1;
                }
            }
            for tracked in jobs.values() {
                if let Some(cancel) = &tracked.cancel {
                    cancel.cancel();
                }
            }
            identities.clear();
            dropped
        };

        for condvar in &self.shared.available {
            condvar.notify_all();
        }

        if handles.is_empty() {
            return;
        }

        for handle in handles {
            if handle.join().is_err() {
                warn!("Worker thread panicked");
            }
        }
        info!(dropped_pending = dropped, "Job scheduler stopped");
    }
}

impl Drop for JobScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for JobScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobScheduler")
            .field("workers", &self.shared.workers)
            .field("pending", &self.pending_len())
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::TileAddress;
    use crate::strategy::{ProductionError, TileBitmap};
    use std::sync::mpsc as std_mpsc;
    use std::time::Duration;

    /// Strategy that blocks inside `produce` until released.
    struct GatedStrategy {
        started: std_mpsc::Sender<RenderJob>,
        release: Arc<(Mutex<bool>, Condvar)>,
    }

    impl ProductionStrategy for GatedStrategy {
        fn mode(&self) -> ProductionMode {
            ProductionMode::RemoteFetch
        }

        fn produce(
            &mut self,
            job: &RenderJob,
            cancel: &CancellationToken,
        ) -> Result<TileBitmap, ProductionError> {
            let _ = self.started.send(job.clone());
            let (lock, condvar) = &*self.release;
            let mut released = lock.lock();
            while !*released {
                condvar.wait(&mut released);
            }
            if cancel.is_cancelled() {
                return Err(ProductionError::Cancelled);
            }
            Ok(TileBitmap::filled(0xFF00_0000))
        }
    }

    struct Harness {
        scheduler: JobScheduler,
        deliveries: mpsc::UnboundedReceiver<Delivery>,
        started: std_mpsc::Receiver<RenderJob>,
        release: Arc<(Mutex<bool>, Condvar)>,
    }

    impl Harness {
        fn new() -> Self {
            let (started_tx, started) = std_mpsc::channel();
            let release = Arc::new((Mutex::new(false), Condvar::new()));
            let strategy = GatedStrategy {
                started: started_tx,
                release: Arc::clone(&release),
            };
            let (scheduler, deliveries) =
                JobScheduler::from_strategies(vec![Box::new(strategy)], "test").unwrap();
            Self {
                scheduler,
                deliveries,
                started,
                release,
            }
        }

        fn wait_started(&self) -> RenderJob {
            self.started.recv_timeout(Duration::from_secs(5)).unwrap()
        }

        fn release(&self) {
            let (lock, condvar) = &*self.release;
            *lock.lock() = true;
            condvar.notify_all();
        }
    }

    fn job(column: i64, priority: i32) -> RenderJob {
        RenderJob::remote(TileAddress::new(column, 0, 10)).with_priority(priority)
    }

    #[test]
    fn test_no_workers_for_mode() {
        let harness = Harness::new();
        let result = harness
            .scheduler
            .submit(RenderJob::local(TileAddress::new(0, 0, 1), "a.map"));
        assert!(matches!(
            result,
            Err(SchedulerError::NoWorkers(ProductionMode::LocalRender))
        ));
        harness.release();
    }

    #[test]
    fn test_coalesce_keeps_more_urgent_priority() {
        let harness = Harness::new();
        let scheduler = &harness.scheduler;

        scheduler.submit(job(0, 0)).unwrap();
        harness.wait_started();

        let a = scheduler.submit(job(1, 5)).unwrap();
        let b = scheduler.submit(job(1, 1)).unwrap();
        let c = scheduler.submit(job(1, 9)).unwrap();

        assert_eq!(a, b);
        assert_eq!(a, c);
        assert_eq!(scheduler.pending_len(), 1);
        assert_eq!(scheduler.priority(a), Some(1));
        assert_eq!(scheduler.stats().coalesced, 2);
        harness.release();
    }

    #[test]
    fn test_submit_in_progress_has_no_effect() {
        let harness = Harness::new();
        let scheduler = &harness.scheduler;

        let id = scheduler.submit(job(0, 3)).unwrap();
        harness.wait_started();

        assert_eq!(scheduler.state(id), Some(JobState::InProgress));
        assert_eq!(scheduler.submit(job(0, 0)).unwrap(), id);
        assert_eq!(scheduler.pending_len(), 0);
        harness.release();
    }

    #[test]
    fn test_cancel_pending() {
        let mut harness = Harness::new();

        harness.scheduler.submit(job(0, 0)).unwrap();
        harness.wait_started();
        let id = harness.scheduler.submit(job(1, 1)).unwrap();

        assert!(harness.scheduler.cancel(id));
        assert!(!harness.scheduler.cancel(id));
        assert_eq!(harness.scheduler.state(id), None);
        assert_eq!(harness.scheduler.pending_len(), 0);

        harness.release();
        let delivery = harness.deliveries.blocking_recv().unwrap();
        assert_eq!(delivery.job(), &job(0, 0));
        assert!(harness
            .started
            .recv_timeout(Duration::from_millis(100))
            .is_err());
    }

    #[test]
    fn test_cancel_in_progress_delivers_nothing() {
        let mut harness = Harness::new();

        let id = harness.scheduler.submit(job(0, 0)).unwrap();
        harness.wait_started();
        assert!(harness.scheduler.cancel(id));
        assert_eq!(harness.scheduler.state(id), None);
        assert!(matches!(
            harness.scheduler.reprioritize(id, 1),
            Err(SchedulerError::UnknownJob(_))
        ));

        let next = harness.scheduler.submit(job(1, 0)).unwrap();
        harness.release();

        let delivery = harness.deliveries.blocking_recv().unwrap();
        assert_eq!(delivery.id(), next);
    }

    #[test]
    fn test_reprioritize_reorders() {
        let mut harness = Harness::new();
        let scheduler = &harness.scheduler;

        scheduler.submit(job(0, 0)).unwrap();
        harness.wait_started();
        scheduler.submit(job(1, 2)).unwrap();
        let late = scheduler.submit(job(2, 7)).unwrap();
        scheduler.reprioritize(late, 1).unwrap();

        harness.release();
        let order: Vec<i64> = (0..2)
            .map(|_| harness.wait_started().tile().column())
            .collect();
        assert_eq!(order, vec![2, 1]);

        for _ in 0..3 {
            assert!(harness.deliveries.blocking_recv().unwrap().is_completed());
        }
    }

    #[test]
    fn test_shutdown_rejects_and_drops_pending() {
        let harness = Harness::new();

        harness.scheduler.submit(job(0, 0)).unwrap();
        harness.wait_started();
        harness.scheduler.submit(job(1, 0)).unwrap();

        harness.release();
        harness.scheduler.shutdown();

        assert_eq!(harness.scheduler.pending_len(), 0);
        assert!(matches!(
            harness.scheduler.submit(job(2, 0)),
            Err(SchedulerError::ShutDown)
        ));
        harness.scheduler.shutdown();
    }
}
