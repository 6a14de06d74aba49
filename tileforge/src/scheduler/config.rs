//! Scheduler configuration.

/// Default number of local-render workers.
pub const DEFAULT_LOCAL_WORKERS: usize = 2;

/// Default number of remote-fetch workers.
pub const DEFAULT_REMOTE_WORKERS: usize = 4;

/// Default prefix for worker thread names.
pub const DEFAULT_THREAD_NAME_PREFIX: &str = "tileforge-worker";

/// Worker pool layout for a [`JobScheduler`](super::JobScheduler).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Workers bound to a local-render strategy.
    pub local_workers: usize,

    /// Workers bound to a remote-fetch strategy.
    pub remote_workers: usize,

    /// Worker threads are named `<prefix>-<mode>-<n>`.
    pub thread_name_prefix: String,
}

impl SchedulerConfig {
    pub fn with_local_workers(mut self, workers: usize) -> Self {
        self.local_workers = workers;
        self
    }

    pub fn with_remote_workers(mut self, workers: usize) -> Self {
        self.remote_workers = workers;
        self
    }

    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Total number of worker threads.
    pub fn total_workers(&self) -> usize {
        self.local_workers + self.remote_workers
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            local_workers: DEFAULT_LOCAL_WORKERS,
            remote_workers: DEFAULT_REMOTE_WORKERS,
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
        }
    }
}
