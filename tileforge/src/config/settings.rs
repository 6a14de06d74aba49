//! Settings structs for each configuration section.

use crate::mapfile::DEFAULT_INDEX_CACHE_CAPACITY;
use crate::scheduler::SchedulerConfig;

/// Default remote tile host.
pub const DEFAULT_REMOTE_HOST: &str = "tile.openstreetmap.org";

/// Default remote protocol.
pub const DEFAULT_REMOTE_PROTOCOL: &str = "http";

/// Default remote image extension.
pub const DEFAULT_REMOTE_EXTENSION: &str = "png";

/// Highest zoom level served by the default remote source.
pub const DEFAULT_REMOTE_MAX_ZOOM: u8 = 18;

/// Suggested number of parallel requests against one remote host.
pub const DEFAULT_PARALLEL_REQUESTS: usize = 8;

/// Default HTTP timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default HTTP user agent.
pub const DEFAULT_USER_AGENT: &str = concat!("tileforge/", env!("CARGO_PKG_VERSION"));

/// Complete user configuration as stored in `config.ini`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    /// `[scheduler]` section.
    pub scheduler: SchedulerConfig,
    /// `[cache]` section.
    pub cache: IndexCacheConfig,
    /// `[remote]` section.
    pub remote: RemoteSourceConfig,
}

/// Index-block cache settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexCacheConfig {
    /// Maximum number of index blocks kept per map file.
    pub capacity: u64,
}

impl IndexCacheConfig {
    pub fn with_capacity(mut self, capacity: u64) -> Self {
        self.capacity = capacity;
        self
    }
}

impl Default for IndexCacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_INDEX_CACHE_CAPACITY,
        }
    }
}

/// Remote tile server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSourceConfig {
    pub protocol: String,
    pub host: String,
    /// Path prefix placed before `/<zoom>/<column>/<row>`; may be empty.
    pub base_path: String,
    pub extension: String,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub parallel_requests: usize,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl RemoteSourceConfig {
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    pub fn with_base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

impl Default for RemoteSourceConfig {
    fn default() -> Self {
        Self {
            protocol: DEFAULT_REMOTE_PROTOCOL.to_string(),
            host: DEFAULT_REMOTE_HOST.to_string(),
            base_path: String::new(),
            extension: DEFAULT_REMOTE_EXTENSION.to_string(),
            min_zoom: 0,
            max_zoom: DEFAULT_REMOTE_MAX_ZOOM,
            parallel_requests: DEFAULT_PARALLEL_REQUESTS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}
