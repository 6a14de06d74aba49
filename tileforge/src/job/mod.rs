//! Render job descriptors.
//!
//! A [`RenderJob`] describes one unit of tile-production work. Its identity
//! is `(tile, mode, source_file, debug_frame)`; the priority is a scheduling
//! attribute only, so resubmitting the same tile at another priority refers
//! to the same job.
//!
//! Priorities follow "lower is more urgent": a job at priority 1 is
//! dequeued before a job at priority 2.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::coord::TileAddress;

/// Priority of tiles currently visible in the viewport.
pub const PRIORITY_VISIBLE: i32 = 0;

/// Default priority for jobs that do not set one.
pub const PRIORITY_DEFAULT: i32 = 10;

/// Priority for speculative work such as neighbouring tiles.
pub const PRIORITY_SPECULATIVE: i32 = 100;

/// How a tile is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProductionMode {
    /// Decode a local map-data file and render the tile.
    LocalRender,
    /// Download a pre-rendered tile image.
    RemoteFetch,
}

impl ProductionMode {
    /// All modes, in index order.
    pub const ALL: [ProductionMode; 2] = [ProductionMode::LocalRender, ProductionMode::RemoteFetch];

    /// Dense index for per-mode tables.
    pub fn index(self) -> usize {
        match self {
            ProductionMode::LocalRender => 0,
            ProductionMode::RemoteFetch => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ProductionMode::LocalRender => "local-render",
            ProductionMode::RemoteFetch => "remote-fetch",
        }
    }
}

impl fmt::Display for ProductionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Handle returned by the scheduler for a submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

impl JobId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Lifecycle state of a job known to the scheduler.
///
/// Jobs leave the scheduler when they complete, fail or are cancelled; the
/// terminal outcome is reported through the delivery channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    /// Queued, waiting for a worker.
    Pending,
    /// Handed to a worker's strategy.
    InProgress,
}

/// One unit of tile-production work.
#[derive(Debug, Clone)]
pub struct RenderJob {
    tile: TileAddress,
    mode: ProductionMode,
    source_file: Option<Arc<str>>,
    debug_frame: bool,
    priority: i32,
}

impl RenderJob {
    /// Creates a job at [`PRIORITY_DEFAULT`] with no source file and no
    /// debug frame.
    pub fn new(tile: TileAddress, mode: ProductionMode) -> Self {
        Self {
            tile,
            mode,
            source_file: None,
            debug_frame: false,
            priority: PRIORITY_DEFAULT,
        }
    }

    /// Creates a remote-fetch job.
    pub fn remote(tile: TileAddress) -> Self {
        Self::new(tile, ProductionMode::RemoteFetch)
    }

    /// Creates a local-render job reading from the given map file identity.
    pub fn local(tile: TileAddress, source_file: impl Into<Arc<str>>) -> Self {
        Self::new(tile, ProductionMode::LocalRender).with_source_file(source_file)
    }

    pub fn with_source_file(mut self, source_file: impl Into<Arc<str>>) -> Self {
        self.source_file = Some(source_file.into());
        self
    }

    pub fn with_debug_frame(mut self, debug_frame: bool) -> Self {
        self.debug_frame = debug_frame;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn tile(&self) -> &TileAddress {
        &self.tile
    }

    pub fn mode(&self) -> ProductionMode {
        self.mode
    }

    pub fn source_file(&self) -> Option<&str> {
        self.source_file.as_deref()
    }

    pub fn debug_frame(&self) -> bool {
        self.debug_frame
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub(crate) fn set_priority(&mut self, priority: i32) {
        self.priority = priority;
    }
}

impl PartialEq for RenderJob {
    fn eq(&self, other: &Self) -> bool {
        self.tile == other.tile
            && self.mode == other.mode
            && self.source_file == other.source_file
            && self.debug_frame == other.debug_frame
    }
}

impl Eq for RenderJob {}

impl Hash for RenderJob {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tile.hash(state);
        self.mode.hash(state);
        self.source_file.hash(state);
        self.debug_frame.hash(state);
    }
}

impl fmt::Display for RenderJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.mode, self.tile)?;
        if let Some(source) = &self.source_file {
            write!(f, " from {}", source)?;
        }
        Ok(())
    }
}
