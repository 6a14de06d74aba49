//! Tile production strategies.
//!
//! A strategy turns one [`RenderJob`] into a [`TileBitmap`] through the
//! lifecycle `prepare → produce → cleanup`. Every worker thread owns its
//! own strategy instance, so strategies keep per-worker scratch state
//! without locking:
//!
//! - [`LocalRenderer`] decodes a local map file and paints the tile
//! - [`RemoteFetcher`] downloads a pre-rendered tile image
//!
//! `produce` receives the job's cancellation token and checks it at its
//! checkpoints (after each block read, after the network read), returning
//! [`ProductionError::Cancelled`] once it fires.

mod bitmap;
mod error;
mod local;
pub mod remote;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

pub use bitmap::{TileBitmap, TILE_DIMENSION, TILE_PIXELS};
pub use error::{FailureKind, ProductionError};
pub use local::{LocalRenderer, RenderTheme};
pub use remote::{HttpClient, RemoteFetcher, RemoteSource, ReqwestClient};

use crate::job::{ProductionMode, RenderJob};
use crate::mapfile::MapFileRegistry;

/// Per-job production lifecycle.
pub trait ProductionStrategy: Send {
    /// The production mode whose jobs this strategy handles.
    fn mode(&self) -> ProductionMode;

    /// Resets per-job state before `produce`.
    fn prepare(&mut self, _job: &RenderJob) {}

    /// Produces the tile.
    fn produce(
        &mut self,
        job: &RenderJob,
        cancel: &CancellationToken,
    ) -> Result<TileBitmap, ProductionError>;

    /// Releases transient buffers. Called after every `produce`, whatever
    /// its outcome.
    fn cleanup(&mut self, _job: &RenderJob) {}
}

/// The built-in strategies.
pub enum Strategy {
    LocalRender(LocalRenderer),
    RemoteFetch(RemoteFetcher),
}

impl ProductionStrategy for Strategy {
    fn mode(&self) -> ProductionMode {
        match self {
            Strategy::LocalRender(s) => s.mode(),
            Strategy::RemoteFetch(s) => s.mode(),
        }
    }

    fn prepare(&mut self, job: &RenderJob) {
        match self {
            Strategy::LocalRender(s) => s.prepare(job),
            Strategy::RemoteFetch(s) => s.prepare(job),
        }
    }

    fn produce(
        &mut self,
        job: &RenderJob,
        cancel: &CancellationToken,
    ) -> Result<TileBitmap, ProductionError> {
        match self {
            Strategy::LocalRender(s) => s.produce(job, cancel),
            Strategy::RemoteFetch(s) => s.produce(job, cancel),
        }
    }

    fn cleanup(&mut self, job: &RenderJob) {
        match self {
            Strategy::LocalRender(s) => s.cleanup(job),
            Strategy::RemoteFetch(s) => s.cleanup(job),
        }
    }
}

/// Builds one strategy per worker from shared collaborators.
#[derive(Clone)]
pub struct StrategyFactory {
    registry: Arc<MapFileRegistry>,
    client: Arc<dyn HttpClient>,
    source: Arc<RemoteSource>,
    theme: RenderTheme,
}

impl StrategyFactory {
    pub fn new(
        registry: Arc<MapFileRegistry>,
        client: Arc<dyn HttpClient>,
        source: RemoteSource,
    ) -> Self {
        Self {
            registry,
            client,
            source: Arc::new(source),
            theme: RenderTheme::default(),
        }
    }

    pub fn with_theme(mut self, theme: RenderTheme) -> Self {
        self.theme = theme;
        self
    }

    pub fn registry(&self) -> &Arc<MapFileRegistry> {
        &self.registry
    }

    /// Creates a fresh strategy for a worker of the given mode.
    pub fn create(&self, mode: ProductionMode) -> Strategy {
        match mode {
            ProductionMode::LocalRender => Strategy::LocalRender(LocalRenderer::with_theme(
                Arc::clone(&self.registry),
                self.theme,
            )),
            ProductionMode::RemoteFetch => Strategy::RemoteFetch(RemoteFetcher::new(
                Arc::clone(&self.client),
                Arc::clone(&self.source),
            )),
        }
    }
}
