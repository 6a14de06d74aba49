//! Remote-fetch production strategy.

use std::io::Cursor;
use std::sync::Arc;

use image::ImageReader;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::http::HttpClient;
use super::source::RemoteSource;
use crate::job::{ProductionMode, RenderJob};
use crate::strategy::bitmap::{argb, TileBitmap, TILE_DIMENSION, TILE_PIXELS};
use crate::strategy::{ProductionError, ProductionStrategy};

/// Downloads pre-rendered tiles from a [`RemoteSource`].
///
/// Each worker owns one fetcher. The URL buffer is reused across jobs; the
/// decode scratch buffer lives from `produce` until `cleanup`.
pub struct RemoteFetcher {
    client: Arc<dyn HttpClient>,
    source: Arc<RemoteSource>,
    url: String,
    scratch: Option<Vec<u32>>,
}

impl RemoteFetcher {
    pub fn new(client: Arc<dyn HttpClient>, source: Arc<RemoteSource>) -> Self {
        Self {
            client,
            source,
            url: String::new(),
            scratch: None,
        }
    }

    pub fn source(&self) -> &RemoteSource {
        &self.source
    }

    /// True while a decode scratch buffer is held.
    pub fn holds_scratch(&self) -> bool {
        self.scratch.is_some()
    }

    fn malformed(&self, err: impl std::fmt::Display) -> ProductionError {
        ProductionError::MalformedPayload(format!("undecodable image from {}: {}", self.url, err))
    }

    fn decode(&mut self, body: &[u8]) -> Result<TileBitmap, ProductionError> {
        // Dimensions come from the image header, before any pixel allocation.
        let (width, height) = ImageReader::new(Cursor::new(body))
            .with_guessed_format()
            .map_err(|e| self.malformed(e))?
            .into_dimensions()
            .map_err(|e| self.malformed(e))?;

        if width != TILE_DIMENSION || height != TILE_DIMENSION {
            return Err(ProductionError::MalformedPayload(format!(
                "image from {} is {}x{}, expected {}x{}",
                self.url, width, height, TILE_DIMENSION, TILE_DIMENSION
            )));
        }

        let image = ImageReader::new(Cursor::new(body))
            .with_guessed_format()
            .map_err(|e| self.malformed(e))?
            .decode()
            .map_err(|e| self.malformed(e))?;

        let rgba = image.to_rgba8();
        let scratch = self
            .scratch
            .get_or_insert_with(|| Vec::with_capacity(TILE_PIXELS));
        scratch.clear();
        scratch.extend(rgba.pixels().map(|p| argb(p[0], p[1], p[2], p[3])));

        TileBitmap::from_pixels(scratch.clone())
    }
}

impl ProductionStrategy for RemoteFetcher {
    fn mode(&self) -> ProductionMode {
        ProductionMode::RemoteFetch
    }

    fn prepare(&mut self, _job: &RenderJob) {
        self.url.clear();
    }

    fn produce(
        &mut self,
        job: &RenderJob,
        cancel: &CancellationToken,
    ) -> Result<TileBitmap, ProductionError> {
        let tile = job.tile();
        if !self.source.supports_zoom(tile.zoom()) {
            return Err(ProductionError::TransferFailure(format!(
                "unsupported zoom {} for {}",
                tile.zoom(),
                self.source.host()
            )));
        }

        self.source.write_url(tile, &mut self.url);
        let body = self.client.get(&self.url)?;
        debug!(url = %self.url, bytes = body.len(), "Tile downloaded");

        if cancel.is_cancelled() {
            return Err(ProductionError::Cancelled);
        }

        self.decode(&body)
    }

    fn cleanup(&mut self, _job: &RenderJob) {
        self.scratch = None;
    }
}
