//! Remote tile server description and URL building.

use std::fmt::Write;

use crate::config::RemoteSourceConfig;
use crate::coord::TileAddress;

/// A remote tile server.
///
/// Tile URLs have the form
/// `<protocol>://<host><base_path>/<zoom>/<column>/<row>.<extension>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSource {
    protocol: String,
    host: String,
    base_path: String,
    extension: String,
    min_zoom: u8,
    max_zoom: u8,
    parallel_requests: usize,
}

impl RemoteSource {
    /// The public OpenStreetMap tile server.
    pub fn openstreetmap() -> Self {
        Self::from_config(&RemoteSourceConfig::default())
    }

    pub fn from_config(config: &RemoteSourceConfig) -> Self {
        Self {
            protocol: config.protocol.clone(),
            host: config.host.clone(),
            base_path: config.base_path.trim_end_matches('/').to_string(),
            extension: config.extension.clone(),
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
            parallel_requests: config.parallel_requests,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn min_zoom(&self) -> u8 {
        self.min_zoom
    }

    pub fn max_zoom(&self) -> u8 {
        self.max_zoom
    }

    /// Number of parallel requests the server tolerates.
    pub fn parallel_requests(&self) -> usize {
        self.parallel_requests
    }

    pub fn supports_zoom(&self, zoom: i8) -> bool {
        u8::try_from(zoom)
            .map(|z| (self.min_zoom..=self.max_zoom).contains(&z))
            .unwrap_or(false)
    }

    /// Appends the URL of `tile` to `buf`.
    pub fn write_url(&self, tile: &TileAddress, buf: &mut String) {
        // Writing into a String cannot fail.
        let _ = write!(
            buf,
            "{}://{}{}/{}/{}/{}.{}",
            self.protocol,
            self.host,
            self.base_path,
            tile.zoom(),
            tile.column(),
            tile.row(),
            self.extension
        );
    }

    pub fn url(&self, tile: &TileAddress) -> String {
        let mut url = String::new();
        self.write_url(tile, &mut url);
        url
    }
}

impl Default for RemoteSource {
    fn default() -> Self {
        Self::openstreetmap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openstreetmap_url() {
        let source = RemoteSource::openstreetmap();
        assert_eq!(
            source.url(&TileAddress::new(35, 21, 6)),
            "http://tile.openstreetmap.org/6/35/21.png"
        );
    }

    #[test]
    fn test_base_path_and_extension() {
        let config = RemoteSourceConfig::default()
            .with_protocol("https")
            .with_host("tiles.example.org")
            .with_base_path("/cycle/")
            .with_extension("jpg");
        let source = RemoteSource::from_config(&config);

        assert_eq!(
            source.url(&TileAddress::new(1, 2, 3)),
            "https://tiles.example.org/cycle/3/1/2.jpg"
        );
    }

    #[test]
    fn test_write_url_appends() {
        let source = RemoteSource::openstreetmap();
        let mut buf = String::from("GET ");
        source.write_url(&TileAddress::new(0, 0, 0), &mut buf);
        assert_eq!(buf, "GET http://tile.openstreetmap.org/0/0/0.png");
    }

    #[test]
    fn test_supports_zoom() {
        let source = RemoteSource::from_config(&RemoteSourceConfig::default().with_zoom_range(2, 10));
        assert!(!source.supports_zoom(1));
        assert!(source.supports_zoom(2));
        assert!(source.supports_zoom(10));
        assert!(!source.supports_zoom(11));
        assert!(!source.supports_zoom(-1));
    }
}
