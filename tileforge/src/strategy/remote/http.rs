//! HTTP client abstraction for testability.

use std::io::Read;
use std::time::Duration;

use crate::codec::MAXIMUM_BUFFER_SIZE;
use crate::config::RemoteSourceConfig;
use crate::strategy::ProductionError;

/// Largest response body accepted from a tile server.
pub const MAX_RESPONSE_BYTES: usize = MAXIMUM_BUFFER_SIZE;

/// Trait for HTTP client operations.
///
/// Allows mock clients to be injected in tests. Implementations classify
/// their failures: a host that cannot be resolved or connected to is
/// [`ProductionError::UnreachableSource`], everything else that goes wrong
/// on the wire is [`ProductionError::TransferFailure`].
pub trait HttpClient: Send + Sync {
    /// Performs a blocking HTTP GET and returns the response body.
    fn get(&self, url: &str) -> Result<Vec<u8>, ProductionError>;
}

/// Real HTTP client implementation using reqwest.
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Creates a client with the given timeout and user agent.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, ProductionError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                ProductionError::TransferFailure(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }

    /// Creates a client from the `[remote]` settings.
    pub fn from_config(config: &RemoteSourceConfig) -> Result<Self, ProductionError> {
        Self::new(config.timeout_secs, &config.user_agent)
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<Vec<u8>, ProductionError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| classify(url, e))?;

        if !response.status().is_success() {
            return Err(ProductionError::TransferFailure(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        if let Some(len) = response.content_length() {
            if len > MAX_RESPONSE_BYTES as u64 {
                return Err(oversized(url));
            }
        }

        read_capped(response, MAX_RESPONSE_BYTES).map_err(|e| match e {
            ProductionError::MalformedPayload(_) => oversized(url),
            other => other,
        })
    }
}

/// Reads a body of at most `limit` bytes.
///
/// A longer body is a [`ProductionError::MalformedPayload`]; a read error is
/// a [`ProductionError::TransferFailure`].
pub(crate) fn read_capped(reader: impl Read, limit: usize) -> Result<Vec<u8>, ProductionError> {
    let mut body = Vec::new();
    reader
        .take(limit as u64 + 1)
        .read_to_end(&mut body)
        .map_err(|e| ProductionError::TransferFailure(format!("Failed to read response: {}", e)))?;

    if body.len() > limit {
        return Err(ProductionError::MalformedPayload(format!(
            "response body exceeds {} bytes",
            limit
        )));
    }
    Ok(body)
}

fn oversized(url: &str) -> ProductionError {
    ProductionError::MalformedPayload(format!(
        "response from {} exceeds {} bytes",
        url, MAX_RESPONSE_BYTES
    ))
}

fn classify(url: &str, err: reqwest::Error) -> ProductionError {
    if err.is_connect() {
        ProductionError::UnreachableSource(format!("{}: {}", url, err))
    } else {
        ProductionError::TransferFailure(format!("Request failed: {}", err))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Mock HTTP client recording requested URLs.
    pub(crate) struct MockHttpClient {
        pub response: Result<Vec<u8>, ProductionError>,
        pub requests: Mutex<Vec<String>>,
    }

    impl MockHttpClient {
        pub fn new(response: Result<Vec<u8>, ProductionError>) -> Self {
            Self {
                response,
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().len()
        }
    }

    impl HttpClient for MockHttpClient {
        fn get(&self, url: &str) -> Result<Vec<u8>, ProductionError> {
            self.requests.lock().push(url.to_string());
            self.response.clone()
        }
    }

    #[test]
    fn test_read_capped_accepts_body_at_limit() {
        let body = read_capped(std::io::Cursor::new(vec![7u8; 16]), 16).unwrap();
        assert_eq!(body.len(), 16);
    }

    #[test]
    fn test_read_capped_rejects_oversized_body() {
        let err = read_capped(std::io::Cursor::new(vec![7u8; 17]), 16).unwrap_err();
        assert!(matches!(err, ProductionError::MalformedPayload(_)));
    }

    #[test]
    fn test_mock_client_records_requests() {
        let mock = MockHttpClient::new(Ok(vec![1, 2, 3, 4]));

        assert_eq!(mock.get("http://example.com/a").unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(mock.request_count(), 1);
    }
}
