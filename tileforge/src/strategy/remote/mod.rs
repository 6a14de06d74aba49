//! Remote-fetch strategy: HTTP client, server description, and fetcher.

mod fetcher;
pub(crate) mod http;
mod source;

pub use fetcher::RemoteFetcher;
pub use http::{HttpClient, ReqwestClient, MAX_RESPONSE_BYTES};
pub use source::RemoteSource;
