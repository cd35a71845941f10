use crate::fetch::client::HttpClient;
use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};

/// An [`HttpClient`] wrapper that injects an API key as an HTTP header.
///
/// `header_name` is the header field to set (e.g. `"api_key"`, the name most
/// GTFS-realtime providers expect, or `"Authorization"`). Requests pass
/// through untouched when no key is configured, so callers can wrap
/// unconditionally.
pub struct ApiKeyHeader<C> {
    inner: C,
    header_name: String,
    key: Option<String>,
}

impl<C> ApiKeyHeader<C> {
    pub fn new(inner: C, header_name: impl Into<String>, key: Option<String>) -> Self {
        Self {
            inner,
            header_name: header_name.into(),
            key,
        }
    }

    /// Convenience constructor for the `api_key` header used by GTFS
    /// providers such as the MTA.
    pub fn api_key(inner: C, key: Option<String>) -> Self {
        Self::new(inner, "api_key", key)
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ApiKeyHeader<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        if let Some(key) = &self.key {
            match (
                HeaderName::from_bytes(self.header_name.as_bytes()),
                HeaderValue::from_str(key),
            ) {
                (Ok(name), Ok(value)) => {
                    req.headers_mut().insert(name, value);
                }
                _ => {
                    tracing::warn!(
                        header = %self.header_name,
                        "API key header could not be encoded; request sent without it"
                    );
                }
            }
        }
        self.inner.execute(req).await
    }
}
