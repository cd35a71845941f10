mod basic;
mod client;
pub mod auth;
mod throttle;

pub use auth::{ApiKeyHeader, UrlParamKey};
pub use basic::BasicClient;
pub use client::HttpClient;
pub use throttle::Throttle;

use anyhow::{Context, Result, bail};
use bytes::Bytes;

/// Fetches `url` through `client` and returns the response body.
///
/// Non-success statuses are errors; transit providers signal bad API keys
/// and unknown feeds through 4xx responses that would otherwise decode as
/// empty protobuf messages.
pub async fn fetch_bytes<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Bytes> {
    let req = reqwest::Request::new(
        reqwest::Method::GET,
        url.parse().with_context(|| format!("invalid feed URL {url}"))?,
    );

    let resp = client
        .execute(req)
        .await
        .with_context(|| format!("fetching {url}"))?;

    let status = resp.status();
    if !status.is_success() {
        bail!("feed request to {url} returned status {status}");
    }

    Ok(resp.bytes().await.with_context(|| format!("reading body from {url}"))?)
}
