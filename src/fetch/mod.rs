mod basic;
mod client;
mod params;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use params::QueryParams;

use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::parser::parse_document;

/// Fetches above this duration are reported as slow.
const SLOW_FETCH: Duration = Duration::from_secs(15);

/// GETs `url` and returns the body, failing on non-success statuses.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?.error_for_status()?;
    Ok(resp.bytes().await?.to_vec())
}

/// GETs and decodes a GBFS JSON document, giving up after `timeout`.
///
/// A stalled request resolves to an error instead of blocking the caller.
pub async fn fetch_document<C, T>(client: &C, url: &str, timeout: Duration) -> Result<T>
where
    C: HttpClient,
    T: DeserializeOwned,
{
    let started = Instant::now();
    let bytes = tokio::time::timeout(timeout, fetch_bytes(client, url))
        .await
        .map_err(|_| anyhow!("timed out after {}s", timeout.as_secs_f64()))
        .and_then(|fetched| fetched)
        .with_context(|| format!("GET {url}"))?;

    let elapsed = started.elapsed();
    if elapsed > SLOW_FETCH {
        warn!(url, elapsed_secs = elapsed.as_secs(), "Feed fetch was slow");
    }
    debug!(url, bytes = bytes.len(), "Document received, parsing");

    parse_document(&bytes).with_context(|| format!("decoding {url}"))
}
