//! Resolves a feed's `gbfs.json` manifest into concrete sub-feed URLs.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::debug;

use crate::config::{FeedConfig, FileMap};
use crate::error::{Error, Result};
use crate::fetch::{HttpClient, fetch_document};
use crate::parser::{FeedEntry, Manifest};

/// Logical field name -> published URL, for the documents the feed actually lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubFeedUrls(BTreeMap<String, String>);

impl SubFeedUrls {
    /// URL for a logical name such as [`crate::config::FREE_STATUS`].
    /// `None` means the feed does not publish that document.
    pub fn get(&self, logical: &str) -> Option<&str> {
        self.0.get(logical).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Matches manifest entries to logical names by document name.
///
/// When a document name is listed twice the last entry wins. Logical names
/// whose document is not listed are simply absent.
pub fn resolve_feeds(entries: &[FeedEntry], files: &FileMap) -> SubFeedUrls {
    let published: BTreeMap<&str, &str> = entries
        .iter()
        .map(|e| (e.name.as_str(), e.url.as_str()))
        .collect();

    SubFeedUrls(
        files
            .iter()
            .filter_map(|(logical, document)| {
                published
                    .get(document.as_str())
                    .map(|url| (logical.clone(), (*url).to_string()))
            })
            .collect(),
    )
}

/// Fetches `{base}gbfs.json` and resolves the feed's logical names.
///
/// # Errors
///
/// [`Error::ManifestUnavailable`] if the manifest cannot be fetched or decoded.
#[tracing::instrument(skip_all, fields(feed = %feed.name))]
pub async fn discover<C: HttpClient>(
    client: &C,
    feed: &FeedConfig,
    timeout: Duration,
) -> Result<SubFeedUrls> {
    let url = feed.manifest_url();
    let manifest: Manifest = fetch_document(client, &url, timeout)
        .await
        .map_err(|e| Error::ManifestUnavailable(Error::describe(&e)))?;

    let urls = resolve_feeds(&manifest.data.en.feeds, &feed.files);
    debug!(
        listed = manifest.data.en.feeds.len(),
        resolved = urls.len(),
        "Manifest resolved"
    );
    Ok(urls)
}
