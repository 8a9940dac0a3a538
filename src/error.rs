//! Failure taxonomy for the aggregation and classification engine.
//!
//! Feed failures never escape a refresh cycle: they are logged, stored in the
//! snapshot's feed reports, and the affected feed or category contributes no
//! entities for that cycle.

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Clone, Debug, Serialize, PartialEq, Eq)]
pub enum Error {
    /// `gbfs.json` could not be fetched or decoded; the whole feed is empty.
    #[error("code: manifest_unavailable, description: {0}")]
    ManifestUnavailable(String),

    /// One sub-feed could not be fetched or decoded; only its category is empty.
    #[error("code: sub_feed_unavailable, description: {0}")]
    SubFeedUnavailable(String),

    /// The feed's aggregation task panicked or was cancelled; the whole feed is empty.
    #[error("code: feed_failed, description: {0}")]
    FeedFailed(String),

    /// A zone feature has no usable polygon rings and is left out of the index.
    #[error("code: geometry_invalid, description: {0}")]
    GeometryInvalid(String),

    #[error("code: config_error, description: {0}")]
    Config(String),

    #[error("code: refresh_in_progress")]
    RefreshInProgress,
}

impl Error {
    /// Returns the error code.
    #[must_use]
    pub const fn code(&self) -> &str {
        match self {
            Self::ManifestUnavailable(_) => "manifest_unavailable",
            Self::SubFeedUnavailable(_) => "sub_feed_unavailable",
            Self::FeedFailed(_) => "feed_failed",
            Self::GeometryInvalid(_) => "geometry_invalid",
            Self::Config(_) => "config_error",
            Self::RefreshInProgress => "refresh_in_progress",
        }
    }

    /// Flattens an `anyhow` chain into a single description.
    pub(crate) fn describe(err: &anyhow::Error) -> String {
        let stack = err.chain().fold(String::new(), |cause, e| format!("{cause} -> {e}"));
        stack.trim_start_matches(" -> ").to_string()
    }
}

pub type Result<T> = std::result::Result<T, Error>;
