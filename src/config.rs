//! Static engine configuration, read once at startup from a JSON file.
//!
//! ```json
//! {
//!   "zones": { "path": "zones.geojson", "property": "zone" },
//!   "fetch_timeout_secs": 30,
//!   "feeds": [
//!     {
//!       "url": "https://gbfs.example.com/providence/",
//!       "name": "Example",
//!       "url_params": { "key": "abc" },
//!       "free_vehicles": { "layer_name": "Example", "display": { "type": "circle" } },
//!       "hubs": { "layer_name": "Example Stations" }
//!     }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Logical name of the system information document.
pub const SYSINFO: &str = "sysinfo";
/// Logical name of the free vehicle status document.
pub const FREE_STATUS: &str = "free_status";
/// Logical name of the static station document.
pub const STATION_INFO: &str = "station_info";
/// Logical name of the dynamic station document.
pub const STATION_STATUS: &str = "station_status";

/// Logical field name -> document name published in `gbfs.json`.
pub type FileMap = BTreeMap<String, String>;

/// The mapping every feed uses unless it overrides it.
pub fn default_files() -> FileMap {
    [
        (SYSINFO, "system_information"),
        (FREE_STATUS, "free_bike_status"),
        (STATION_INFO, "station_information"),
        (STATION_STATUS, "station_status"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

const fn default_timeout_secs() -> u64 {
    30
}

fn default_zone_property() -> String {
    "zone".to_string()
}

/// One published entity category of a feed.
///
/// `layer_name` is the label entities of this category are counted under.
/// `display` is presentation metadata and is carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub layer_name: String,
    #[serde(default)]
    pub display: serde_json::Value,
}

/// One GBFS data source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Base URL; `gbfs.json` is resolved relative to it.
    pub url: String,
    pub name: String,
    /// Query pairs appended to every request made for this feed.
    #[serde(default)]
    pub url_params: BTreeMap<String, String>,
    #[serde(default)]
    pub free_vehicles: Option<CategoryConfig>,
    #[serde(default)]
    pub hubs: Option<CategoryConfig>,
    /// Per-feed override of the top-level `files` mapping.
    #[serde(default)]
    pub files: FileMap,
}

impl FeedConfig {
    /// Location of the feed's manifest.
    pub fn manifest_url(&self) -> String {
        format!("{}gbfs.json", self.url)
    }

    /// Category label for free vehicles, if the feed publishes them.
    pub fn vehicle_label(&self) -> Option<&str> {
        self.free_vehicles.as_ref().map(|c| c.layer_name.as_str())
    }

    /// Category label for docked stations, if the feed publishes them.
    pub fn station_label(&self) -> Option<&str> {
        self.hubs.as_ref().map(|c| c.layer_name.as_str())
    }
}

/// Where the zone polygons come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneSource {
    pub path: PathBuf,
    /// Feature property holding the zone name.
    #[serde(default = "default_zone_property")]
    pub property: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub feeds: Vec<FeedConfig>,
    #[serde(default = "default_files")]
    pub files: FileMap,
    pub zones: ZoneSource,
    #[serde(default = "default_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Maximum number of feeds aggregated at the same time. Unset means
    /// every feed runs at once.
    #[serde(default)]
    pub concurrency: Option<usize>,
}

impl EngineConfig {
    /// Loads the config from a JSON file at `path`.
    ///
    /// A relative zone path is resolved against the config file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        let mut config = Self::from_json(&content)?;

        if config.zones.path.is_relative() {
            if let Some(dir) = path.parent() {
                config.zones.path = dir.join(&config.zones.path);
            }
        }

        Ok(config)
    }

    /// Parses and validates a config document.
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.normalized()
    }

    /// Per-fetch timeout.
    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Number of feed aggregations allowed to run at once.
    pub fn concurrency(&self) -> usize {
        self.concurrency.unwrap_or(self.feeds.len()).max(1)
    }

    fn normalized(mut self) -> Result<Self> {
        if self.feeds.is_empty() {
            return Err(Error::Config("no feeds configured".to_string()));
        }
        if self.concurrency == Some(0) {
            return Err(Error::Config("concurrency must be at least 1".to_string()));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(Error::Config("fetch_timeout_secs must be at least 1".to_string()));
        }

        for feed in &mut self.feeds {
            if feed.url.trim().is_empty() || feed.name.trim().is_empty() {
                return Err(Error::Config("feed url and name must be set".to_string()));
            }
            if feed.free_vehicles.is_none() && feed.hubs.is_none() {
                return Err(Error::Config(format!(
                    "feed {} publishes neither free_vehicles nor hubs",
                    feed.name
                )));
            }
            if !feed.url.ends_with('/') {
                feed.url.push('/');
            }
            if feed.files.is_empty() {
                feed.files = self.files.clone();
            }
        }

        Ok(self)
    }
}
