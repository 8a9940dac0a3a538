//! JSON decoding of the GBFS documents this crate consumes.
//!
//! Every GBFS document wraps its payload in a `data` envelope. Entity records
//! are kept as raw JSON objects here; routing their fields into typed
//! entities happens in [`crate::merge`].

use anyhow::Result;
use serde::Deserialize;
use serde::de::DeserializeOwned;

/// One published entity record, exactly as the provider sent it.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Decodes a JSON document from raw bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not valid JSON for `T`.
pub fn parse_document<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}

#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// `gbfs.json`: the list of documents a system publishes.
pub type Manifest = Envelope<ManifestData>;

#[derive(Debug, Deserialize)]
pub struct ManifestData {
    pub en: FeedList,
}

#[derive(Debug, Deserialize)]
pub struct FeedList {
    pub feeds: Vec<FeedEntry>,
}

/// A single `{name, url}` entry of the manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedEntry {
    pub name: String,
    pub url: String,
}

/// `free_bike_status.json`.
pub type FreeBikeStatus = Envelope<BikeList>;

#[derive(Debug, Deserialize)]
pub struct BikeList {
    pub bikes: Vec<Record>,
}

/// `station_information.json` and `station_status.json` share this shape.
pub type StationDocument = Envelope<StationList>;

#[derive(Debug, Deserialize)]
pub struct StationList {
    pub stations: Vec<Record>,
}

/// Documents that carry a list of entity records.
pub trait RecordList {
    fn into_records(self) -> Vec<Record>;
}

impl RecordList for FreeBikeStatus {
    fn into_records(self) -> Vec<Record> {
        self.data.bikes
    }
}

impl RecordList for StationDocument {
    fn into_records(self) -> Vec<Record> {
        self.data.stations
    }
}
