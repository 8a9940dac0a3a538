//! Discovery, fetch and merge for a single feed.
//!
//! The failure unit is the sub-feed: a missing or broken document empties
//! only its own category, and a broken manifest empties the whole feed.

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::config::{FREE_STATUS, FeedConfig, STATION_INFO, STATION_STATUS};
use crate::discovery::discover;
use crate::error::Error;
use crate::fetch::{HttpClient, QueryParams, fetch_document};
use crate::merge::{merge_stations, merge_vehicles};
use crate::model::{Station, Vehicle};
use crate::parser::{FreeBikeStatus, Record, RecordList, StationDocument};

/// Everything one feed contributed to a cycle.
#[derive(Debug, Clone, Default)]
pub struct FeedData {
    pub feed: String,
    pub vehicles: Vec<Vehicle>,
    pub stations: Vec<Station>,
    /// Failures that emptied part or all of this feed.
    pub errors: Vec<Error>,
}

impl FeedData {
    pub fn failed(feed: &str, error: Error) -> Self {
        Self {
            feed: feed.to_string(),
            errors: vec![error],
            ..Default::default()
        }
    }
}

/// Runs discovery, fetches the feed's sub-feeds concurrently and merges them.
///
/// Never fails: every error degrades to an empty collection and is recorded
/// in [`FeedData::errors`].
pub async fn aggregate<C: HttpClient>(
    client: &C,
    feed: &FeedConfig,
    timeout: Duration,
) -> FeedData {
    let client = QueryParams::new(client, &feed.url_params);

    let urls = match discover(&client, feed, timeout).await {
        Ok(urls) => urls,
        Err(e) => {
            warn!(feed = %feed.name, error = %e, "Feed discovery failed");
            return FeedData::failed(&feed.name, e);
        }
    };

    let vehicle_url = feed.free_vehicles.as_ref().and(urls.get(FREE_STATUS));
    let info_url = feed.hubs.as_ref().and(urls.get(STATION_INFO));
    let status_url = feed.hubs.as_ref().and(urls.get(STATION_STATUS));

    let (bikes, info, status) = tokio::join!(
        fetch_records::<_, FreeBikeStatus>(&client, FREE_STATUS, vehicle_url, timeout),
        fetch_records::<_, StationDocument>(&client, STATION_INFO, info_url, timeout),
        fetch_records::<_, StationDocument>(&client, STATION_STATUS, status_url, timeout),
    );

    let mut errors = Vec::new();
    let mut settle = |fetched: Result<Vec<Record>, Error>| {
        fetched.unwrap_or_else(|e| {
            warn!(feed = %feed.name, error = %e, "Sub-feed unavailable");
            errors.push(e);
            Vec::new()
        })
    };
    let bikes = settle(bikes);
    let info = settle(info);
    let status = settle(status);

    let vehicles = feed
        .vehicle_label()
        .map(|label| merge_vehicles(label, bikes))
        .unwrap_or_default();
    let stations = feed
        .station_label()
        .map(|label| merge_stations(label, info, status))
        .unwrap_or_default();

    info!(
        feed = %feed.name,
        vehicles = vehicles.len(),
        stations = stations.len(),
        failed_sub_feeds = errors.len(),
        "Feed aggregated"
    );

    FeedData {
        feed: feed.name.clone(),
        vehicles,
        stations,
        errors,
    }
}

/// Fetches one sub-feed's records.
///
/// A document the feed does not publish (or whose category is disabled) is
/// an empty list; only a failed fetch or decode is an error.
async fn fetch_records<C, D>(
    client: &C,
    logical: &str,
    url: Option<&str>,
    timeout: Duration,
) -> Result<Vec<Record>, Error>
where
    C: HttpClient,
    D: DeserializeOwned + RecordList,
{
    let Some(url) = url else {
        debug!(sub_feed = logical, "Sub-feed not published, skipping");
        return Ok(Vec::new());
    };

    let document: D = fetch_document(client, url, timeout)
        .await
        .map_err(|e| Error::SubFeedUnavailable(format!("{logical}: {}", Error::describe(&e))))?;
    Ok(document.into_records())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::config::{CategoryConfig, default_files};
    use crate::fetch::testing::FixtureClient;

    const BASE: &str = "https://pvd.example/";

    #[tokio::test]
    async fn test_vehicles_and_stations_merged() {
        let client = full_feed();

        let data = aggregate(&client, &feed(true, true), timeout()).await;

        assert!(data.errors.is_empty());
        assert_eq!(data.vehicles.len(), 3);
        assert_eq!(data.vehicles[0].label, "JUMP");
        assert_eq!(data.stations.len(), 2);
        assert_eq!(data.stations[0].label, "JUMP Stations");
        assert_eq!(data.stations[0].bikes_available, Some(3));
        assert_eq!(data.stations[1].bikes_available, None);
    }

    #[tokio::test]
    async fn test_manifest_failure_empties_feed() {
        let client = FixtureClient::new().with_status(&format!("{BASE}gbfs.json"), 500);

        let data = aggregate(&client, &feed(true, true), timeout()).await;

        assert!(data.vehicles.is_empty());
        assert!(data.stations.is_empty());
        assert_eq!(data.errors.len(), 1);
        assert_eq!(data.errors[0].code(), "manifest_unavailable");
    }

    #[tokio::test]
    async fn test_malformed_sub_feed_does_not_block_siblings() {
        let client = full_feed().with_body(&format!("{BASE}free_bike_status.json"), "{not json");

        let data = aggregate(&client, &feed(true, true), timeout()).await;

        assert!(data.vehicles.is_empty());
        assert_eq!(data.stations.len(), 2);
        assert_eq!(data.stations[0].bikes_available, Some(3));
        assert_eq!(data.errors.len(), 1);
        assert_eq!(data.errors[0].code(), "sub_feed_unavailable");
    }

    #[tokio::test]
    async fn test_failed_status_keeps_stations_without_counts() {
        let client = full_feed().with_status(&format!("{BASE}station_status.json"), 404);

        let data = aggregate(&client, &feed(true, true), timeout()).await;

        assert_eq!(data.stations.len(), 2);
        assert!(data.stations.iter().all(|s| s.bikes_available.is_none()));
        assert_eq!(data.vehicles.len(), 3);
    }

    #[tokio::test]
    async fn test_stalled_sub_feed_times_out() {
        let client = full_feed().with_stall(&format!("{BASE}station_information.json"));

        let data = aggregate(&client, &feed(true, true), Duration::from_millis(100)).await;

        assert_eq!(data.vehicles.len(), 3);
        assert!(data.stations.is_empty());
        assert_eq!(data.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_unpublished_document_is_not_an_error() {
        let manifest = r#"{"data":{"en":{"feeds":[
            {"name":"free_bike_status","url":"https://pvd.example/free_bike_status.json"}
        ]}}}"#;
        let client = FixtureClient::new()
            .with_body(&format!("{BASE}gbfs.json"), manifest)
            .with_body(&format!("{BASE}free_bike_status.json"), BIKES);

        let data = aggregate(&client, &feed(true, true), timeout()).await;

        assert!(data.errors.is_empty());
        assert_eq!(data.vehicles.len(), 3);
        assert!(data.stations.is_empty());
    }

    #[tokio::test]
    async fn test_disabled_category_not_fetched() {
        let client = full_feed();

        let data = aggregate(&client, &feed(true, false), timeout()).await;

        assert!(data.stations.is_empty());
        let requested = client.requested();
        assert!(!requested.iter().any(|url| url.contains("station_")));
        assert_eq!(requested.len(), 2);
    }

    #[tokio::test]
    async fn test_url_params_applied_to_every_request() {
        let manifest = r#"{"data":{"en":{"feeds":[
            {"name":"free_bike_status","url":"https://pvd.example/free_bike_status.json"}
        ]}}}"#;
        let client = FixtureClient::new()
            .with_body(&format!("{BASE}gbfs.json?key=abc"), manifest)
            .with_body(&format!("{BASE}free_bike_status.json?key=abc"), BIKES);
        let mut config = feed(true, false);
        config.url_params = BTreeMap::from([("key".to_string(), "abc".to_string())]);

        let data = aggregate(&client, &config, timeout()).await;

        assert_eq!(data.vehicles.len(), 3);
        assert!(data.errors.is_empty());
    }

    const MANIFEST: &str = r#"{"data":{"en":{"feeds":[
        {"name":"free_bike_status","url":"https://pvd.example/free_bike_status.json"},
        {"name":"station_information","url":"https://pvd.example/station_information.json"},
        {"name":"station_status","url":"https://pvd.example/station_status.json"}
    ]}}}"#;

    const BIKES: &str = r#"{"data":{"bikes":[
        {"bike_id":"b1","lat":41.82,"lon":-71.41},
        {"bike_id":"b2","lat":41.83,"lon":-71.40,"is_disabled":0},
        {"bike_id":"b3","lat":41.84,"lon":-71.39}
    ]}}"#;

    const INFO: &str = r#"{"data":{"stations":[
        {"station_id":"s1","name":"Kennedy Plaza","lat":41.824,"lon":-71.412},
        {"station_id":"s2","name":"Thayer St","lat":41.829,"lon":-71.401}
    ]}}"#;

    const STATUS: &str = r#"{"data":{"stations":[
        {"station_id":"s1","num_bikes_available":3,"num_docks_available":9},
        {"station_id":"s9","num_bikes_available":1,"num_docks_available":1}
    ]}}"#;

    fn full_feed() -> FixtureClient {
        FixtureClient::new()
            .with_body(&format!("{BASE}gbfs.json"), MANIFEST)
            .with_body(&format!("{BASE}free_bike_status.json"), BIKES)
            .with_body(&format!("{BASE}station_information.json"), INFO)
            .with_body(&format!("{BASE}station_status.json"), STATUS)
    }

    fn feed(vehicles: bool, hubs: bool) -> FeedConfig {
        let category = |name: &str| CategoryConfig {
            layer_name: name.to_string(),
            display: serde_json::Value::Null,
        };
        FeedConfig {
            url: BASE.to_string(),
            name: "JUMP".to_string(),
            url_params: BTreeMap::new(),
            free_vehicles: vehicles.then(|| category("JUMP")),
            hubs: hubs.then(|| category("JUMP Stations")),
            files: default_files(),
        }
    }

    fn timeout() -> Duration {
        Duration::from_secs(5)
    }
}
