use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use gbfs_zones::config::EngineConfig;
use gbfs_zones::fetch::HttpClient;
use gbfs_zones::zones::{UNZONED, ZoneIndex};
use gbfs_zones::{CycleState, Engine};
use reqwest::{Request, Response};

const CONFIG_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/feeds.json");
const ZONES: &str = include_str!("fixtures/zones.geojson");

/// Serves the fixture documents by URL; anything else is a 404.
struct FixtureServer {
    routes: HashMap<&'static str, (u16, &'static str)>,
    requested: Mutex<Vec<String>>,
}

impl FixtureServer {
    fn providence() -> Self {
        let routes = HashMap::from([
            (
                "https://jump.example/opendata/gbfs.json",
                (200, include_str!("fixtures/jump/gbfs.json")),
            ),
            (
                "https://jump.example/opendata/free_bike_status.json",
                (200, include_str!("fixtures/jump/free_bike_status.json")),
            ),
            (
                "https://bird.example/gbfs/providence/gbfs.json?token=abc",
                (503, ""),
            ),
            (
                "https://docks.example/gbfs/gbfs.json",
                (200, include_str!("fixtures/docks/gbfs.json")),
            ),
            (
                "https://docks.example/gbfs/station_information.json",
                (200, include_str!("fixtures/docks/station_information.json")),
            ),
            (
                "https://docks.example/gbfs/station_status.json",
                (200, include_str!("fixtures/docks/station_status.json")),
            ),
        ]);

        Self {
            routes,
            requested: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl HttpClient for FixtureServer {
    async fn execute(&self, req: Request) -> reqwest::Result<Response> {
        let url = req.url().to_string();
        self.requested.lock().unwrap().push(url.clone());

        let (status, body) = self.routes.get(url.as_str()).copied().unwrap_or((404, ""));
        Ok(http::Response::builder()
            .status(status)
            .body(body)
            .unwrap()
            .into())
    }
}

fn engine() -> Engine<FixtureServer> {
    let config = EngineConfig::load(CONFIG_PATH).expect("Failed to load config");
    let zones = ZoneIndex::from_geojson_str(ZONES, &config.zones.property)
        .expect("Failed to parse zones");
    Engine::new(config, zones, FixtureServer::providence())
}

#[test]
fn test_config_and_zones_load_from_disk() {
    let config = EngineConfig::load(CONFIG_PATH).expect("Failed to load config");

    assert_eq!(config.feeds.len(), 3);
    assert_eq!(config.feeds[0].url, "https://jump.example/opendata/");
    assert_eq!(config.feeds[0].files.len(), 4);
    assert!(config.zones.path.ends_with("tests/fixtures/zones.geojson"));

    // The feature with no rings is left out.
    let zones = ZoneIndex::load(&config.zones).expect("Failed to load zones");
    assert_eq!(zones.len(), 2);
}

#[tokio::test]
async fn test_full_pipeline() {
    let engine = engine();

    let snapshot = engine.refresh().await.expect("Refresh failed");

    assert_eq!(engine.state(), CycleState::Ready);
    assert_eq!(snapshot.cycle, 1);
    assert_eq!(snapshot.vehicles.len(), 3);
    assert_eq!(snapshot.stations.len(), 3);

    let counts = &snapshot.zone_counts;
    // Vehicles: one in A, one in A's hole, one in B.
    assert_eq!(counts.get("A", "JUMP"), 1);
    assert_eq!(counts.get("B", "JUMP"), 1);
    assert_eq!(counts.get(UNZONED, "JUMP"), 1);
    // Stations: one inside A, one on A's outer edge, one on the hole's edge.
    assert_eq!(counts.get("A", "Docks"), 2);
    assert_eq!(counts.get(UNZONED, "Docks"), 1);

    let entities = (snapshot.vehicles.len() + snapshot.stations.len()) as u64;
    assert_eq!(counts.total(), entities);
}

#[tokio::test]
async fn test_failed_feed_is_reported_not_fatal() {
    let engine = engine();

    let snapshot = engine.refresh().await.expect("Refresh failed");

    let bird = snapshot
        .reports
        .iter()
        .find(|r| r.feed == "Bird")
        .expect("Bird report missing");
    assert_eq!(bird.vehicles, 0);
    assert_eq!(bird.errors.len(), 1);
    assert_eq!(bird.errors[0].code(), "manifest_unavailable");

    assert_eq!(snapshot.zone_counts.total_for_label("Bird"), 0);
    assert_eq!(snapshot.zone_counts.total_for_label("JUMP"), 3);

    let requested = engine.client().requested.lock().unwrap();
    assert!(
        requested
            .iter()
            .any(|url| url == "https://bird.example/gbfs/providence/gbfs.json?token=abc")
    );
}

#[tokio::test]
async fn test_station_status_merge() {
    let engine = engine();

    let snapshot = engine.refresh().await.expect("Refresh failed");
    let stations = &snapshot.stations;

    assert_eq!(
        stations.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
        vec!["1", "2", "3"]
    );

    assert_eq!(stations[0].name.as_deref(), Some("Kennedy Plaza"));
    assert_eq!(stations[0].bikes_available, Some(6));
    assert_eq!(stations[0].docks_available, Some(9));
    assert_eq!(stations[1].bikes_available, Some(0));

    // No status record: counts stay absent rather than zero.
    assert_eq!(stations[2].bikes_available, None);
    assert_eq!(stations[2].docks_available, None);

    // The orphan status "99" never becomes a station.
    assert!(stations.iter().all(|s| s.id != "99"));
}

#[tokio::test]
async fn test_refresh_twice_gives_same_counts() {
    let engine = engine();

    let first = engine.refresh().await.expect("Refresh failed");
    let second = engine.refresh().await.expect("Refresh failed");

    assert_eq!(second.cycle, 2);
    assert_eq!(first.zone_counts, second.zone_counts);
}
