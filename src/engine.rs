//! Refresh-cycle orchestration and the published snapshot.
//!
//! A cycle moves `Idle -> Fetching -> Merging -> Classifying -> Ready`.
//! Every feed is aggregated concurrently; the new snapshot is built only once
//! all of them have settled and then replaces the old one in a single swap,
//! so readers always see one complete cycle.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{Instrument, error, info, warn};

use crate::aggregate::{FeedData, aggregate};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::fetch::HttpClient;
use crate::model::{Station, Vehicle};
use crate::zones::{ZoneClassifier, ZoneCount, ZoneIndex};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    #[default]
    Idle,
    Fetching,
    Merging,
    Classifying,
    Ready,
}

/// Outcome of one feed in a cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedReport {
    pub feed: String,
    pub vehicles: usize,
    pub stations: usize,
    pub errors: Vec<Error>,
}

impl FeedReport {
    fn from_data(data: &FeedData) -> Self {
        Self {
            feed: data.feed.clone(),
            vehicles: data.vehicles.len(),
            stations: data.stations.len(),
            errors: data.errors.clone(),
        }
    }
}

/// One complete refresh cycle's output.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    /// 0 until the first cycle completes.
    pub cycle: u64,
    pub refreshed_at: Option<DateTime<Utc>>,
    pub vehicles: Vec<Vehicle>,
    pub stations: Vec<Station>,
    pub zone_counts: ZoneCount,
    pub reports: Vec<FeedReport>,
}

/// Owns the feed configuration, the zone set and the current snapshot.
pub struct Engine<C> {
    client: Arc<C>,
    config: EngineConfig,
    zones: ZoneIndex,
    snapshot: RwLock<Arc<Snapshot>>,
    state: Mutex<CycleState>,
    // Held for the whole cycle; the value is the number of the last cycle.
    cycle: tokio::sync::Mutex<u64>,
}

impl<C: HttpClient + 'static> Engine<C> {
    pub fn new(config: EngineConfig, zones: ZoneIndex, client: C) -> Self {
        Self {
            client: Arc::new(client),
            config,
            zones,
            snapshot: RwLock::new(Arc::new(Snapshot::default())),
            state: Mutex::new(CycleState::Idle),
            cycle: tokio::sync::Mutex::new(0),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn zones(&self) -> &ZoneIndex {
        &self.zones
    }

    /// The last published snapshot (empty before the first cycle).
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn state(&self) -> CycleState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs one refresh cycle and publishes its snapshot.
    ///
    /// Feed failures never surface here; they show up as empty feeds and in
    /// the snapshot's reports.
    ///
    /// # Errors
    ///
    /// [`Error::RefreshInProgress`] if another cycle is running on this engine.
    #[tracing::instrument(skip(self), fields(feeds = self.config.feeds.len()))]
    pub async fn refresh(&self) -> Result<Arc<Snapshot>> {
        let Ok(mut cycle) = self.cycle.try_lock() else {
            warn!("Refresh requested while a cycle is running, rejected");
            return Err(Error::RefreshInProgress);
        };
        *cycle += 1;

        self.set_state(CycleState::Fetching);
        let results = self.fetch_all().await;

        self.set_state(CycleState::Merging);
        let mut vehicles = Vec::new();
        let mut stations = Vec::new();
        let mut reports = Vec::with_capacity(results.len());
        for data in results {
            reports.push(FeedReport::from_data(&data));
            vehicles.extend(data.vehicles);
            stations.extend(data.stations);
        }

        self.set_state(CycleState::Classifying);
        let mut classifier = ZoneClassifier::new(&self.zones);
        for vehicle in &vehicles {
            classifier.record(vehicle);
        }
        for station in &stations {
            classifier.record(station);
        }
        let zone_counts = classifier.finish();

        let snapshot = Arc::new(Snapshot {
            cycle: *cycle,
            refreshed_at: Some(Utc::now()),
            vehicles,
            stations,
            zone_counts,
            reports,
        });
        *self.snapshot.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&snapshot);
        self.set_state(CycleState::Ready);

        info!(
            cycle = snapshot.cycle,
            vehicles = snapshot.vehicles.len(),
            stations = snapshot.stations.len(),
            failed_feeds = snapshot.reports.iter().filter(|r| !r.errors.is_empty()).count(),
            "Snapshot published"
        );
        Ok(snapshot)
    }

    /// Aggregates every feed concurrently, bounded by `concurrency`, and waits
    /// for all of them. Results come back in configuration order.
    async fn fetch_all(&self) -> Vec<FeedData> {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency()));
        let timeout = self.config.fetch_timeout();

        let mut tasks = Vec::with_capacity(self.config.feeds.len());
        for feed in &self.config.feeds {
            let sem = Arc::clone(&semaphore);
            let client = Arc::clone(&self.client);
            let name = feed.name.clone();
            let feed = feed.clone();
            let feed_span = tracing::info_span!("aggregate_feed", feed = %feed.name);

            let task = tokio::spawn(
                async move {
                    let _permit = sem.acquire().await.ok();
                    aggregate(client.as_ref(), &feed, timeout).await
                }
                .instrument(feed_span),
            );
            tasks.push((name, task));
        }

        let mut results = Vec::with_capacity(tasks.len());
        for (name, task) in tasks {
            match task.await {
                Ok(data) => results.push(data),
                Err(e) => {
                    error!(feed = %name, error = %e, "Feed aggregation task failed");
                    results.push(FeedData::failed(
                        &name,
                        Error::FeedFailed(format!("aggregation task failed: {e}")),
                    ));
                }
            }
        }
        results
    }

    fn set_state(&self, state: CycleState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }
}
