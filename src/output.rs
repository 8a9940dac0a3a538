//! Snapshot rendering for whatever presents it.
//!
//! Supports pretty-printing, JSON serialization, and a logged zone table.

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::engine::Snapshot;
use crate::zones::ZoneCount;

/// Logs the snapshot using Rust's debug pretty-print format.
pub fn print_pretty(snapshot: &Snapshot) {
    debug!("{:#?}", snapshot);
}

/// Serializes the snapshot as pretty-printed JSON.
pub fn to_json(snapshot: &Snapshot) -> Result<String> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

/// Logs the snapshot as pretty-printed JSON.
pub fn print_json(snapshot: &Snapshot) -> Result<()> {
    info!("{}", to_json(snapshot)?);
    Ok(())
}

/// One row per zone and label, sorted by zone then label.
pub fn zone_rows(counts: &ZoneCount) -> Vec<(String, String, u64)> {
    counts
        .iter()
        .flat_map(|(zone, labels)| {
            labels
                .iter()
                .map(move |(label, count)| (zone.to_string(), label.clone(), *count))
        })
        .collect()
}

/// Logs the zone table and any feed failures of the cycle.
pub fn log_summary(snapshot: &Snapshot) {
    for (zone, label, count) in zone_rows(&snapshot.zone_counts) {
        info!(zone = %zone, label = %label, count, "Zone count");
    }

    for report in &snapshot.reports {
        for error in &report.errors {
            warn!(feed = %report.feed, code = error.code(), error = %error, "Feed degraded");
        }
    }

    info!(
        cycle = snapshot.cycle,
        vehicles = snapshot.vehicles.len(),
        stations = snapshot.stations.len(),
        zoned = snapshot.zone_counts.total(),
        "Snapshot summary"
    );
}
