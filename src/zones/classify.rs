use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::Positioned;
use crate::zones::index::ZoneIndex;

/// Bucket for entities no zone contains.
pub const UNZONED: &str = "unzoned";

/// `zone name -> feed/category label -> count`, plus the [`UNZONED`] bucket.
///
/// Only non-zero counts are present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ZoneCount(BTreeMap<String, BTreeMap<String, u64>>);

impl ZoneCount {
    /// Count for one zone and label; zero when absent.
    pub fn get(&self, zone: &str, label: &str) -> u64 {
        self.0
            .get(zone)
            .and_then(|labels| labels.get(label))
            .copied()
            .unwrap_or(0)
    }

    pub fn zone(&self, zone: &str) -> Option<&BTreeMap<String, u64>> {
        self.0.get(zone)
    }

    /// All entities counted for `label`, zoned or not.
    pub fn total_for_label(&self, label: &str) -> u64 {
        self.0.values().filter_map(|labels| labels.get(label)).sum()
    }

    pub fn total(&self) -> u64 {
        self.0.values().flat_map(BTreeMap::values).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, u64>)> {
        self.0.iter().map(|(zone, labels)| (zone.as_str(), labels))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn increment(&mut self, zone: &str, label: &str) {
        *self
            .0
            .entry(zone.to_string())
            .or_default()
            .entry(label.to_string())
            .or_insert(0) += 1;
    }
}

/// Accumulates zone counts one entity at a time.
pub struct ZoneClassifier<'a> {
    zones: &'a ZoneIndex,
    counts: ZoneCount,
}

impl<'a> ZoneClassifier<'a> {
    pub fn new(zones: &'a ZoneIndex) -> Self {
        Self {
            zones,
            counts: ZoneCount::default(),
        }
    }

    /// Counts the entity in the first zone containing it, or in [`UNZONED`].
    /// Returns the zone name it was counted under.
    pub fn record<E: Positioned + ?Sized>(&mut self, entity: &E) -> &'a str {
        let zone = self
            .zones
            .locate(entity.lon(), entity.lat())
            .map_or(UNZONED, |zone| zone.name.as_str());
        self.counts.increment(zone, entity.label());
        zone
    }

    pub fn finish(self) -> ZoneCount {
        self.counts
    }
}

/// Counts every entity against `zones`.
pub fn classify<'e, E, I>(entities: I, zones: &ZoneIndex) -> ZoneCount
where
    E: Positioned + 'e,
    I: IntoIterator<Item = &'e E>,
{
    let mut classifier = ZoneClassifier::new(zones);
    for entity in entities {
        classifier.record(entity);
    }
    classifier.finish()
}
