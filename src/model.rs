//! Entities produced by a refresh cycle.

use serde::Serialize;
use serde_json::{Map, Value};

/// Provider-specific fields carried through verbatim for presentation.
pub type Extra = Map<String, Value>;

/// Anything that can be placed in a zone.
pub trait Positioned {
    /// Feed/category label the entity is counted under.
    fn label(&self) -> &str;
    fn lon(&self) -> f64;
    fn lat(&self) -> f64;
}

/// A dockless vehicle from `free_bike_status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Vehicle {
    pub id: String,
    pub label: String,
    pub lat: f64,
    pub lon: f64,
    pub extra: Extra,
}

/// A docking station built from `station_information`, with
/// `station_status` merged in when a matching record arrived.
///
/// `bikes_available`/`docks_available` stay `None` when no status was
/// received, which is distinct from a reported zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Station {
    pub id: String,
    pub label: String,
    pub name: Option<String>,
    pub lat: f64,
    pub lon: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bikes_available: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docks_available: Option<u32>,
    pub static_extra: Extra,
    pub dynamic_extra: Extra,
}

impl Station {
    /// Whether any `station_status` record was merged into this station.
    pub fn has_status(&self) -> bool {
        self.bikes_available.is_some()
            || self.docks_available.is_some()
            || !self.dynamic_extra.is_empty()
    }
}

impl Positioned for Vehicle {
    fn label(&self) -> &str {
        &self.label
    }

    fn lon(&self) -> f64 {
        self.lon
    }

    fn lat(&self) -> f64 {
        self.lat
    }
}

impl Positioned for Station {
    fn label(&self) -> &str {
        &self.label
    }

    fn lon(&self) -> f64 {
        self.lon
    }

    fn lat(&self) -> f64 {
        self.lat
    }
}
