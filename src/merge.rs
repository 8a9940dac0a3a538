//! Turns raw GBFS records into [`Vehicle`]s and [`Station`]s.
//!
//! Known keys are routed to named fields by an explicit allow-list; every
//! other key is kept unmodified in the entity's extra map.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, trace};

use crate::model::{Extra, Station, Vehicle};
use crate::parser::Record;

/// One `free_bike_status` record becomes one vehicle.
///
/// Records without a usable `bike_id`, `lat` or `lon` are dropped.
pub fn merge_vehicles(label: &str, records: Vec<Record>) -> Vec<Vehicle> {
    let total = records.len();
    let vehicles: Vec<Vehicle> = records
        .into_iter()
        .filter_map(|record| vehicle_from_record(label, record))
        .collect();

    if vehicles.len() < total {
        debug!(label, dropped = total - vehicles.len(), "Dropped unlocatable vehicle records");
    }
    vehicles
}

/// Builds stations from `station_information` and merges `station_status`
/// into them by `station_id`.
///
/// The info records define the station set: a status record for an unknown
/// id is dropped. Output keeps the order stations were first listed in.
pub fn merge_stations(label: &str, info: Vec<Record>, status: Vec<Record>) -> Vec<Station> {
    let mut stations: Vec<Station> = Vec::with_capacity(info.len());
    let mut by_id: HashMap<String, usize> = HashMap::with_capacity(info.len());

    for record in info {
        let Some(station) = station_from_info(label, record) else {
            continue;
        };
        match by_id.get(&station.id) {
            Some(&idx) => stations[idx] = station,
            None => {
                by_id.insert(station.id.clone(), stations.len());
                stations.push(station);
            }
        }
    }

    for record in status {
        let Some(id) = record.get("station_id").and_then(as_id) else {
            trace!(label, "Status record without station_id dropped");
            continue;
        };
        match by_id.get(&id) {
            Some(&idx) => apply_status(&mut stations[idx], record),
            None => trace!(label, station_id = %id, "Orphan status record dropped"),
        }
    }

    stations
}

fn vehicle_from_record(label: &str, record: Record) -> Option<Vehicle> {
    let mut id = None;
    let mut lat = None;
    let mut lon = None;
    let mut extra = Extra::new();

    for (key, value) in record {
        match key.as_str() {
            "bike_id" => id = as_id(&value),
            "lat" => lat = as_coord(&value),
            "lon" => lon = as_coord(&value),
            _ => {
                extra.insert(key, value);
            }
        }
    }

    Some(Vehicle {
        id: id?,
        label: label.to_string(),
        lat: lat?,
        lon: lon?,
        extra,
    })
}

fn station_from_info(label: &str, record: Record) -> Option<Station> {
    let mut id = None;
    let mut name = None;
    let mut lat = None;
    let mut lon = None;
    let mut static_extra = Extra::new();

    for (key, value) in record {
        match key.as_str() {
            "station_id" => id = as_id(&value),
            "lat" => lat = as_coord(&value),
            "lon" => lon = as_coord(&value),
            "name" => match value {
                Value::String(s) => name = Some(s),
                other => {
                    static_extra.insert(key, other);
                }
            },
            _ => {
                static_extra.insert(key, value);
            }
        }
    }

    let (Some(id), Some(lat), Some(lon)) = (id, lat, lon) else {
        debug!(label, "Dropped unlocatable station_information record");
        return None;
    };

    Some(Station {
        id,
        label: label.to_string(),
        name,
        lat,
        lon,
        bikes_available: None,
        docks_available: None,
        static_extra,
        dynamic_extra: Extra::new(),
    })
}

fn apply_status(station: &mut Station, record: Record) {
    for (key, value) in record {
        match key.as_str() {
            "station_id" => {}
            "num_bikes_available" => match as_count(&value) {
                Some(n) => station.bikes_available = Some(n),
                None => {
                    station.dynamic_extra.insert(key, value);
                }
            },
            "num_docks_available" => match as_count(&value) {
                Some(n) => station.docks_available = Some(n),
                None => {
                    station.dynamic_extra.insert(key, value);
                }
            },
            _ => {
                station.dynamic_extra.insert(key, value);
            }
        }
    }
}

/// Ids are published as strings by most providers and as numbers by some.
fn as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_coord(value: &Value) -> Option<f64> {
    let coord = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }?;
    coord.is_finite().then_some(coord)
}

/// Counts may arrive as integers, integral floats (`3.0`) or numeric strings.
fn as_count(value: &Value) -> Option<u32> {
    let count = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    if !count.is_finite() || count < 0.0 || count.fract() != 0.0 || count > f64::from(u32::MAX) {
        return None;
    }
    Some(count as u32)
}
