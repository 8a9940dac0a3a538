//! Aggregates live GBFS shared-vehicle feeds and counts their vehicles and
//! stations per geographic zone.

pub mod aggregate;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod merge;
pub mod model;
pub mod output;
pub mod parser;
pub mod zones;

pub use engine::{CycleState, Engine, Snapshot};
pub use error::{Error, Result};
