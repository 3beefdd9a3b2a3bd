//! Client-side model of the EcoTrack telemetry store: domain records, the
//! store boundary with PostgreSQL and in-memory implementations, seed-file
//! codecs and electricity rollups.

pub mod dataset;
pub mod db;
pub mod domain;
pub mod rollup;
pub mod timefmt;

pub use db::{MemoryStore, PgStore, StoreError, TelemetryFilter, TelemetryStore};
