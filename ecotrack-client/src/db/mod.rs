//! The store boundary.
//!
//! Analytics consume four query shapes from a store: a filtered full scan,
//! grouped/summed aggregations, a top-N sort and a spatial nearest-neighbour
//! query. The only schema write is spatial index creation; bulk inserts exist
//! for loading seed files.

pub mod aggregation_queries;
mod error;
mod memory;
mod postgres;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use postgres::PgStore;

use std::fmt;

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::{
    domain::{Alert, Asset, GeoPoint, ProviderDistance, ServiceProvider, Site, TelemetryReading, WasteLog},
    rollup::{AssetTotal, DailyTotal, ElectricitySummary},
};

pub const PROVIDERS_COLLECTION: &str = "service_providers";
pub const PROVIDER_LOCATION_FIELD: &str = "location";

/// Restricts a telemetry scan.
///
/// `asset_ids: Some(vec![])` matches nothing; `None` matches every asset.
/// `start` is inclusive and `end` exclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetryFilter {
    pub asset_ids: Option<Vec<i64>>,
    pub start: Option<OffsetDateTime>,
    pub end: Option<OffsetDateTime>,
    pub limit: Option<usize>,
}

impl TelemetryFilter {
    pub fn matches(&self, r: &TelemetryReading) -> bool {
        if let Some(ids) = &self.asset_ids {
            if !ids.contains(&r.asset_id) {
                return false;
            }
        }
        if self.start.is_some_and(|start| r.ts < start) {
            return false;
        }
        if self.end.is_some_and(|end| r.ts >= end) {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexStatus {
    AlreadyExists,
    Created,
}

impl fmt::Display for IndexStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexStatus::AlreadyExists => {
                write!(f, "spatial index on {PROVIDERS_COLLECTION}.{PROVIDER_LOCATION_FIELD} already exists")
            }
            IndexStatus::Created => {
                write!(f, "spatial index on {PROVIDERS_COLLECTION}.{PROVIDER_LOCATION_FIELD} created")
            }
        }
    }
}

#[async_trait]
pub trait TelemetryStore: Send + Sync {
    async fn sites(&self) -> StoreResult<Vec<Site>>;

    /// Assets, optionally restricted to one site.
    async fn assets(&self, site_id: Option<i64>) -> StoreResult<Vec<Asset>>;

    /// Filtered full scan, ordered by timestamp then asset.
    async fn telemetry(&self, filter: &TelemetryFilter) -> StoreResult<Vec<TelemetryReading>>;

    async fn alerts(&self) -> StoreResult<Vec<Alert>>;

    async fn providers(&self) -> StoreResult<Vec<ServiceProvider>>;

    /// Sum, mean and count of every electricity reading.
    async fn electricity_summary(&self) -> StoreResult<ElectricitySummary>;

    /// Electricity grouped by asset, largest first.
    async fn electricity_by_asset(&self) -> StoreResult<Vec<AssetTotal>>;

    /// Electricity grouped by calendar day, ordered by date.
    async fn electricity_by_day(&self) -> StoreResult<Vec<DailyTotal>>;

    /// The `limit` largest electricity readings.
    async fn top_readings(&self, limit: usize) -> StoreResult<Vec<TelemetryReading>>;

    /// Sum of every electricity value multiplied by `factor`.
    async fn scaled_electricity_total(&self, factor: f64) -> StoreResult<f64>;

    /// Providers ordered by distance from `origin`.
    ///
    /// Fails with [`StoreError::MissingSpatialIndex`] when the provider
    /// location index has not been created.
    async fn nearest_providers(&self, origin: GeoPoint, limit: usize) -> StoreResult<Vec<ProviderDistance>>;

    async fn ensure_spatial_index(&self) -> StoreResult<IndexStatus>;

    async fn insert_sites(&self, sites: &[Site]) -> StoreResult<u64>;
    async fn insert_assets(&self, assets: &[Asset]) -> StoreResult<u64>;
    async fn insert_telemetry(&self, readings: &[TelemetryReading]) -> StoreResult<u64>;
    async fn insert_waste_logs(&self, logs: &[WasteLog]) -> StoreResult<u64>;
    async fn insert_providers(&self, providers: &[ServiceProvider]) -> StoreResult<u64>;
    async fn insert_alerts(&self, alerts: &[Alert]) -> StoreResult<u64>;

    /// Release the connection. The store must not be used afterwards.
    async fn close(&self);
}

/// Sort providers by great-circle distance from `origin`, skipping those
/// without a usable location.
pub(crate) fn rank_by_distance(
    providers: impl IntoIterator<Item = ServiceProvider>,
    origin: GeoPoint,
    limit: usize,
) -> Vec<ProviderDistance> {
    let mut ranked: Vec<ProviderDistance> = providers
        .into_iter()
        .filter_map(|provider| {
            let location = provider.location.filter(GeoPoint::is_valid)?;
            Some(ProviderDistance {
                distance_m: origin.distance_m(&location),
                provider,
            })
        })
        .collect();
    ranked.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
    ranked.truncate(limit);
    ranked
}
