//! In-memory store backed by seed files.
//!
//! Mirrors the query semantics of the database store, including the
//! spatial-index requirement of the nearest-provider query. The index is a
//! flag that starts absent, like a freshly imported collection.

use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{rank_by_distance, IndexStatus, StoreError, StoreResult, TelemetryFilter, TelemetryStore};
use crate::{
    dataset::Dataset,
    domain::{Alert, Asset, GeoPoint, ProviderDistance, ServiceProvider, Site, TelemetryReading, WasteLog},
    rollup::{self, AssetTotal, DailyTotal, ElectricitySummary},
};

#[derive(Debug, Default)]
struct Collections {
    data: Dataset,
    provider_location_index: bool,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_dataset(data: Dataset) -> Self {
        Self {
            inner: RwLock::new(Collections {
                data,
                provider_location_index: false,
            }),
        }
    }

    /// Load every seed file in `dir`.
    pub fn open(dir: &Path) -> StoreResult<Self> {
        let data = Dataset::read_dir(dir)?;
        tracing::info!(
            dir = %dir.display(),
            sites = data.sites.len(),
            assets = data.assets.len(),
            telemetry = data.telemetry.len(),
            "loaded dataset into memory store"
        );
        Ok(Self::from_dataset(data))
    }
}

fn append<T: Clone>(into: &mut Vec<T>, items: &[T]) -> u64 {
    into.extend_from_slice(items);
    items.len() as u64
}

#[async_trait]
impl TelemetryStore for MemoryStore {
    async fn sites(&self) -> StoreResult<Vec<Site>> {
        let mut sites = self.inner.read().await.data.sites.clone();
        sites.sort_by_key(|s| s.site_id);
        Ok(sites)
    }

    async fn assets(&self, site_id: Option<i64>) -> StoreResult<Vec<Asset>> {
        let guard = self.inner.read().await;
        let mut assets: Vec<Asset> = guard
            .data
            .assets
            .iter()
            .filter(|a| site_id.map_or(true, |id| a.site_id == id))
            .cloned()
            .collect();
        assets.sort_by_key(|a| a.asset_id);
        Ok(assets)
    }

    async fn telemetry(&self, filter: &TelemetryFilter) -> StoreResult<Vec<TelemetryReading>> {
        let guard = self.inner.read().await;
        let mut readings: Vec<TelemetryReading> =
            guard.data.telemetry.iter().filter(|r| filter.matches(r)).cloned().collect();
        readings.sort_by(|a, b| a.ts.cmp(&b.ts).then(a.asset_id.cmp(&b.asset_id)));
        if let Some(limit) = filter.limit {
            readings.truncate(limit);
        }
        Ok(readings)
    }

    async fn alerts(&self) -> StoreResult<Vec<Alert>> {
        let mut alerts = self.inner.read().await.data.alerts.clone();
        alerts.sort_by_key(|a| a.alert_id);
        Ok(alerts)
    }

    async fn providers(&self) -> StoreResult<Vec<ServiceProvider>> {
        Ok(self.inner.read().await.data.providers.clone())
    }

    async fn electricity_summary(&self) -> StoreResult<ElectricitySummary> {
        Ok(rollup::summarize(&self.inner.read().await.data.telemetry))
    }

    async fn electricity_by_asset(&self) -> StoreResult<Vec<AssetTotal>> {
        Ok(rollup::asset_totals(&self.inner.read().await.data.telemetry))
    }

    async fn electricity_by_day(&self) -> StoreResult<Vec<DailyTotal>> {
        Ok(rollup::daily_totals(&self.inner.read().await.data.telemetry))
    }

    async fn top_readings(&self, limit: usize) -> StoreResult<Vec<TelemetryReading>> {
        Ok(rollup::peak_readings(&self.inner.read().await.data.telemetry, limit))
    }

    async fn scaled_electricity_total(&self, factor: f64) -> StoreResult<f64> {
        let guard = self.inner.read().await;
        Ok(rollup::electricity(&guard.data.telemetry).map(|r| r.value * factor).sum())
    }

    async fn nearest_providers(&self, origin: GeoPoint, limit: usize) -> StoreResult<Vec<ProviderDistance>> {
        let guard = self.inner.read().await;
        if !guard.provider_location_index {
            return Err(StoreError::missing_provider_index());
        }
        Ok(rank_by_distance(guard.data.providers.iter().cloned(), origin, limit))
    }

    async fn ensure_spatial_index(&self) -> StoreResult<IndexStatus> {
        let mut guard = self.inner.write().await;
        if guard.provider_location_index {
            return Ok(IndexStatus::AlreadyExists);
        }
        guard.provider_location_index = true;
        Ok(IndexStatus::Created)
    }

    async fn insert_sites(&self, sites: &[Site]) -> StoreResult<u64> {
        Ok(append(&mut self.inner.write().await.data.sites, sites))
    }

    async fn insert_assets(&self, assets: &[Asset]) -> StoreResult<u64> {
        Ok(append(&mut self.inner.write().await.data.assets, assets))
    }

    async fn insert_telemetry(&self, readings: &[TelemetryReading]) -> StoreResult<u64> {
        Ok(append(&mut self.inner.write().await.data.telemetry, readings))
    }

    async fn insert_waste_logs(&self, logs: &[WasteLog]) -> StoreResult<u64> {
        Ok(append(&mut self.inner.write().await.data.waste_logs, logs))
    }

    async fn insert_providers(&self, providers: &[ServiceProvider]) -> StoreResult<u64> {
        Ok(append(&mut self.inner.write().await.data.providers, providers))
    }

    async fn insert_alerts(&self, alerts: &[Alert]) -> StoreResult<u64> {
        Ok(append(&mut self.inner.write().await.data.alerts, alerts))
    }

    async fn close(&self) {}
}
