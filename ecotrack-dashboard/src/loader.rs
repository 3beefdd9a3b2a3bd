//! Seed-file loading into a store.

use std::{path::Path, sync::Arc};

use anyhow::Context;
use ecotrack_client::{
    dataset::{self, ALERTS_FILE, ASSETS_FILE, PROVIDERS_FILE, SITES_FILE, TELEMETRY_FILE, WASTE_FILE},
    domain::TelemetryReading,
    TelemetryStore,
};
use serde::Serialize;

use crate::{
    pipeline::{LoadStats, Pipeline},
    sinks::StoreSink,
    sources::TelemetryCsvFileSource,
    transform::TelemetryValidation,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub sites: u64,
    pub assets: u64,
    pub providers: u64,
    pub alerts: u64,
    pub waste_logs: u64,
    pub telemetry_written: u64,
    pub telemetry_rejected: u64,
}

/// Load every seed file in `dir`. Reference collections go first so
/// telemetry rows can point at existing assets.
pub async fn load_dir(store: Arc<dyn TelemetryStore>, dir: &Path, batch_size: usize) -> anyhow::Result<LoadSummary> {
    let mut summary = LoadSummary::default();

    let sites = dataset::read_json(&dir.join(SITES_FILE))?;
    summary.sites = store.insert_sites(&sites).await.context("inserting sites")?;

    let assets = dataset::read_json(&dir.join(ASSETS_FILE))?;
    summary.assets = store.insert_assets(&assets).await.context("inserting assets")?;

    let providers = dataset::read_json(&dir.join(PROVIDERS_FILE))?;
    summary.providers = store
        .insert_providers(&providers)
        .await
        .context("inserting service providers")?;

    let alerts = dataset::read_json(&dir.join(ALERTS_FILE))?;
    summary.alerts = store.insert_alerts(&alerts).await.context("inserting alerts")?;

    let waste = dataset::read_waste_csv(&dir.join(WASTE_FILE))?;
    summary.waste_logs = store.insert_waste_logs(&waste).await.context("inserting waste logs")?;

    tracing::info!(
        sites = summary.sites,
        assets = summary.assets,
        providers = summary.providers,
        alerts = summary.alerts,
        waste_logs = summary.waste_logs,
        "reference collections loaded"
    );

    let pipeline: Pipeline<_, TelemetryReading, _> = Pipeline {
        source: TelemetryCsvFileSource::new(dir.join(TELEMETRY_FILE)),
        transforms: vec![Arc::new(TelemetryValidation)],
        sink: StoreSink::new(store, batch_size),
    };
    let LoadStats { written, rejected } = pipeline.run().await?;
    summary.telemetry_written = written;
    summary.telemetry_rejected = rejected;

    if rejected > 0 {
        tracing::warn!(rejected, "some telemetry rows were rejected");
    }
    tracing::info!(written, "telemetry loaded");

    Ok(summary)
}
