//! The canned aggregation queries, run directly against the store.

use std::{future::Future, time::Instant};

use ecotrack_client::{
    domain::{ProviderDistance, TelemetryReading},
    rollup::{AssetTotal, DailyTotal},
    timefmt, StoreError, TelemetryStore,
};
use serde::Serialize;

use crate::report::table;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearestResult {
    pub origin: String,
    pub providers: Vec<ProviderDistance>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryReport {
    pub total_kwh: f64,
    pub per_asset: Vec<AssetTotal>,
    pub mean_kwh: f64,
    pub per_day: Vec<DailyTotal>,
    pub highest_spike: Option<TelemetryReading>,
    pub total_emissions_kg: f64,
    /// Caught failures (e.g. a missing spatial index) are kept as messages.
    pub nearest: Result<NearestResult, String>,
}

async fn timed<T, F>(query: &'static str, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    let started = Instant::now();
    let res = fut.await;
    let elapsed = started.elapsed().as_secs_f64();
    metrics::histogram!("store_query_duration_seconds", "query" => query).record(elapsed);
    tracing::debug!(query, elapsed_s = elapsed, ok = res.is_ok(), "canned query");
    res
}

pub async fn run_queries(
    store: &dyn TelemetryStore,
    emission_factor: f64,
    nearest_limit: usize,
) -> Result<QueryReport, StoreError> {
    let summary = timed("electricity_summary", store.electricity_summary()).await?;
    let per_asset = timed("electricity_by_asset", store.electricity_by_asset()).await?;
    let per_day = timed("electricity_by_day", store.electricity_by_day()).await?;
    let highest_spike = timed("top_readings", store.top_readings(1)).await?.into_iter().next();
    let total_emissions_kg = timed("scaled_electricity_total", store.scaled_electricity_total(emission_factor)).await?;

    let sites = store.sites().await?;
    let nearest = match sites.first() {
        None => Err("no sites to search from".to_string()),
        Some(site) => match timed("nearest_providers", store.nearest_providers(site.location, nearest_limit)).await {
            Ok(providers) => Ok(NearestResult {
                origin: site.name.clone(),
                providers,
            }),
            Err(e @ StoreError::MissingSpatialIndex { .. }) => {
                tracing::warn!(error = %e, "nearest-provider query skipped");
                Err(e.to_string())
            }
            Err(e) => return Err(e),
        },
    };

    Ok(QueryReport {
        total_kwh: summary.total_kwh,
        per_asset,
        mean_kwh: summary.mean_kwh,
        per_day,
        highest_spike,
        total_emissions_kg,
        nearest,
    })
}

pub fn render_text(report: &QueryReport) -> anyhow::Result<String> {
    let mut out = String::new();

    out.push_str(&format!("Total electricity: {:.2} kWh\n", report.total_kwh));
    out.push_str(&format!("Average reading: {:.2} kWh\n", report.mean_kwh));
    out.push_str(&format!("Total emissions: {:.2} kg CO2\n", report.total_emissions_kg));
    match &report.highest_spike {
        Some(r) => out.push_str(&format!(
            "Highest spike: {:.2} kWh on asset {} at {}\n",
            r.value,
            r.asset_id,
            timefmt::format_timestamp(r.ts)
        )),
        None => out.push_str("Highest spike: none\n"),
    }

    out.push_str("\nConsumption per asset\n");
    out.push_str(&table(
        "asset\tkWh",
        report.per_asset.iter().map(|a| format!("{}\t{:.2}", a.asset_id, a.total_kwh)),
    )?);

    out.push_str("\nConsumption per day\n");
    out.push_str(&table(
        "date\tkWh",
        report.per_day.iter().map(|d| format!("{}\t{:.2}", d.date, d.total_kwh)),
    )?);

    out.push_str("\nNearest service providers\n");
    match &report.nearest {
        Ok(n) => {
            out.push_str(&format!("from {}\n", n.origin));
            out.push_str(&table(
                "name\ttype\tdistance_km",
                n.providers.iter().map(|p| {
                    format!(
                        "{}\t{}\t{:.2}",
                        p.provider.name,
                        p.provider.provider_type,
                        p.distance_m / 1000.0
                    )
                }),
            )?);
        }
        Err(msg) => out.push_str(&format!("(error) {msg}\n")),
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::{self, SeedOptions};
    use ecotrack_client::MemoryStore;
    use time::macros::date;

    fn store() -> MemoryStore {
        MemoryStore::from_dataset(seed::generate(&SeedOptions {
            start: date!(2024 - 02 - 01),
            days: 2,
            rng_seed: 3,
        }))
    }

    #[tokio::test]
    async fn queries_agree_with_each_other() {
        let store = store();
        let report = run_queries(&store, 0.82, 5).await.unwrap();

        let per_asset: f64 = report.per_asset.iter().map(|a| a.total_kwh).sum();
        let per_day: f64 = report.per_day.iter().map(|d| d.total_kwh).sum();
        assert!((per_asset - report.total_kwh).abs() < 1e-6);
        assert!((per_day - report.total_kwh).abs() < 1e-6);
        assert!((report.total_emissions_kg - report.total_kwh * 0.82).abs() < 1e-6);
        assert!((report.mean_kwh - report.total_kwh / (2.0 * 24.0 * 6.0)).abs() < 1e-9);

        // Main meters draw at least 18 kWh; nothing else exceeds 11.
        let spike = report.highest_spike.as_ref().unwrap();
        assert!([101, 201].contains(&spike.asset_id));
        assert_eq!(report.per_day.len(), 2);
    }

    #[tokio::test]
    async fn missing_index_is_reported_not_raised() {
        let store = store();
        let report = run_queries(&store, 0.82, 5).await.unwrap();
        let msg = report.nearest.as_ref().unwrap_err();
        assert!(msg.contains("service_providers.location"));

        let text = render_text(&report).unwrap();
        assert!(text.contains("(error)"));
    }

    #[tokio::test]
    async fn nearest_runs_once_indexed() {
        let store = store();
        store.ensure_spatial_index().await.unwrap();
        let report = run_queries(&store, 0.82, 5).await.unwrap();

        let nearest = report.nearest.unwrap();
        assert_eq!(nearest.origin, "Raipur Plant");
        assert_eq!(nearest.providers.len(), 2);
        assert!(nearest.providers[0].distance_m <= nearest.providers[1].distance_m);
    }
}
