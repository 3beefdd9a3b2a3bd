//! Per-asset z-score scan over electricity readings.

use std::collections::BTreeMap;

use ecotrack_client::{domain::TelemetryReading, rollup};
use serde::Serialize;
use time::OffsetDateTime;

pub const DEFAULT_Z_THRESHOLD: f64 = 2.5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Anomaly {
    pub asset_id: i64,
    #[serde(rename = "timestamp", with = "ecotrack_client::timefmt::iso")]
    pub ts: OffsetDateTime,
    pub value: f64,
    pub z: f64,
}

/// Population mean and standard deviation. Returns `None` for empty input.
pub fn population_stats(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some((mean, variance.sqrt()))
}

/// Flag readings whose z-score within their asset exceeds `threshold`.
///
/// Assets with fewer than `min_readings` readings are skipped. A zero
/// standard deviation is treated as 1.0. Output is ordered by asset id, then
/// by the order readings were given in.
pub fn detect_anomalies(readings: &[TelemetryReading], threshold: f64, min_readings: usize) -> Vec<Anomaly> {
    let mut by_asset: BTreeMap<i64, Vec<&TelemetryReading>> = BTreeMap::new();
    for r in rollup::electricity(readings) {
        by_asset.entry(r.asset_id).or_default().push(r);
    }

    let mut anomalies = Vec::new();
    for (asset_id, group) in by_asset {
        if group.len() < min_readings.max(1) {
            continue;
        }

        let values: Vec<f64> = group.iter().map(|r| r.value).collect();
        let Some((mean, std)) = population_stats(&values) else {
            continue;
        };
        let std = if std > 0.0 { std } else { 1.0 };

        for r in group {
            let z = (r.value - mean) / std;
            if z > threshold {
                anomalies.push(Anomaly {
                    asset_id,
                    ts: r.ts,
                    value: r.value,
                    z,
                });
            }
        }
    }

    metrics::counter!("dashboard_anomalies_flagged_total").increment(anomalies.len() as u64);
    anomalies
}
