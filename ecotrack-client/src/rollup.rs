//! Electricity rollups over a snapshot of telemetry readings.
//!
//! Only readings tagged [`ELECTRICITY_KWH`] participate. Empty input gives
//! zero totals and empty series.

use std::collections::BTreeMap;

use serde::Serialize;
use time::Date;

use crate::domain::{TelemetryReading, ELECTRICITY_KWH};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, sqlx::FromRow)]
pub struct DailyTotal {
    #[serde(with = "crate::timefmt::day")]
    pub date: Date,
    pub total_kwh: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, sqlx::FromRow)]
pub struct AssetTotal {
    pub asset_id: i64,
    pub total_kwh: f64,
}

/// Sum, mean and count of electricity readings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ElectricitySummary {
    pub total_kwh: f64,
    /// Zero when there are no readings.
    pub mean_kwh: f64,
    pub count: u64,
}

impl ElectricitySummary {
    pub fn from_parts(total_kwh: f64, count: u64) -> Self {
        let mean_kwh = if count == 0 { 0.0 } else { total_kwh / count as f64 };
        Self {
            total_kwh,
            mean_kwh,
            count,
        }
    }
}

pub fn electricity(readings: &[TelemetryReading]) -> impl Iterator<Item = &TelemetryReading> {
    readings.iter().filter(|r| r.value_type == ELECTRICITY_KWH)
}

pub fn summarize(readings: &[TelemetryReading]) -> ElectricitySummary {
    let (total, count) = electricity(readings).fold((0.0, 0u64), |(sum, n), r| (sum + r.value, n + 1));
    ElectricitySummary::from_parts(total, count)
}

/// Per-day sums, ordered by date.
pub fn daily_totals(readings: &[TelemetryReading]) -> Vec<DailyTotal> {
    let mut by_day: BTreeMap<Date, f64> = BTreeMap::new();
    for r in electricity(readings) {
        *by_day.entry(r.day()).or_default() += r.value;
    }

    by_day
        .into_iter()
        .map(|(date, total_kwh)| DailyTotal { date, total_kwh })
        .collect()
}

/// Per-asset sums, largest first. Ties keep ascending asset id order.
pub fn asset_totals(readings: &[TelemetryReading]) -> Vec<AssetTotal> {
    let mut by_asset: BTreeMap<i64, f64> = BTreeMap::new();
    for r in electricity(readings) {
        *by_asset.entry(r.asset_id).or_default() += r.value;
    }

    let mut totals: Vec<AssetTotal> = by_asset
        .into_iter()
        .map(|(asset_id, total_kwh)| AssetTotal { asset_id, total_kwh })
        .collect();
    totals.sort_by(|a, b| b.total_kwh.total_cmp(&a.total_kwh));
    totals
}

/// The `limit` largest electricity readings, largest first.
pub fn peak_readings(readings: &[TelemetryReading], limit: usize) -> Vec<TelemetryReading> {
    let mut peaks: Vec<TelemetryReading> = electricity(readings).cloned().collect();
    peaks.sort_by(|a, b| b.value.total_cmp(&a.value));
    peaks.truncate(limit);
    peaks
}

/// Everything the dashboard shows about one filtered window of telemetry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Rollup {
    pub summary: ElectricitySummary,
    /// All readings in the window, electricity or not.
    pub readings: usize,
    pub daily: Vec<DailyTotal>,
    pub by_asset: Vec<AssetTotal>,
}

impl Rollup {
    pub fn compute(readings: &[TelemetryReading]) -> Self {
        Self {
            summary: summarize(readings),
            readings: readings.len(),
            daily: daily_totals(readings),
            by_asset: asset_totals(readings),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.summary.count == 0
    }

    pub fn top_assets(&self, n: usize) -> &[AssetTotal] {
        &self.by_asset[..n.min(self.by_asset.len())]
    }
}
