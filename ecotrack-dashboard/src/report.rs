//! Terminal and JSON rendering of a [`Dashboard`].

use std::io::Write;

use anyhow::Context;
use tabwriter::TabWriter;

use crate::dashboard::{Dashboard, Panel};

const BAR_WIDTH: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

pub fn render(dash: &Dashboard, format: ReportFormat) -> anyhow::Result<String> {
    match format {
        ReportFormat::Text => render_text(dash),
        ReportFormat::Json => serde_json::to_string_pretty(dash).context("failed to serialize dashboard"),
    }
}

/// Horizontal bar scaled against `max`.
pub fn bar(value: f64, max: f64) -> String {
    if max <= 0.0 || !value.is_finite() || value <= 0.0 {
        return String::new();
    }
    let len = ((value / max) * BAR_WIDTH as f64).round() as usize;
    "█".repeat(len.clamp(1, BAR_WIDTH))
}

/// Lay out tab-separated rows as aligned columns.
pub fn table<I>(header: &str, rows: I) -> anyhow::Result<String>
where
    I: IntoIterator<Item = String>,
{
    let mut tw = TabWriter::new(Vec::new()).padding(2);
    writeln!(tw, "{header}")?;
    for row in rows {
        writeln!(tw, "{row}")?;
    }
    tw.flush()?;
    let bytes = tw
        .into_inner()
        .map_err(|e| anyhow::anyhow!("failed to flush table: {}", e.error()))?;
    Ok(String::from_utf8(bytes)?)
}

fn section<T>(
    out: &mut String,
    title: &str,
    panel: &Panel<T>,
    body: impl FnOnce(&T) -> anyhow::Result<String>,
) -> anyhow::Result<()> {
    out.push_str(&format!("\n== {title} ==\n"));
    match panel {
        Panel::Ready(v) => out.push_str(&body(v)?),
        Panel::NoData(msg) => out.push_str(&format!("(no data) {msg}\n")),
        Panel::Failed(msg) => out.push_str(&format!("(error) {msg}\n")),
    }
    Ok(())
}

fn max_of(values: impl Iterator<Item = f64>) -> f64 {
    values.fold(0.0, f64::max)
}

pub fn render_text(dash: &Dashboard) -> anyhow::Result<String> {
    let mut out = format!("EcoTrack dashboard: {} ({} to {})\n", dash.site, dash.start, dash.end);

    if let Some(index) = &dash.index {
        section(&mut out, "Spatial index", index, |msg| Ok(format!("{msg}\n")))?;
    }

    section(&mut out, "Metrics", &dash.metrics, |m| {
        table(
            "metric\tvalue",
            [
                format!("Total kWh\t{:.2}", m.total_kwh),
                format!("Emissions (kg CO2)\t{:.2}", m.emissions_kg_co2),
                format!("Average reading (kWh)\t{:.2}", m.mean_kwh),
                format!("Telemetry points\t{}", m.telemetry_points),
            ],
        )
    })?;

    section(&mut out, "Daily electricity usage", &dash.daily_usage, |daily| {
        let max = max_of(daily.iter().map(|d| d.total_kwh));
        table(
            "date\tkWh\t",
            daily
                .iter()
                .map(|d| format!("{}\t{:.2}\t{}", d.date, d.total_kwh, bar(d.total_kwh, max))),
        )
    })?;

    section(&mut out, "Top assets by usage", &dash.top_assets, |assets| {
        let max = max_of(assets.iter().map(|a| a.total_kwh));
        table(
            "asset\tname\tkWh\t",
            assets.iter().map(|a| {
                format!(
                    "{}\t{}\t{:.2}\t{}",
                    a.asset_id,
                    a.name.as_deref().unwrap_or("-"),
                    a.total_kwh,
                    bar(a.total_kwh, max)
                )
            }),
        )
    })?;

    let anomaly_title = format!("Anomalies (z > {})", dash.z_threshold);
    section(&mut out, &anomaly_title, &dash.anomalies, |anomalies| {
        table(
            "asset\ttimestamp\tvalue\tz",
            anomalies.iter().map(|a| {
                format!(
                    "{}\t{}\t{:.2}\t{:.2}",
                    a.asset_id,
                    ecotrack_client::timefmt::format_timestamp(a.ts),
                    a.value,
                    a.z
                )
            }),
        )
    })?;

    section(&mut out, "Forecast", &dash.forecast, |f| {
        let mut body = format!("method: {}\n", f.forecast.method);
        if let Some(reason) = &f.fallback_reason {
            body.push_str(&format!("requested model failed ({reason}); showing baseline\n"));
        }
        let max = max_of(f.forecast.points.iter().map(|p| p.value));
        body.push_str(&table(
            "date\tkWh\t",
            f.forecast
                .points
                .iter()
                .map(|p| format!("{}\t{:.2}\t{}", p.date, p.value, bar(p.value, max))),
        )?);
        Ok(body)
    })?;

    section(&mut out, "Service providers", &dash.providers, |providers| {
        table(
            "name\ttype\tlat\tlon",
            providers
                .iter()
                .map(|p| format!("{}\t{}\t{:.4}\t{:.4}", p.name, p.provider_type, p.lat, p.lon)),
        )
    })?;

    section(&mut out, "Nearest providers", &dash.nearest, |n| {
        let mut body = format!("from {}\n", n.origin);
        body.push_str(&table(
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
        Ok(body)
    })?;

    Ok(out)
}
