//! Dashboard assembly: resolves the filter against the store and computes
//! every panel.
//!
//! Each panel carries its own outcome ([`Panel`]). An empty window is a
//! `NoData` panel and a failed query or model is a `Failed` panel; neither
//! stops the other panels from rendering. Only an unknown site or a failure
//! to list sites aborts the whole report.

use std::{collections::HashMap, convert::Infallible, fmt, str::FromStr, time::Instant};

use ecotrack_client::{
    domain::{GeoPoint, ProviderDistance, Site, TelemetryReading},
    rollup::DailyTotal,
    timefmt, StoreError, TelemetryFilter, TelemetryStore,
};
use serde::Serialize;
use time::{Date, Duration};

use crate::{
    analytics::{detect_anomalies, emissions_kg, Anomaly, Forecast, ForecastStrategy, Rollup},
    config::AnalyticsConfig,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteSelector {
    All,
    Id(i64),
    Name(String),
}

impl FromStr for SiteSelector {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        Ok(s.parse().map(Self::Id).unwrap_or_else(|_| Self::Name(s.to_string())))
    }
}

impl fmt::Display for SiteSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("All"),
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// The filter panel. `start` and `end` are inclusive calendar dates (UTC).
#[derive(Debug, Clone)]
pub struct DashboardFilter {
    pub site: SiteSelector,
    pub start: Date,
    pub end: Date,
    pub horizon_days: u32,
    pub create_index: bool,
}

impl DashboardFilter {
    /// From `days` days before `today` through `today`, all sites.
    pub fn trailing(today: Date, days: i64, horizon_days: u32) -> Self {
        Self {
            site: SiteSelector::All,
            start: today.checked_sub(Duration::days(days.max(0))).unwrap_or(Date::MIN),
            end: today,
            horizon_days,
            create_index: false,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum DashboardError {
    #[error("unknown site '{0}'")]
    UnknownSite(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Panel<T> {
    Ready(T),
    NoData(String),
    Failed(String),
}

impl<T> Panel<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Panel::Ready(v) => Some(v),
            _ => None,
        }
    }

    fn map<U>(&self, f: impl FnOnce(&T) -> Panel<U>) -> Panel<U> {
        match self {
            Panel::Ready(v) => f(v),
            Panel::NoData(msg) => Panel::NoData(msg.clone()),
            Panel::Failed(msg) => Panel::Failed(msg.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryMetrics {
    pub total_kwh: f64,
    pub emissions_kg_co2: f64,
    pub mean_kwh: f64,
    pub telemetry_points: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetUsage {
    pub asset_id: i64,
    pub name: Option<String>,
    pub total_kwh: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPanel {
    #[serde(flatten)]
    pub forecast: Forecast,
    /// Set when the requested model failed and the baseline was used.
    pub fallback_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderLocation {
    pub name: String,
    #[serde(rename = "type")]
    pub provider_type: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearestProviders {
    pub origin: String,
    pub providers: Vec<ProviderDistance>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub site: String,
    #[serde(with = "timefmt::day")]
    pub start: Date,
    #[serde(with = "timefmt::day")]
    pub end: Date,
    pub z_threshold: f64,
    /// Outcome of the index-creation trigger, when requested.
    pub index: Option<Panel<String>>,
    pub metrics: Panel<SummaryMetrics>,
    pub daily_usage: Panel<Vec<DailyTotal>>,
    pub top_assets: Panel<Vec<AssetUsage>>,
    pub anomalies: Panel<Vec<Anomaly>>,
    pub forecast: Panel<ForecastPanel>,
    pub providers: Panel<Vec<ProviderLocation>>,
    pub nearest: Panel<NearestProviders>,
}

fn failed<T>(panel: &str, err: impl fmt::Display) -> Panel<T> {
    tracing::warn!(panel, error = %err, "dashboard panel failed");
    metrics::counter!("dashboard_panel_failures_total", "panel" => panel.to_string()).increment(1);
    Panel::Failed(err.to_string())
}

fn resolve_site(sites: &[Site], selector: &SiteSelector) -> Result<Option<Site>, DashboardError> {
    let found = match selector {
        SiteSelector::All => return Ok(None),
        SiteSelector::Id(id) => sites.iter().find(|s| s.site_id == *id),
        SiteSelector::Name(name) => sites.iter().find(|s| s.name.eq_ignore_ascii_case(name)),
    };
    found
        .cloned()
        .map(Some)
        .ok_or_else(|| DashboardError::UnknownSite(selector.to_string()))
}

pub async fn build_dashboard(
    store: &dyn TelemetryStore,
    filter: &DashboardFilter,
    analytics: &AnalyticsConfig,
    strategy: ForecastStrategy,
) -> Result<Dashboard, DashboardError> {
    let started = Instant::now();

    let sites = store.sites().await?;
    let site = resolve_site(&sites, &filter.site)?;
    let site_label = site.as_ref().map_or_else(|| "All".to_string(), |s| s.name.clone());

    let index = if filter.create_index {
        Some(match store.ensure_spatial_index().await {
            Ok(status) => Panel::Ready(status.to_string()),
            Err(e) => failed("index", e),
        })
    } else {
        None
    };

    let readings = load_window(store, filter, site.as_ref()).await;
    let asset_names: HashMap<i64, String> = match store.assets(site.as_ref().map(|s| s.site_id)).await {
        Ok(assets) => assets.into_iter().map(|a| (a.asset_id, a.name)).collect(),
        Err(e) => {
            tracing::warn!(error = %e, "asset names unavailable");
            HashMap::new()
        }
    };

    let window: Panel<(Vec<TelemetryReading>, Rollup)> = match readings {
        Ok(readings) if readings.is_empty() => Panel::NoData(format!(
            "no telemetry for {site_label} between {} and {}",
            filter.start, filter.end
        )),
        Ok(readings) => {
            let rollup = Rollup::compute(&readings);
            Panel::Ready((readings, rollup))
        }
        Err(e) => failed("telemetry", e),
    };

    // Counts every reading; the kWh figures are zero when none are electricity.
    let metrics = window.map(|(_, rollup)| {
        Panel::Ready(SummaryMetrics {
            total_kwh: rollup.summary.total_kwh,
            emissions_kg_co2: emissions_kg(rollup.summary.total_kwh, analytics.emission_factor),
            mean_kwh: rollup.summary.mean_kwh,
            telemetry_points: rollup.readings,
        })
    });

    let electricity: Panel<&(Vec<TelemetryReading>, Rollup)> = match &window {
        Panel::Ready((_, rollup)) if rollup.is_empty() => Panel::NoData(format!(
            "no electricity readings for {site_label} between {} and {}",
            filter.start, filter.end
        )),
        Panel::Ready(w) => Panel::Ready(w),
        Panel::NoData(msg) => Panel::NoData(msg.clone()),
        Panel::Failed(msg) => Panel::Failed(msg.clone()),
    };

    let daily_usage = electricity.map(|(_, rollup)| Panel::Ready(rollup.daily.clone()));

    let top_assets = electricity.map(|(_, rollup)| {
        Panel::Ready(
            rollup
                .top_assets(analytics.top_assets)
                .iter()
                .map(|t| AssetUsage {
                    asset_id: t.asset_id,
                    name: asset_names.get(&t.asset_id).cloned(),
                    total_kwh: t.total_kwh,
                })
                .collect(),
        )
    });

    let anomalies = electricity.map(|(readings, _)| {
        let found = detect_anomalies(readings, analytics.z_threshold, analytics.min_readings_per_asset);
        if found.is_empty() {
            Panel::NoData(format!("no readings with z-score above {}", analytics.z_threshold))
        } else {
            Panel::Ready(found)
        }
    });

    let forecast =
        electricity.map(|(_, rollup)| forecast_panel(&rollup.daily, strategy, analytics, filter.horizon_days));

    let providers = match store.providers().await {
        Ok(all) => {
            let located: Vec<ProviderLocation> = all
                .into_iter()
                .filter_map(|p| {
                    let loc = p.location.filter(GeoPoint::is_valid)?;
                    Some(ProviderLocation {
                        name: p.name,
                        provider_type: p.provider_type,
                        lat: loc.lat,
                        lon: loc.lon,
                    })
                })
                .collect();
            if located.is_empty() {
                Panel::NoData("no service providers with valid coordinates".to_string())
            } else {
                Panel::Ready(located)
            }
        }
        Err(e) => failed("providers", e),
    };

    let origin = site.as_ref().or(sites.first());
    let nearest = match origin {
        None => Panel::NoData("no sites to search from".to_string()),
        Some(origin) => match store.nearest_providers(origin.location, analytics.nearest_providers).await {
            Ok(found) if found.is_empty() => Panel::NoData(format!("no providers near {}", origin.name)),
            Ok(found) => Panel::Ready(NearestProviders {
                origin: origin.name.clone(),
                providers: found,
            }),
            Err(e @ StoreError::MissingSpatialIndex { .. }) => {
                failed("nearest", format!("{e}; rerun with --create-index"))
            }
            Err(e) => failed("nearest", e),
        },
    };

    metrics::histogram!("dashboard_build_seconds").record(started.elapsed().as_secs_f64());
    tracing::info!(
        site = %site_label,
        start = %filter.start,
        end = %filter.end,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "dashboard built"
    );

    Ok(Dashboard {
        site: site_label,
        start: filter.start,
        end: filter.end,
        z_threshold: analytics.z_threshold,
        index,
        metrics,
        daily_usage,
        top_assets,
        anomalies,
        forecast,
        providers,
        nearest,
    })
}

/// Telemetry inside the filter window, `end` date inclusive.
async fn load_window(
    store: &dyn TelemetryStore,
    filter: &DashboardFilter,
    site: Option<&Site>,
) -> Result<Vec<TelemetryReading>, StoreError> {
    let asset_ids = match site {
        Some(site) => Some(
            store
                .assets(Some(site.site_id))
                .await?
                .into_iter()
                .map(|a| a.asset_id)
                .collect(),
        ),
        None => None,
    };

    let query = TelemetryFilter {
        asset_ids,
        start: Some(timefmt::day_start(filter.start)),
        // Open-ended when `end` is the last representable date.
        end: filter.end.next_day().map(timefmt::day_start),
        limit: None,
    };
    store.telemetry(&query).await
}

fn forecast_panel(
    daily: &[DailyTotal],
    strategy: ForecastStrategy,
    analytics: &AnalyticsConfig,
    horizon: u32,
) -> Panel<ForecastPanel> {
    match strategy.forecast(daily, horizon) {
        Ok(forecast) => Panel::Ready(ForecastPanel {
            forecast,
            fallback_reason: None,
        }),
        Err(e) => {
            tracing::warn!(error = %e, "forecast model failed, using moving average");
            let baseline = ForecastStrategy::MovingAverage {
                window: analytics.forecast_window,
            };
            match baseline.forecast(daily, horizon) {
                Ok(forecast) => Panel::Ready(ForecastPanel {
                    forecast,
                    fallback_reason: Some(e.to_string()),
                }),
                Err(e) => failed("forecast", e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::{self, SeedOptions};
    use ecotrack_client::{
        dataset::Dataset,
        domain::{Asset, ELECTRICITY_KWH},
        MemoryStore,
    };
    use time::macros::{date, datetime};

    fn seeded() -> MemoryStore {
        MemoryStore::from_dataset(seed::generate(&SeedOptions {
            start: date!(2024 - 01 - 01),
            days: 3,
            rng_seed: 11,
        }))
    }

    fn filter(site: SiteSelector) -> DashboardFilter {
        DashboardFilter {
            site,
            start: date!(2024 - 01 - 01),
            end: date!(2024 - 01 - 03),
            horizon_days: 7,
            create_index: false,
        }
    }

    fn moving_average() -> ForecastStrategy {
        ForecastStrategy::MovingAverage { window: 3 }
    }

    #[test]
    fn site_selector_parses_all_ids_and_names() {
        assert_eq!("All".parse::<SiteSelector>().unwrap(), SiteSelector::All);
        assert_eq!("all".parse::<SiteSelector>().unwrap(), SiteSelector::All);
        assert_eq!("2".parse::<SiteSelector>().unwrap(), SiteSelector::Id(2));
        assert_eq!(
            "Raipur Plant".parse::<SiteSelector>().unwrap(),
            SiteSelector::Name("Raipur Plant".to_string())
        );
    }

    #[test]
    fn trailing_window_ends_today() {
        let f = DashboardFilter::trailing(date!(2024 - 03 - 14), 14, 14);
        assert_eq!(f.start, date!(2024 - 02 - 29));
        assert_eq!(f.end, date!(2024 - 03 - 14));

        let f = DashboardFilter::trailing(Date::MIN + Duration::days(2), 14, 14);
        assert_eq!(f.start, Date::MIN);
    }

    #[tokio::test]
    async fn all_sites_fills_every_panel_but_nearest() {
        let store = seeded();
        let cfg = AnalyticsConfig::default();
        let dash = build_dashboard(&store, &filter(SiteSelector::All), &cfg, moving_average())
            .await
            .unwrap();

        assert_eq!(dash.site, "All");
        let m = dash.metrics.ready().unwrap();
        assert_eq!(m.telemetry_points, 3 * 24 * 6);
        assert!((m.emissions_kg_co2 - m.total_kwh * 0.82).abs() < 1e-9);
        assert!((m.mean_kwh - m.total_kwh / m.telemetry_points as f64).abs() < 1e-9);

        let daily = dash.daily_usage.ready().unwrap();
        assert_eq!(daily.len(), 3);
        let daily_sum: f64 = daily.iter().map(|d| d.total_kwh).sum();
        assert!((daily_sum - m.total_kwh).abs() < 1e-6);

        let top = dash.top_assets.ready().unwrap();
        assert_eq!(top.len(), 6);
        assert!(top.windows(2).all(|w| w[0].total_kwh >= w[1].total_kwh));
        assert!(top.iter().all(|a| a.name.is_some()));

        let forecast = dash.forecast.ready().unwrap();
        assert_eq!(forecast.forecast.points.len(), 7);
        assert_eq!(forecast.forecast.points[0].date, date!(2024 - 01 - 04));
        assert!(forecast.fallback_reason.is_none());

        assert_eq!(dash.providers.ready().map(Vec::len), Some(2));

        match &dash.nearest {
            Panel::Failed(msg) => assert!(msg.contains("service_providers.location"), "{msg}"),
            other => panic!("expected missing index, got {other:?}"),
        }
        assert!(dash.index.is_none());
    }

    #[tokio::test]
    async fn index_trigger_enables_nearest_lookup() {
        let store = seeded();
        let mut f = filter(SiteSelector::Name("bhilai warehouse".to_string()));
        f.create_index = true;

        let dash = build_dashboard(&store, &f, &AnalyticsConfig::default(), moving_average())
            .await
            .unwrap();

        assert_eq!(dash.site, "Bhilai Warehouse");
        assert!(matches!(dash.index, Some(Panel::Ready(_))));

        let nearest = dash.nearest.ready().unwrap();
        assert_eq!(nearest.origin, "Bhilai Warehouse");
        assert_eq!(nearest.providers[0].provider.name, "Bhilai Solar Services");

        let top = dash.top_assets.ready().unwrap();
        assert!(top.iter().all(|a| [201, 202, 203].contains(&a.asset_id)));
        assert_eq!(dash.metrics.ready().unwrap().telemetry_points, 3 * 24 * 3);
    }

    #[tokio::test]
    async fn all_sites_searches_from_the_first_site() {
        let store = seeded();
        store.ensure_spatial_index().await.unwrap();

        let dash = build_dashboard(&store, &filter(SiteSelector::All), &AnalyticsConfig::default(), moving_average())
            .await
            .unwrap();

        let nearest = dash.nearest.ready().unwrap();
        assert_eq!(nearest.origin, "Raipur Plant");
        assert_eq!(nearest.providers[0].provider.name, "Raipur Recycling Center");
    }

    #[tokio::test]
    async fn empty_window_is_no_data_not_an_error() {
        let store = seeded();
        let mut f = filter(SiteSelector::Id(1));
        f.start = date!(2030 - 01 - 01);
        f.end = date!(2030 - 01 - 31);

        let dash = build_dashboard(&store, &f, &AnalyticsConfig::default(), moving_average())
            .await
            .unwrap();

        assert!(matches!(dash.metrics, Panel::NoData(_)));
        assert!(matches!(dash.daily_usage, Panel::NoData(_)));
        assert!(matches!(dash.anomalies, Panel::NoData(_)));
        assert!(matches!(dash.forecast, Panel::NoData(_)));
        assert!(dash.providers.ready().is_some());
    }

    #[tokio::test]
    async fn unknown_site_is_rejected() {
        let store = seeded();
        let err = build_dashboard(
            &store,
            &filter(SiteSelector::Id(99)),
            &AnalyticsConfig::default(),
            moving_average(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DashboardError::UnknownSite(ref s) if s == "99"));
    }

    #[tokio::test]
    async fn end_date_is_inclusive_and_spike_is_flagged() {
        let mut telemetry: Vec<TelemetryReading> = (0..20)
            .map(|h| TelemetryReading {
                ts: datetime!(2024-05-01 04:00:00 UTC) + Duration::hours(h),
                asset_id: 7,
                site_id: 1,
                value_type: ELECTRICITY_KWH.to_string(),
                value: 10.0,
            })
            .collect();
        telemetry[19].value = 200.0;

        let store = MemoryStore::from_dataset(Dataset {
            sites: seed::sites(),
            assets: vec![Asset {
                asset_id: 7,
                site_id: 1,
                asset_type: "machine".to_string(),
                name: "Press".to_string(),
            }],
            telemetry,
            ..Dataset::default()
        });

        let mut f = filter(SiteSelector::Id(1));
        f.start = date!(2024 - 05 - 01);
        f.end = date!(2024 - 05 - 01);

        let dash = build_dashboard(&store, &f, &AnalyticsConfig::default(), moving_average())
            .await
            .unwrap();

        // 04:00 + 19h lands on 23:00, still inside the end date.
        assert_eq!(dash.metrics.ready().unwrap().telemetry_points, 20);
        let anomalies = dash.anomalies.ready().unwrap();
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].value, 200.0);
        assert!(matches!(dash.providers, Panel::NoData(_)));
    }

    #[tokio::test]
    async fn last_representable_end_date_is_open_ended() {
        let store = seeded();
        let mut f = filter(SiteSelector::All);
        f.start = date!(9999 - 12 - 01);
        f.end = date!(9999 - 12 - 31);

        let dash = build_dashboard(&store, &f, &AnalyticsConfig::default(), moving_average())
            .await
            .unwrap();

        assert!(matches!(dash.metrics, Panel::NoData(_)));
        assert!(matches!(dash.daily_usage, Panel::NoData(_)));
    }

    #[tokio::test]
    async fn non_electricity_window_still_counts_points() {
        let telemetry: Vec<TelemetryReading> = (0..5)
            .map(|h| TelemetryReading {
                ts: datetime!(2024-05-01 08:00:00 UTC) + Duration::hours(h),
                asset_id: 7,
                site_id: 1,
                value_type: "water_m3".to_string(),
                value: 3.5,
            })
            .collect();
        let store = MemoryStore::from_dataset(Dataset {
            sites: seed::sites(),
            assets: vec![Asset {
                asset_id: 7,
                site_id: 1,
                asset_type: "pump".to_string(),
                name: "Cooling pump".to_string(),
            }],
            telemetry,
            ..Dataset::default()
        });

        let mut f = filter(SiteSelector::Id(1));
        f.start = date!(2024 - 05 - 01);
        f.end = date!(2024 - 05 - 01);

        let dash = build_dashboard(&store, &f, &AnalyticsConfig::default(), moving_average())
            .await
            .unwrap();

        assert_eq!(
            dash.metrics,
            Panel::Ready(SummaryMetrics {
                total_kwh: 0.0,
                emissions_kg_co2: 0.0,
                mean_kwh: 0.0,
                telemetry_points: 5,
            })
        );
        match &dash.daily_usage {
            Panel::NoData(msg) => assert!(msg.contains("no electricity readings"), "{msg}"),
            other => panic!("expected no data, got {other:?}"),
        }
        assert!(matches!(dash.top_assets, Panel::NoData(_)));
        assert!(matches!(dash.anomalies, Panel::NoData(_)));
        assert!(matches!(dash.forecast, Panel::NoData(_)));
    }

    #[cfg(feature = "seasonal")]
    #[test]
    fn failed_seasonal_fit_shows_the_baseline() {
        let daily: Vec<DailyTotal> = (0..3)
            .map(|i| DailyTotal {
                date: date!(2024 - 01 - 01) + Duration::days(i),
                total_kwh: 100.0 + i as f64,
            })
            .collect();

        let panel = forecast_panel(
            &daily,
            ForecastStrategy::Seasonal { season_length: 7 },
            &AnalyticsConfig::default(),
            5,
        );

        let ready = panel.ready().unwrap();
        assert!(ready.fallback_reason.as_deref().unwrap().contains("seasonal fit"));
        assert_eq!(ready.forecast.points.len(), 5);
        assert_eq!(ready.forecast.points[0].date, date!(2024 - 01 - 04));
        assert!(ready.forecast.method.contains("moving average"), "{}", ready.forecast.method);
    }
}
