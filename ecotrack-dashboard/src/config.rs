use serde::Deserialize;
use std::{fs, path::PathBuf};

use crate::analytics::{anomaly::DEFAULT_Z_THRESHOLD, emissions::DEFAULT_EMISSION_FACTOR, ForecastMethod};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub kind: StoreKind,
    /// Connection string, required for `postgres`.
    pub uri: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Seed-file directory, required for `memory`.
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// kg CO2e per kWh.
    pub emission_factor: f64,
    pub z_threshold: f64,
    pub min_readings_per_asset: usize,
    pub forecast_method: ForecastMethod,
    pub forecast_window: usize,
    pub forecast_horizon_days: u32,
    pub top_assets: usize,
    pub nearest_providers: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            emission_factor: DEFAULT_EMISSION_FACTOR,
            z_threshold: DEFAULT_Z_THRESHOLD,
            min_readings_per_asset: 2,
            forecast_method: ForecastMethod::MovingAverage,
            forecast_window: 3,
            forecast_horizon_days: 14,
            top_assets: 10,
            nearest_providers: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub batch_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self { batch_size: 5_000 }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Prometheus textfile written when a binary exits.
    pub textfile_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub store: StoreConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub loader: LoaderConfig,
    pub metrics: Option<MetricsConfig>,
}

fn default_max_connections() -> u32 {
    4
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("ECOTRACK_CONFIG").unwrap_or_else(|_| "ecotrack.toml".to_string());
        let contents = fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("failed to read config '{path}': {e}"))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        match self.store.kind {
            StoreKind::Postgres if self.store.uri.is_none() => {
                anyhow::bail!("store.uri is required when store.kind = \"postgres\"")
            }
            StoreKind::Memory if self.store.data_dir.is_none() => {
                anyhow::bail!("store.data_dir is required when store.kind = \"memory\"")
            }
            _ => {}
        }
        if self.analytics.forecast_window == 0 {
            anyhow::bail!("analytics.forecast_window must be at least 1");
        }
        if self.loader.batch_size == 0 {
            anyhow::bail!("loader.batch_size must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_takes_defaults() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [store]
            kind = "memory"
            data_dir = "data"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.store.kind, StoreKind::Memory);
        assert_eq!(cfg.store.max_connections, 4);
        assert_eq!(cfg.analytics.emission_factor, 0.82);
        assert_eq!(cfg.analytics.z_threshold, 2.5);
        assert_eq!(cfg.analytics.forecast_method, ForecastMethod::MovingAverage);
        assert_eq!(cfg.analytics.forecast_window, 3);
        assert_eq!(cfg.loader.batch_size, 5_000);
        assert!(cfg.metrics.is_none());
    }

    #[test]
    fn analytics_policy_is_overridable() {
        let cfg = AppConfig::from_toml_str(
            r#"
            [store]
            kind = "postgres"
            uri = "postgres://ecotrack@localhost/ecotrack"

            [analytics]
            emission_factor = 0.5
            z_threshold = 3.0
            forecast_method = "seasonal"

            [metrics]
            textfile_path = "/tmp/ecotrack.prom"
            "#,
        )
        .unwrap();

        assert_eq!(cfg.analytics.emission_factor, 0.5);
        assert_eq!(cfg.analytics.z_threshold, 3.0);
        assert_eq!(cfg.analytics.forecast_method, ForecastMethod::Seasonal);
        assert_eq!(cfg.analytics.forecast_horizon_days, 14);
        assert!(cfg.metrics.is_some());
    }

    #[test]
    fn store_kind_requires_its_location() {
        let err = AppConfig::from_toml_str("[store]\nkind = \"postgres\"\n").unwrap_err();
        assert!(err.to_string().contains("store.uri"));

        let err = AppConfig::from_toml_str("[store]\nkind = \"memory\"\n").unwrap_err();
        assert!(err.to_string().contains("store.data_dir"));
    }
}
