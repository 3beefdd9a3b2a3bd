//! Computations behind the dashboard panels.

pub mod anomaly;
pub mod emissions;
pub mod forecast;

pub use anomaly::{detect_anomalies, Anomaly};
pub use ecotrack_client::rollup::Rollup;
pub use emissions::emissions_kg;
pub use forecast::{Forecast, ForecastError, ForecastMethod, ForecastPoint, ForecastStrategy};
