mod alert;
mod geo;
mod provider;
mod site;
mod telemetry;
mod waste;

pub use alert::Alert;
pub use geo::GeoPoint;
pub use provider::{ProviderDistance, ServiceProvider};
pub use site::{Asset, Site};
pub use telemetry::{TelemetryReading, ELECTRICITY_KWH};
pub use waste::WasteLog;
