use serde::{Deserialize, Serialize};

use super::GeoPoint;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceProvider {
    pub name: String,
    #[serde(rename = "type", default)]
    pub provider_type: String,
    /// Providers imported from hand-edited files may lack a location.
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

/// A provider returned by a nearest-neighbour query, with its great-circle
/// distance from the query origin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderDistance {
    #[serde(flatten)]
    pub provider: ServiceProvider,
    pub distance_m: f64,
}
