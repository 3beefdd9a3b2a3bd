use serde::{Deserialize, Serialize};

use super::GeoPoint;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub site_id: i64,
    pub name: String,
    pub location: GeoPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Asset {
    pub asset_id: i64,
    pub site_id: i64,
    #[serde(rename = "type")]
    pub asset_type: String,
    pub name: String,
}
