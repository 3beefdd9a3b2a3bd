use serde::{Deserialize, Serialize};
use time::Date;

/// Daily waste quantity for a site, as written to `waste_logs.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct WasteLog {
    pub site_id: i64,
    #[serde(with = "crate::timefmt::day")]
    pub date: Date,
    #[serde(rename = "type")]
    pub waste_type: String,
    pub quantity_kg: f64,
}
