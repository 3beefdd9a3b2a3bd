use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

/// Value-type tag of the only readings the analytics consume.
pub const ELECTRICITY_KWH: &str = "electricity_kWh";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TelemetryReading {
    #[serde(rename = "timestamp", with = "crate::timefmt::iso")]
    pub ts: OffsetDateTime,
    pub asset_id: i64,
    pub site_id: i64,
    pub value_type: String,
    pub value: f64,
}

impl TelemetryReading {
    pub fn is_electricity(&self) -> bool {
        self.value_type == ELECTRICITY_KWH
    }

    /// Calendar day (UTC) the reading falls on.
    pub fn day(&self) -> Date {
        self.ts.to_offset(time::UtcOffset::UTC).date()
    }
}
