use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Alert {
    pub alert_id: i64,
    pub asset_id: i64,
    #[serde(rename = "timestamp", with = "crate::timefmt::iso")]
    pub ts: OffsetDateTime,
    pub alert_type: String,
    pub value: f64,
}
