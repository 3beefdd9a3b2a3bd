//! Canned aggregation queries against the PostgreSQL schema in
//! `sql/schema/01_ecotrack.sql`.

use sqlx::PgPool;

use super::{StoreError, StoreResult};
use crate::{
    domain::{ServiceProvider, TelemetryReading, ELECTRICITY_KWH},
    rollup::{AssetTotal, DailyTotal, ElectricitySummary},
};

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ProviderRow {
    pub name: String,
    pub provider_type: String,
    pub lon: Option<f64>,
    pub lat: Option<f64>,
}

impl From<ProviderRow> for ServiceProvider {
    fn from(row: ProviderRow) -> Self {
        let location = match (row.lon, row.lat) {
            (Some(lon), Some(lat)) => Some(crate::domain::GeoPoint::new(lon, lat)),
            _ => None,
        };
        ServiceProvider {
            name: row.name,
            provider_type: row.provider_type,
            location,
        }
    }
}

/// Total, mean and count of electricity readings.
pub async fn electricity_summary(pool: &PgPool) -> StoreResult<ElectricitySummary> {
    let (total, count): (Option<f64>, i64) = sqlx::query_as(
        r#"
        SELECT SUM(value), COUNT(*)
        FROM telemetry
        WHERE value_type = $1
        "#,
    )
    .bind(ELECTRICITY_KWH)
    .fetch_one(pool)
    .await?;

    Ok(ElectricitySummary::from_parts(total.unwrap_or(0.0), count.max(0) as u64))
}

/// Electricity per asset, largest first.
pub async fn electricity_by_asset(pool: &PgPool) -> StoreResult<Vec<AssetTotal>> {
    let rows = sqlx::query_as::<_, AssetTotal>(
        r#"
        SELECT asset_id, SUM(value) AS total_kwh
        FROM telemetry
        WHERE value_type = $1
        GROUP BY asset_id
        ORDER BY total_kwh DESC, asset_id
        "#,
    )
    .bind(ELECTRICITY_KWH)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Electricity per UTC calendar day, ordered by date.
pub async fn electricity_by_day(pool: &PgPool) -> StoreResult<Vec<DailyTotal>> {
    let rows = sqlx::query_as::<_, DailyTotal>(
        r#"
        SELECT (ts AT TIME ZONE 'UTC')::date AS date, SUM(value) AS total_kwh
        FROM telemetry
        WHERE value_type = $1
        GROUP BY 1
        ORDER BY 1
        "#,
    )
    .bind(ELECTRICITY_KWH)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Highest electricity readings.
pub async fn top_readings(pool: &PgPool, limit: usize) -> StoreResult<Vec<TelemetryReading>> {
    let rows = sqlx::query_as::<_, TelemetryReading>(
        r#"
        SELECT ts, asset_id, site_id, value_type, value
        FROM telemetry
        WHERE value_type = $1
        ORDER BY value DESC
        LIMIT $2
        "#,
    )
    .bind(ELECTRICITY_KWH)
    .bind(limit as i64)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Electricity scaled by `factor` and summed, e.g. kWh to kg CO2e.
pub async fn scaled_electricity_total(pool: &PgPool, factor: f64) -> StoreResult<f64> {
    let (total,): (Option<f64>,) = sqlx::query_as(
        r#"
        SELECT SUM(value * $2)
        FROM telemetry
        WHERE value_type = $1
        "#,
    )
    .bind(ELECTRICITY_KWH)
    .bind(factor)
    .fetch_one(pool)
    .await?;

    Ok(total.unwrap_or(0.0))
}

pub async fn has_provider_location_index(pool: &PgPool) -> StoreResult<bool> {
    let (exists,): (bool,) = sqlx::query_as(
        r#"
        SELECT EXISTS (
            SELECT 1
            FROM pg_indexes
            WHERE schemaname = current_schema()
              AND tablename = 'service_providers'
              AND indexdef ILIKE '%USING gist (location%'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(exists)
}

/// Located providers in the GiST index's KNN order from `(lon, lat)`.
///
/// The index measures planar degrees, which can disagree with great-circle
/// distance, so every candidate is returned and the caller truncates after
/// re-ranking.
///
/// Errors with [`StoreError::MissingSpatialIndex`] when the index is absent,
/// instead of silently falling back to a sequential scan.
pub(crate) async fn nearest_providers(pool: &PgPool, lon: f64, lat: f64) -> StoreResult<Vec<ProviderRow>> {
    if !has_provider_location_index(pool).await? {
        return Err(StoreError::missing_provider_index());
    }

    let rows = sqlx::query_as::<_, ProviderRow>(
        r#"
        SELECT name, provider_type, location[0] AS lon, location[1] AS lat
        FROM service_providers
        WHERE location IS NOT NULL
        ORDER BY location <-> point($1, $2)
        "#,
    )
    .bind(lon)
    .bind(lat)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
