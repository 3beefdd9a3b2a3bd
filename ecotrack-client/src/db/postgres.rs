use async_trait::async_trait;
use sqlx::{
    postgres::{PgPool, PgPoolOptions},
    Postgres, QueryBuilder,
};

use super::{
    aggregation_queries::{self, ProviderRow},
    rank_by_distance, IndexStatus, StoreResult, TelemetryFilter, TelemetryStore,
};
use crate::{
    domain::{Alert, Asset, GeoPoint, ProviderDistance, ServiceProvider, Site, TelemetryReading, WasteLog},
    rollup::{AssetTotal, DailyTotal, ElectricitySummary},
};

// Keeps every insert well under the 65535 bind-parameter limit.
const MAX_ROWS_PER_INSERT: usize = 10_000;

#[derive(Debug, sqlx::FromRow)]
struct SiteRow {
    site_id: i64,
    name: String,
    lon: f64,
    lat: f64,
}

impl From<SiteRow> for Site {
    fn from(row: SiteRow) -> Self {
        Site {
            site_id: row.site_id,
            name: row.name,
            location: GeoPoint::new(row.lon, row.lat),
        }
    }
}

/// PostgreSQL-backed store. Locations are native `point` columns
/// (x = longitude, y = latitude).
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(uri: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(uri)
            .await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl TelemetryStore for PgStore {
    async fn sites(&self) -> StoreResult<Vec<Site>> {
        let rows = sqlx::query_as::<_, SiteRow>(
            r#"
            SELECT site_id, name, location[0] AS lon, location[1] AS lat
            FROM sites
            ORDER BY site_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Site::from).collect())
    }

    async fn assets(&self, site_id: Option<i64>) -> StoreResult<Vec<Asset>> {
        let rows = sqlx::query_as::<_, Asset>(
            r#"
            SELECT asset_id, site_id, asset_type, name
            FROM assets
            WHERE $1::BIGINT IS NULL OR site_id = $1
            ORDER BY asset_id
            "#,
        )
        .bind(site_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn telemetry(&self, filter: &TelemetryFilter) -> StoreResult<Vec<TelemetryReading>> {
        let mut builder =
            QueryBuilder::<Postgres>::new("SELECT ts, asset_id, site_id, value_type, value FROM telemetry WHERE TRUE");

        if let Some(ids) = &filter.asset_ids {
            builder.push(" AND asset_id = ANY(").push_bind(ids.clone()).push(")");
        }
        if let Some(start) = filter.start {
            builder.push(" AND ts >= ").push_bind(start);
        }
        if let Some(end) = filter.end {
            builder.push(" AND ts < ").push_bind(end);
        }
        builder.push(" ORDER BY ts, asset_id");
        if let Some(limit) = filter.limit {
            builder.push(" LIMIT ").push_bind(limit as i64);
        }

        let rows = builder
            .build_query_as::<TelemetryReading>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn alerts(&self) -> StoreResult<Vec<Alert>> {
        let rows = sqlx::query_as::<_, Alert>(
            r#"
            SELECT alert_id, asset_id, ts, alert_type, value
            FROM alerts
            ORDER BY alert_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn providers(&self) -> StoreResult<Vec<ServiceProvider>> {
        let rows = sqlx::query_as::<_, ProviderRow>(
            r#"
            SELECT name, provider_type, location[0] AS lon, location[1] AS lat
            FROM service_providers
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ServiceProvider::from).collect())
    }

    async fn electricity_summary(&self) -> StoreResult<ElectricitySummary> {
        aggregation_queries::electricity_summary(&self.pool).await
    }

    async fn electricity_by_asset(&self) -> StoreResult<Vec<AssetTotal>> {
        aggregation_queries::electricity_by_asset(&self.pool).await
    }

    async fn electricity_by_day(&self) -> StoreResult<Vec<DailyTotal>> {
        aggregation_queries::electricity_by_day(&self.pool).await
    }

    async fn top_readings(&self, limit: usize) -> StoreResult<Vec<TelemetryReading>> {
        aggregation_queries::top_readings(&self.pool, limit).await
    }

    async fn scaled_electricity_total(&self, factor: f64) -> StoreResult<f64> {
        aggregation_queries::scaled_electricity_total(&self.pool, factor).await
    }

    async fn nearest_providers(&self, origin: GeoPoint, limit: usize) -> StoreResult<Vec<ProviderDistance>> {
        let rows = aggregation_queries::nearest_providers(&self.pool, origin.lon, origin.lat).await?;
        // Planar degree order from the index is not great-circle order.
        Ok(rank_by_distance(rows.into_iter().map(ServiceProvider::from), origin, limit))
    }

    async fn ensure_spatial_index(&self) -> StoreResult<IndexStatus> {
        if aggregation_queries::has_provider_location_index(&self.pool).await? {
            return Ok(IndexStatus::AlreadyExists);
        }

        sqlx::query("CREATE INDEX IF NOT EXISTS service_providers_location_gist ON service_providers USING gist (location)")
            .execute(&self.pool)
            .await?;
        tracing::info!("created gist index on service_providers.location");

        Ok(IndexStatus::Created)
    }

    async fn insert_sites(&self, sites: &[Site]) -> StoreResult<u64> {
        if sites.is_empty() {
            return Ok(0);
        }

        let mut builder = QueryBuilder::<Postgres>::new("INSERT INTO sites (site_id, name, location) ");
        builder.push_values(sites, |mut b, s| {
            b.push_bind(s.site_id)
                .push_bind(&s.name)
                .push("point(")
                .push_bind_unseparated(s.location.lon)
                .push_unseparated(", ")
                .push_bind_unseparated(s.location.lat)
                .push_unseparated(")");
        });

        let done = builder.build().execute(&self.pool).await?;
        Ok(done.rows_affected())
    }

    async fn insert_assets(&self, assets: &[Asset]) -> StoreResult<u64> {
        if assets.is_empty() {
            return Ok(0);
        }

        let mut builder = QueryBuilder::<Postgres>::new("INSERT INTO assets (asset_id, site_id, asset_type, name) ");
        builder.push_values(assets, |mut b, a| {
            b.push_bind(a.asset_id)
                .push_bind(a.site_id)
                .push_bind(&a.asset_type)
                .push_bind(&a.name);
        });

        let done = builder.build().execute(&self.pool).await?;
        Ok(done.rows_affected())
    }

    async fn insert_telemetry(&self, readings: &[TelemetryReading]) -> StoreResult<u64> {
        let mut inserted = 0;
        for chunk in readings.chunks(MAX_ROWS_PER_INSERT) {
            let mut builder =
                QueryBuilder::<Postgres>::new("INSERT INTO telemetry (ts, asset_id, site_id, value_type, value) ");
            builder.push_values(chunk, |mut b, r| {
                b.push_bind(r.ts)
                    .push_bind(r.asset_id)
                    .push_bind(r.site_id)
                    .push_bind(&r.value_type)
                    .push_bind(r.value);
            });

            inserted += builder.build().execute(&self.pool).await?.rows_affected();
        }
        Ok(inserted)
    }

    async fn insert_waste_logs(&self, logs: &[WasteLog]) -> StoreResult<u64> {
        let mut inserted = 0;
        for chunk in logs.chunks(MAX_ROWS_PER_INSERT) {
            let mut builder =
                QueryBuilder::<Postgres>::new("INSERT INTO waste_logs (site_id, date, waste_type, quantity_kg) ");
            builder.push_values(chunk, |mut b, w| {
                b.push_bind(w.site_id)
                    .push_bind(w.date)
                    .push_bind(&w.waste_type)
                    .push_bind(w.quantity_kg);
            });

            inserted += builder.build().execute(&self.pool).await?.rows_affected();
        }
        Ok(inserted)
    }

    async fn insert_providers(&self, providers: &[ServiceProvider]) -> StoreResult<u64> {
        let mut inserted = 0;
        for p in providers {
            let done = sqlx::query(
                r#"
                INSERT INTO service_providers (name, provider_type, location)
                VALUES ($1, $2, CASE WHEN $3::FLOAT8 IS NULL THEN NULL ELSE point($3, $4) END)
                "#,
            )
            .bind(&p.name)
            .bind(&p.provider_type)
            .bind(p.location.map(|l| l.lon))
            .bind(p.location.map(|l| l.lat))
            .execute(&self.pool)
            .await?;
            inserted += done.rows_affected();
        }
        Ok(inserted)
    }

    async fn insert_alerts(&self, alerts: &[Alert]) -> StoreResult<u64> {
        if alerts.is_empty() {
            return Ok(0);
        }

        let mut builder =
            QueryBuilder::<Postgres>::new("INSERT INTO alerts (alert_id, asset_id, ts, alert_type, value) ");
        builder.push_values(alerts, |mut b, a| {
            b.push_bind(a.alert_id)
                .push_bind(a.asset_id)
                .push_bind(a.ts)
                .push_bind(&a.alert_type)
                .push_bind(a.value);
        });

        let done = builder.build().execute(&self.pool).await?;
        Ok(done.rows_affected())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
