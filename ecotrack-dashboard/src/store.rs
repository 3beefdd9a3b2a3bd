use std::sync::Arc;

use anyhow::Context;
use ecotrack_client::{MemoryStore, PgStore, TelemetryStore};

use crate::config::{StoreConfig, StoreKind};

/// Build the configured store. Callers own it and must `close()` it.
pub async fn open_store(cfg: &StoreConfig) -> anyhow::Result<Arc<dyn TelemetryStore>> {
    match cfg.kind {
        StoreKind::Postgres => {
            let uri = cfg.uri.as_deref().context("store.uri is not set")?;
            let store = PgStore::connect(uri, cfg.max_connections)
                .await
                .context("failed to connect to PostgreSQL")?;
            tracing::info!(max_connections = cfg.max_connections, "connected to PostgreSQL store");
            Ok(Arc::new(store))
        }
        StoreKind::Memory => {
            let dir = cfg.data_dir.as_deref().context("store.data_dir is not set")?;
            let store = MemoryStore::open(dir).with_context(|| format!("failed to load {}", dir.display()))?;
            Ok(Arc::new(store))
        }
    }
}
