//! Prometheus textfile export for short-lived binaries.
//!
//! The recorder collects `metrics` counters for the whole run; the snapshot
//! is written once at exit for a node-exporter textfile collector to pick up.

use std::{fs, path::PathBuf};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::config::MetricsConfig;

pub struct MetricsTextfile {
    handle: PrometheusHandle,
    path: PathBuf,
}

pub fn install(cfg: &MetricsConfig) -> anyhow::Result<MetricsTextfile> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install Prometheus metrics recorder: {e}"))?;

    Ok(MetricsTextfile {
        handle,
        path: cfg.textfile_path.clone(),
    })
}

impl MetricsTextfile {
    pub fn write(&self) -> anyhow::Result<()> {
        fs::write(&self.path, self.handle.render())
            .map_err(|e| anyhow::anyhow!("failed to write metrics to {}: {e}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), "metrics textfile written");
        Ok(())
    }
}
