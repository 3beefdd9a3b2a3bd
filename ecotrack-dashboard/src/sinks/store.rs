use std::{sync::Arc, time::Instant};

use ecotrack_client::{domain::TelemetryReading, TelemetryStore};
use futures::StreamExt;

use crate::pipeline::{Envelope, LoadStats, PipelineError, Sink};

/// Batches readings into `TelemetryStore::insert_telemetry`.
///
/// Record-level upstream errors are logged and counted as rejected. A failed
/// batch write aborts the run; there are no retries.
pub struct StoreSink {
    store: Arc<dyn TelemetryStore>,
    batch_size: usize,
}

impl StoreSink {
    pub fn new(store: Arc<dyn TelemetryStore>, batch_size: usize) -> Self {
        Self {
            store,
            batch_size: batch_size.max(1),
        }
    }

    async fn flush_batch(&self, batch: &[TelemetryReading]) -> Result<u64, PipelineError> {
        if batch.is_empty() {
            return Ok(0);
        }

        let started = Instant::now();
        match self.store.insert_telemetry(batch).await {
            Ok(written) => {
                metrics::counter!("loader_rows_written_total").increment(written);
                metrics::histogram!("loader_batch_flush_seconds").record(started.elapsed().as_secs_f64());
                tracing::debug!(rows = written, "flushed telemetry batch");
                Ok(written)
            }
            Err(e) => {
                tracing::error!(error = %e, rows = batch.len(), "telemetry batch write failed");
                metrics::counter!("loader_sink_errors_total").increment(1);
                Err(PipelineError::Sink(e.to_string()))
            }
        }
    }
}

#[async_trait::async_trait]
impl Sink<TelemetryReading> for StoreSink {
    async fn run<S>(&self, mut input: S) -> Result<LoadStats, PipelineError>
    where
        S: futures::Stream<Item = Result<Envelope<TelemetryReading>, PipelineError>> + Send + Unpin + 'static,
    {
        let mut stats = LoadStats::default();
        let mut buffer: Vec<TelemetryReading> = Vec::with_capacity(self.batch_size);

        while let Some(item) = input.next().await {
            let env = match item {
                Ok(env) => env,
                Err(e) if e.is_record_level() => {
                    tracing::warn!(error = %e, "skipping telemetry row");
                    metrics::counter!("loader_rows_rejected_total").increment(1);
                    stats.rejected += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            buffer.push(env.payload);
            if buffer.len() >= self.batch_size {
                stats.written += self.flush_batch(&buffer).await?;
                buffer.clear();
            }
        }

        stats.written += self.flush_batch(&buffer).await?;
        Ok(stats)
    }
}
