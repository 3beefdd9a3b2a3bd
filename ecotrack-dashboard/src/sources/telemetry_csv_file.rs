use std::{fs::File, path::PathBuf};

use ecotrack_client::{dataset, domain::TelemetryReading};

use crate::pipeline::{Envelope, EnvelopeStream, PipelineError, Source};

/// `telemetry.csv` source.
///
/// Columns are located by header name (`timestamp`, `asset_id`, `site_id`,
/// `value_type`, `value`). Unparseable rows are yielded as
/// [`PipelineError::Record`] and the stream carries on; a missing or
/// unreadable file ends it with [`PipelineError::Source`].
pub struct TelemetryCsvFileSource {
    path: PathBuf,
}

impl TelemetryCsvFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl Source<TelemetryReading> for TelemetryCsvFileSource {
    async fn stream(&self) -> EnvelopeStream<TelemetryReading> {
        // Blocking reader; seed files are small enough to read inline.
        let path = self.path.clone();
        let s = async_stream::stream! {
            let file = match File::open(&path) {
                Ok(f) => f,
                Err(e) => {
                    yield Err(PipelineError::Source(format!("failed to open {}: {e}", path.display())));
                    return;
                }
            };
            let mut rdr = csv::Reader::from_reader(file);
            let headers = match rdr.headers() {
                Ok(h) => h.clone(),
                Err(e) => {
                    yield Err(PipelineError::Source(format!("failed to read CSV headers: {e}")));
                    return;
                }
            };

            for result in rdr.records() {
                let record = match result {
                    Ok(r) => r,
                    Err(e) => {
                        let line = e.position().map(|p| p.line()).unwrap_or(0);
                        metrics::counter!("telemetry_csv_parse_errors_total").increment(1);
                        yield Err(PipelineError::Record { line, reason: e.to_string() });
                        continue;
                    }
                };
                let line = record.position().map(|p| p.line()).unwrap_or(0);

                match dataset::reading_from_record(&record, &headers) {
                    Ok(payload) => yield Ok(Envelope { payload, line }),
                    Err(e) => {
                        metrics::counter!("telemetry_csv_parse_errors_total").increment(1);
                        yield Err(PipelineError::Record { line, reason: e.to_string() });
                    }
                }
            }
        };

        Box::pin(s)
    }
}
