use crate::pipeline::{Envelope, PipelineError, Transform};
use ecotrack_client::domain::TelemetryReading;
use time::macros::datetime;

/// Pure validation of a `TelemetryReading`.
///
/// Rules:
/// - value must be finite and non-negative.
/// - value_type must be set.
/// - ts must be within [2000-01-01, 2100-01-01].
pub fn validate_reading(env: Envelope<TelemetryReading>) -> Result<Envelope<TelemetryReading>, PipelineError> {
    let r = &env.payload;
    let reject = |reason: &str| PipelineError::Transform {
        line: env.line,
        reason: reason.to_string(),
    };

    if !r.value.is_finite() || r.value < 0.0 {
        return Err(reject("value must be a non-negative number"));
    }

    if r.value_type.trim().is_empty() {
        return Err(reject("value_type must not be empty"));
    }

    let min_ts = datetime!(2000-01-01 00:00:00 UTC);
    let max_ts = datetime!(2100-01-01 00:00:00 UTC);

    if r.ts < min_ts || r.ts > max_ts {
        return Err(reject("timestamp out of allowed range"));
    }

    Ok(env)
}

#[derive(Clone, Default)]
pub struct TelemetryValidation;

#[async_trait::async_trait]
impl Transform<TelemetryReading, TelemetryReading> for TelemetryValidation {
    async fn apply(&self, input: Envelope<TelemetryReading>) -> Result<Envelope<TelemetryReading>, PipelineError> {
        match validate_reading(input) {
            Ok(env) => Ok(env),
            Err(e) => {
                metrics::counter!("validation_telemetry_rejected_total").increment(1);
                Err(e)
            }
        }
    }
}
