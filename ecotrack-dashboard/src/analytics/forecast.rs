//! Short-horizon forecasts of the daily electricity series.
//!
//! The method is picked in configuration ([`ForecastMethod`]) and resolved
//! once into a [`ForecastStrategy`]. The seasonal strategy only exists when
//! the crate is built with the `seasonal` feature; without it the request
//! resolves to the moving-average baseline.

use ecotrack_client::rollup::DailyTotal;
use serde::{Deserialize, Serialize};
use time::{Date, Duration};

pub const MAX_HORIZON_DAYS: u32 = 90;

#[cfg(feature = "seasonal")]
const WEEKLY_SEASON: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMethod {
    #[default]
    #[value(name = "moving_average")]
    MovingAverage,
    Seasonal,
}

#[derive(thiserror::Error, Debug)]
pub enum ForecastError {
    #[error("forecast model failed: {0}")]
    Model(String),
    #[error("need at least {need} days of history for a seasonal fit, have {have}")]
    TooShort { have: usize, need: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastStrategy {
    /// Trailing mean (minimum one period) repeated flat over the horizon.
    MovingAverage { window: usize },
    /// Weekly-seasonal decomposition with an exponential-smoothing trend.
    #[cfg(feature = "seasonal")]
    Seasonal { season_length: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    #[serde(with = "ecotrack_client::timefmt::day")]
    pub date: Date,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Forecast {
    pub method: String,
    pub points: Vec<ForecastPoint>,
}

impl ForecastStrategy {
    pub fn resolve(method: ForecastMethod, window: usize) -> Self {
        match method {
            ForecastMethod::MovingAverage => Self::MovingAverage { window },
            #[cfg(feature = "seasonal")]
            ForecastMethod::Seasonal => Self::Seasonal {
                season_length: WEEKLY_SEASON,
            },
            #[cfg(not(feature = "seasonal"))]
            ForecastMethod::Seasonal => {
                tracing::warn!("seasonal forecasting not compiled in, using moving average");
                Self::MovingAverage { window }
            }
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::MovingAverage { window } => format!("{window}-day moving average"),
            #[cfg(feature = "seasonal")]
            Self::Seasonal { season_length } => format!("seasonal (period {season_length}, ETS trend)"),
        }
    }

    /// Forecast `horizon` days following the last date of `series`.
    ///
    /// `series` must be ordered by date. An empty series gives an empty
    /// forecast.
    pub fn forecast(&self, series: &[DailyTotal], horizon: u32) -> Result<Forecast, ForecastError> {
        let Some(last) = series.last() else {
            return Ok(Forecast {
                method: self.label(),
                points: Vec::new(),
            });
        };

        let values: Vec<f64> = series.iter().map(|d| d.total_kwh).collect();
        let horizon = horizon.clamp(1, MAX_HORIZON_DAYS) as usize;

        let predicted = match self {
            Self::MovingAverage { window } => {
                let level = trailing_moving_average(&values, *window).last().copied().unwrap_or(0.0);
                vec![level; horizon]
            }
            #[cfg(feature = "seasonal")]
            Self::Seasonal { season_length } => seasonal_forecast(&values, *season_length, horizon)?,
        };

        Ok(Forecast {
            method: self.label(),
            points: future_dates(last.date, horizon)
                .zip(predicted)
                .map(|(date, value)| ForecastPoint { date, value })
                .collect(),
        })
    }
}

/// Rolling mean over the trailing `window` values with a minimum of one
/// period, so early positions average whatever is available.
pub fn trailing_moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            let from = (i + 1).saturating_sub(window);
            let slice = &values[from..=i];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

fn future_dates(last: Date, horizon: usize) -> impl Iterator<Item = Date> {
    (1..=horizon as i64).map(move |d| last + Duration::days(d))
}

#[cfg(feature = "seasonal")]
fn seasonal_forecast(values: &[f64], season_length: usize, horizon: usize) -> Result<Vec<f64>, ForecastError> {
    use augurs::{ets::AutoETS, mstl::MSTLModel, prelude::*};

    // Two full periods before the decomposition is meaningful.
    let need = season_length.max(1) * 2;
    if values.len() < need {
        return Err(ForecastError::TooShort {
            have: values.len(),
            need,
        });
    }

    let trend = AutoETS::non_seasonal().into_trend_model();
    let model = MSTLModel::new(vec![season_length], trend);
    let fitted = model.fit(values).map_err(|e| ForecastError::Model(e.to_string()))?;
    let forecast = fitted
        .predict(horizon, 0.95)
        .map_err(|e| ForecastError::Model(e.to_string()))?;

    Ok(forecast.point)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    fn daily(values: &[f64]) -> Vec<DailyTotal> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| DailyTotal {
                date: date!(2024 - 01 - 01) + Duration::days(i as i64),
                total_kwh: *v,
            })
            .collect()
    }

    #[test]
    fn moving_average_of_last_three_days_is_repeated() {
        let strategy = ForecastStrategy::MovingAverage { window: 3 };
        for horizon in [1, 7, 14] {
            let forecast = strategy.forecast(&daily(&[4.0, 6.0, 5.0]), horizon).unwrap();
            assert_eq!(forecast.points.len(), horizon as usize);
            assert!(forecast.points.iter().all(|p| p.value == 5.0));
        }
    }

    #[test]
    fn forecast_starts_the_day_after_the_series() {
        let strategy = ForecastStrategy::MovingAverage { window: 3 };
        let forecast = strategy.forecast(&daily(&[4.0, 6.0, 5.0]), 2).unwrap();
        assert_eq!(forecast.points[0].date, date!(2024 - 01 - 04));
        assert_eq!(forecast.points[1].date, date!(2024 - 01 - 05));
        assert_eq!(forecast.method, "3-day moving average");
    }

    #[test]
    fn short_series_uses_available_periods() {
        assert_eq!(trailing_moving_average(&[4.0, 6.0, 5.0, 9.0], 3), vec![4.0, 5.0, 5.0, 20.0 / 3.0]);
        let forecast = ForecastStrategy::MovingAverage { window: 3 }
            .forecast(&daily(&[8.0]), 3)
            .unwrap();
        assert!(forecast.points.iter().all(|p| p.value == 8.0));
    }

    #[test]
    fn empty_series_gives_empty_forecast() {
        let forecast = ForecastStrategy::MovingAverage { window: 3 }.forecast(&[], 14).unwrap();
        assert!(forecast.points.is_empty());
    }

    #[test]
    fn horizon_is_clamped() {
        let strategy = ForecastStrategy::MovingAverage { window: 3 };
        assert_eq!(strategy.forecast(&daily(&[1.0]), 0).unwrap().points.len(), 1);
        assert_eq!(strategy.forecast(&daily(&[1.0]), 365).unwrap().points.len(), 90);
    }

    #[test]
    fn moving_average_method_resolves_to_itself() {
        assert_eq!(
            ForecastStrategy::resolve(ForecastMethod::MovingAverage, 3),
            ForecastStrategy::MovingAverage { window: 3 }
        );
    }

    #[cfg(not(feature = "seasonal"))]
    #[test]
    fn seasonal_without_capability_falls_back() {
        assert_eq!(
            ForecastStrategy::resolve(ForecastMethod::Seasonal, 3),
            ForecastStrategy::MovingAverage { window: 3 }
        );
    }

    #[cfg(feature = "seasonal")]
    #[test]
    fn seasonal_forecast_covers_horizon() {
        let values: Vec<f64> = (0..56).map(|i| 100.0 + 10.0 * ((i % 7) as f64)).collect();
        let strategy = ForecastStrategy::resolve(ForecastMethod::Seasonal, 3);
        let forecast = strategy.forecast(&daily(&values), 14).unwrap();
        assert_eq!(forecast.points.len(), 14);
        assert!(forecast.points.iter().all(|p| p.value.is_finite()));
    }

    #[cfg(feature = "seasonal")]
    #[test]
    fn seasonal_needs_two_periods() {
        let strategy = ForecastStrategy::Seasonal { season_length: 7 };
        let err = strategy.forecast(&daily(&[1.0, 2.0, 3.0]), 5).unwrap_err();
        assert!(matches!(err, ForecastError::TooShort { have: 3, need: 14 }));
    }
}
