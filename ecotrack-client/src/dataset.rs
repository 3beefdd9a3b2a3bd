//! Seed files: the flat-file form of every collection.
//!
//! A dataset directory holds `sites.json`, `assets.json`,
//! `service_providers.json` and `alerts.json` (JSON arrays), plus
//! `telemetry.csv` and `waste_logs.csv` with header rows.

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use csv::StringRecord;
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    domain::{Alert, Asset, ServiceProvider, Site, TelemetryReading, WasteLog},
    timefmt,
};

pub const SITES_FILE: &str = "sites.json";
pub const ASSETS_FILE: &str = "assets.json";
pub const TELEMETRY_FILE: &str = "telemetry.csv";
pub const WASTE_FILE: &str = "waste_logs.csv";
pub const PROVIDERS_FILE: &str = "service_providers.json";
pub const ALERTS_FILE: &str = "alerts.json";

/// Column order of `telemetry.csv`.
pub const TELEMETRY_HEADER: [&str; 5] = ["timestamp", "asset_id", "site_id", "value_type", "value"];

#[derive(thiserror::Error, Debug)]
pub enum DatasetError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

/// All seeded collections held in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub sites: Vec<Site>,
    pub assets: Vec<Asset>,
    pub telemetry: Vec<TelemetryReading>,
    pub waste_logs: Vec<WasteLog>,
    pub providers: Vec<ServiceProvider>,
    pub alerts: Vec<Alert>,
}

impl Dataset {
    pub fn read_dir(dir: &Path) -> Result<Self, DatasetError> {
        Ok(Self {
            sites: read_json(&dir.join(SITES_FILE))?,
            assets: read_json(&dir.join(ASSETS_FILE))?,
            telemetry: read_telemetry_csv(&dir.join(TELEMETRY_FILE))?,
            waste_logs: read_waste_csv(&dir.join(WASTE_FILE))?,
            providers: read_json(&dir.join(PROVIDERS_FILE))?,
            alerts: read_json(&dir.join(ALERTS_FILE))?,
        })
    }

    pub fn write_dir(&self, dir: &Path) -> Result<(), DatasetError> {
        std::fs::create_dir_all(dir).map_err(|source| DatasetError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        write_json(&dir.join(SITES_FILE), &self.sites)?;
        write_json(&dir.join(ASSETS_FILE), &self.assets)?;
        write_telemetry_csv(&dir.join(TELEMETRY_FILE), &self.telemetry)?;
        write_waste_csv(&dir.join(WASTE_FILE), &self.waste_logs)?;
        write_json(&dir.join(PROVIDERS_FILE), &self.providers)?;
        write_json(&dir.join(ALERTS_FILE), &self.alerts)?;
        Ok(())
    }
}

fn open(path: &Path) -> Result<File, DatasetError> {
    File::open(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn create(path: &Path) -> Result<File, DatasetError> {
    File::create(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, DatasetError> {
    let file = open(path)?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| DatasetError::Json {
        path: path.to_path_buf(),
        source,
    })
}

pub fn write_json<T: Serialize>(path: &Path, items: &[T]) -> Result<(), DatasetError> {
    let mut out = BufWriter::new(create(path)?);
    serde_json::to_writer_pretty(&mut out, items).map_err(|source| DatasetError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    out.flush().map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse one `telemetry.csv` row, locating columns by header name.
pub fn reading_from_record(record: &StringRecord, headers: &StringRecord) -> Result<TelemetryReading, DatasetError> {
    let get = |name: &str| -> Result<&str, DatasetError> {
        headers
            .iter()
            .position(|h| h == name)
            .and_then(|idx| record.get(idx))
            .map(str::trim)
            .ok_or_else(|| DatasetError::InvalidRecord(format!("missing column '{name}'")))
    };

    let ts_str = get("timestamp")?;
    let ts = timefmt::parse_timestamp(ts_str)
        .map_err(|e| DatasetError::InvalidRecord(format!("invalid timestamp '{ts_str}': {e}")))?;

    let parse_id = |name: &str| -> Result<i64, DatasetError> {
        let raw = get(name)?;
        raw.parse()
            .map_err(|e| DatasetError::InvalidRecord(format!("invalid {name} '{raw}': {e}")))
    };

    let value_str = get("value")?;
    let value: f64 = value_str
        .parse()
        .map_err(|e| DatasetError::InvalidRecord(format!("invalid value '{value_str}': {e}")))?;

    Ok(TelemetryReading {
        ts,
        asset_id: parse_id("asset_id")?,
        site_id: parse_id("site_id")?,
        value_type: get("value_type")?.to_string(),
        value,
    })
}

pub fn read_telemetry_csv(path: &Path) -> Result<Vec<TelemetryReading>, DatasetError> {
    let mut rdr = csv::Reader::from_reader(BufReader::new(open(path)?));
    let headers = rdr.headers()?.clone();

    let mut readings = Vec::new();
    for result in rdr.records() {
        readings.push(reading_from_record(&result?, &headers)?);
    }
    Ok(readings)
}

pub fn write_telemetry_csv(path: &Path, readings: &[TelemetryReading]) -> Result<(), DatasetError> {
    let mut wtr = csv::Writer::from_writer(BufWriter::new(create(path)?));
    wtr.write_record(TELEMETRY_HEADER)?;
    for r in readings {
        wtr.write_record([
            timefmt::format_timestamp(r.ts),
            r.asset_id.to_string(),
            r.site_id.to_string(),
            r.value_type.clone(),
            r.value.to_string(),
        ])?;
    }
    wtr.flush().map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_waste_csv(path: &Path) -> Result<Vec<WasteLog>, DatasetError> {
    let mut rdr = csv::Reader::from_reader(BufReader::new(open(path)?));
    let logs = rdr.deserialize().collect::<Result<Vec<WasteLog>, _>>()?;
    Ok(logs)
}

pub fn write_waste_csv(path: &Path, logs: &[WasteLog]) -> Result<(), DatasetError> {
    let mut wtr = csv::Writer::from_writer(BufWriter::new(create(path)?));
    for log in logs {
        wtr.serialize(log)?;
    }
    wtr.flush().map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{GeoPoint, ELECTRICITY_KWH};
    use time::macros::{date, datetime};

    fn headers() -> StringRecord {
        StringRecord::from(TELEMETRY_HEADER.to_vec())
    }

    #[test]
    fn parses_generated_row() {
        let record = StringRecord::from(vec!["2024-01-01T05:00:00", "101", "1", "electricity_kWh", "21.37"]);
        let r = reading_from_record(&record, &headers()).unwrap();
        assert_eq!(r.ts, datetime!(2024-01-01 05:00:00 UTC));
        assert_eq!(r.asset_id, 101);
        assert_eq!(r.site_id, 1);
        assert!(r.is_electricity());
        assert_eq!(r.value, 21.37);
    }

    #[test]
    fn columns_are_found_by_name() {
        let headers = StringRecord::from(vec!["value", "value_type", "site_id", "asset_id", "timestamp"]);
        let record = StringRecord::from(vec!["3.5", "electricity_kWh", "2", "203", "2024-06-01T12:00:00"]);
        let r = reading_from_record(&record, &headers).unwrap();
        assert_eq!(r.asset_id, 203);
        assert_eq!(r.value, 3.5);
    }

    #[test]
    fn bad_rows_are_rejected_with_context() {
        let record = StringRecord::from(vec!["2024-01-01T05:00:00", "abc", "1", "electricity_kWh", "1.0"]);
        let err = reading_from_record(&record, &headers()).unwrap_err();
        assert!(err.to_string().contains("asset_id"));

        let short = StringRecord::from(vec!["2024-01-01T05:00:00", "101"]);
        assert!(matches!(
            reading_from_record(&short, &headers()),
            Err(DatasetError::InvalidRecord(_))
        ));
    }

    #[test]
    fn dataset_survives_a_trip_through_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let dataset = Dataset {
            sites: vec![Site {
                site_id: 1,
                name: "Raipur Plant".to_string(),
                location: GeoPoint::new(81.6296, 21.2514),
            }],
            assets: vec![Asset {
                asset_id: 101,
                site_id: 1,
                asset_type: "electricity_meter".to_string(),
                name: "Main Meter A".to_string(),
            }],
            telemetry: vec![TelemetryReading {
                ts: datetime!(2024-01-01 00:00:00 UTC),
                asset_id: 101,
                site_id: 1,
                value_type: ELECTRICITY_KWH.to_string(),
                value: 19.25,
            }],
            waste_logs: vec![WasteLog {
                site_id: 1,
                date: date!(2024 - 01 - 01),
                waste_type: "metal".to_string(),
                quantity_kg: 120.5,
            }],
            providers: vec![ServiceProvider {
                name: "Raipur Recycling Center".to_string(),
                provider_type: "recycling".to_string(),
                location: Some(GeoPoint::new(81.63, 21.25)),
            }],
            alerts: vec![Alert {
                alert_id: 8000,
                asset_id: 101,
                ts: datetime!(2024-03-04 00:00:00 UTC),
                alert_type: "anomaly".to_string(),
                value: 42.0,
            }],
        };

        dataset.write_dir(dir.path()).unwrap();
        let back = Dataset::read_dir(dir.path()).unwrap();
        assert_eq!(back, dataset);

        let csv = std::fs::read_to_string(dir.path().join(WASTE_FILE)).unwrap();
        assert!(csv.starts_with("site_id,date,type,quantity_kg\n"));
        let csv = std::fs::read_to_string(dir.path().join(TELEMETRY_FILE)).unwrap();
        assert!(csv.starts_with("timestamp,asset_id,site_id,value_type,value\n2024-01-01T00:00:00,101,1,"));
    }

    #[test]
    fn missing_file_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = Dataset::read_dir(dir.path()).unwrap_err();
        assert!(err.to_string().contains(SITES_FILE));
    }
}
