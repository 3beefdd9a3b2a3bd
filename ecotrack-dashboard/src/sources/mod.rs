pub mod telemetry_csv_file;

pub use telemetry_csv_file::TelemetryCsvFileSource;
