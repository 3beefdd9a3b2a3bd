use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use ecotrack_client::timefmt;
use ecotrack_dashboard::{
    observability,
    seed::{self, SeedOptions},
};
use time::Date;

#[derive(Parser, Debug)]
#[command(name = "generate_dataset")]
#[command(about = "Write a synthetic EcoTrack seed dataset")]
struct Args {
    /// Output directory for the seed files
    #[arg(short, long, default_value = "data")]
    out_dir: PathBuf,

    /// First day of telemetry (YYYY-MM-DD)
    #[arg(long, default_value = "2024-01-01", value_parser = parse_date)]
    start: Date,

    /// Number of days of hourly telemetry
    #[arg(long, default_value = "366")]
    days: u32,

    /// RNG seed; the same seed reproduces the same files
    #[arg(long, default_value = "42")]
    seed: u64,
}

fn parse_date(s: &str) -> Result<Date, String> {
    timefmt::parse_date(s).map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

fn main() -> Result<()> {
    observability::init_tracing();
    let args = Args::parse();

    let dataset = seed::generate(&SeedOptions {
        start: args.start,
        days: args.days,
        rng_seed: args.seed,
    });
    dataset.write_dir(&args.out_dir)?;

    tracing::info!(
        out_dir = %args.out_dir.display(),
        sites = dataset.sites.len(),
        assets = dataset.assets.len(),
        telemetry = dataset.telemetry.len(),
        waste_logs = dataset.waste_logs.len(),
        alerts = dataset.alerts.len(),
        "seed dataset written"
    );

    Ok(())
}
