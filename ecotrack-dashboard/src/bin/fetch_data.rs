use std::io::{self, BufWriter, Write};

use anyhow::Result;
use clap::Parser;
use ecotrack_client::{
    domain::{Alert, Asset, Site, TelemetryReading},
    TelemetryFilter, TelemetryStore,
};
use ecotrack_dashboard::{config::AppConfig, observability, store::open_store};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "fetch_data")]
#[command(about = "Dump sites, assets, telemetry and alerts as JSON lines")]
struct Args {
    /// Maximum number of telemetry readings to print
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Serialize)]
#[serde(tag = "collection", content = "record", rename_all = "snake_case")]
enum Record<'a> {
    Site(&'a Site),
    Asset(&'a Asset),
    Telemetry(&'a TelemetryReading),
    Alert(&'a Alert),
}

fn emit(out: &mut impl Write, record: Record<'_>) -> Result<()> {
    serde_json::to_writer(&mut *out, &record)?;
    writeln!(out)?;
    Ok(())
}

async fn dump(store: &dyn TelemetryStore, limit: Option<usize>, out: &mut impl Write) -> Result<()> {
    for s in store.sites().await? {
        emit(out, Record::Site(&s))?;
    }
    for a in store.assets(None).await? {
        emit(out, Record::Asset(&a))?;
    }
    let filter = TelemetryFilter {
        limit,
        ..TelemetryFilter::default()
    };
    for r in store.telemetry(&filter).await? {
        emit(out, Record::Telemetry(&r))?;
    }
    for a in store.alerts().await? {
        emit(out, Record::Alert(&a))?;
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    observability::init_tracing();
    let args = Args::parse();
    let cfg = AppConfig::load()?;

    let store = open_store(&cfg.store).await?;
    let mut out = BufWriter::new(io::stdout().lock());
    let dumped = dump(store.as_ref(), args.limit, &mut out).await;
    store.close().await;

    dumped?;
    out.flush()?;
    Ok(())
}
