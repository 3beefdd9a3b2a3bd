use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use ecotrack_dashboard::{
    config::{AppConfig, StoreKind},
    loader, metrics_textfile, observability,
    store::open_store,
};

#[derive(Parser, Debug)]
#[command(name = "load_dataset")]
#[command(about = "Load seed files into the configured PostgreSQL store")]
struct Args {
    /// Directory written by generate_dataset
    #[arg(default_value = "data")]
    data_dir: PathBuf,

    /// Create the provider location index after loading
    #[arg(long)]
    create_index: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    observability::init_tracing();
    let args = Args::parse();

    // Point ECOTRACK_CONFIG at a loader-specific file if needed.
    let cfg = AppConfig::load()?;
    if cfg.store.kind != StoreKind::Postgres {
        bail!("load_dataset writes to PostgreSQL; the memory store reads seed files directly");
    }

    let metrics = cfg.metrics.as_ref().map(metrics_textfile::install).transpose()?;

    let store = open_store(&cfg.store).await?;
    let loaded = loader::load_dir(store.clone(), &args.data_dir, cfg.loader.batch_size).await;
    let indexed = match (&loaded, args.create_index) {
        (Ok(_), true) => Some(store.ensure_spatial_index().await),
        _ => None,
    };
    store.close().await;

    let summary = loaded?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    if let Some(status) = indexed.transpose()? {
        println!("{status}");
    }

    if let Some(m) = &metrics {
        m.write()?;
    }

    Ok(())
}
