use anyhow::Result;
use clap::Parser;
use ecotrack_dashboard::{
    config::AppConfig,
    metrics_textfile, observability, queries,
    report::ReportFormat,
    store::open_store,
};

#[derive(Parser, Debug)]
#[command(name = "aggregation_queries")]
#[command(about = "Run the canned aggregation queries against the configured store")]
struct Args {
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    format: ReportFormat,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    observability::init_tracing();
    let args = Args::parse();
    let cfg = AppConfig::load()?;

    let metrics = cfg.metrics.as_ref().map(metrics_textfile::install).transpose()?;

    let store = open_store(&cfg.store).await?;
    let report = queries::run_queries(
        store.as_ref(),
        cfg.analytics.emission_factor,
        cfg.analytics.nearest_providers,
    )
    .await;
    store.close().await;

    let report = report?;
    match args.format {
        ReportFormat::Text => print!("{}", queries::render_text(&report)?),
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }

    if let Some(m) = &metrics {
        m.write()?;
    }

    Ok(())
}
