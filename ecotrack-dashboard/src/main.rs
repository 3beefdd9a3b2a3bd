use anyhow::Result;
use clap::Parser;
use ecotrack_client::timefmt;
use ecotrack_dashboard::{
    analytics::{forecast::MAX_HORIZON_DAYS, ForecastMethod, ForecastStrategy},
    build_dashboard,
    config::AppConfig,
    metrics_textfile, observability,
    report::{self, ReportFormat},
    store::open_store,
    DashboardFilter, SiteSelector,
};
use time::{Date, OffsetDateTime};

const DEFAULT_WINDOW_DAYS: i64 = 14;

#[derive(Parser, Debug)]
#[command(name = "ecotrack-dashboard")]
#[command(about = "Telemetry dashboard report: usage, emissions, anomalies, forecast and providers")]
struct Args {
    /// Site id, site name, or "All"
    #[arg(long, default_value = "All")]
    site: SiteSelector,

    /// First day of the window (YYYY-MM-DD); defaults to 14 days before --end
    #[arg(long, value_parser = parse_date)]
    start: Option<Date>,

    /// Last day of the window, inclusive (YYYY-MM-DD); defaults to today
    #[arg(long, value_parser = parse_date)]
    end: Option<Date>,

    /// Forecast method; defaults to analytics.forecast_method
    #[arg(long, value_enum)]
    forecast: Option<ForecastMethod>,

    /// Forecast horizon in days; defaults to analytics.forecast_horizon_days
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=MAX_HORIZON_DAYS as i64))]
    horizon: Option<u32>,

    /// Create the provider location index before querying
    #[arg(long)]
    create_index: bool,

    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    format: ReportFormat,
}

fn parse_date(s: &str) -> Result<Date, String> {
    timefmt::parse_date(s).map_err(|e| format!("expected YYYY-MM-DD: {e}"))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    observability::init_tracing();
    let args = Args::parse();
    let cfg = AppConfig::load()?;

    let metrics = cfg.metrics.as_ref().map(metrics_textfile::install).transpose()?;

    let horizon = args.horizon.unwrap_or(cfg.analytics.forecast_horizon_days);
    let mut filter = DashboardFilter::trailing(
        args.end.unwrap_or_else(|| OffsetDateTime::now_utc().date()),
        DEFAULT_WINDOW_DAYS,
        horizon,
    );
    if let Some(start) = args.start {
        filter.start = start;
    }
    if filter.start > filter.end {
        anyhow::bail!("--start {} is after --end {}", filter.start, filter.end);
    }
    filter.site = args.site;
    filter.create_index = args.create_index;

    let strategy = ForecastStrategy::resolve(
        args.forecast.unwrap_or(cfg.analytics.forecast_method),
        cfg.analytics.forecast_window,
    );

    let store = open_store(&cfg.store).await?;
    let built = build_dashboard(store.as_ref(), &filter, &cfg.analytics, strategy).await;
    store.close().await;

    let dashboard = built?;
    println!("{}", report::render(&dashboard, args.format)?);

    if let Some(m) = &metrics {
        m.write()?;
    }

    Ok(())
}
