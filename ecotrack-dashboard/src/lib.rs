pub mod analytics;
pub mod config;
pub mod dashboard;
pub mod loader;
pub mod metrics_textfile;
pub mod observability;
pub mod pipeline;
pub mod queries;
pub mod report;
pub mod seed;
pub mod sinks;
pub mod sources;
pub mod store;
pub mod transform;

pub use dashboard::{build_dashboard, Dashboard, DashboardFilter, SiteSelector};
pub use pipeline::{Envelope, Pipeline};
