//! FILENAME: dashboard/src/lib.rs
//! PURPOSE: Dashboard controller for the defect trend reports.
//! CONTEXT: Ties the record source, the trend engine and the exporters
//! together behind `PivotController`, which a UI layer drives.

pub mod config;
pub mod controller;
pub mod error;
pub mod logging;
pub mod source;

pub use config::{DashboardConfig, EndpointConfig, ReportEndpoints};
pub use controller::{ControllerStatus, ExportGuard, FetchOutcome, PivotController};
pub use error::{ConfigError, DashboardError, FetchError};
pub use logging::{init_from_config, init_logging, next_seq};
pub use source::{FetchQuery, HttpRecordSource, RecordSource};

// The logging macros expand to `$crate::log::...`.
#[doc(hidden)]
pub use log;

/// Builds an HTTP-backed controller from a configuration, with the
/// configured default grouping.
pub fn http_controller(
    config: DashboardConfig,
    report: trend_engine::ReportKind,
    granularity: trend_engine::Granularity,
) -> Result<PivotController<HttpRecordSource>, DashboardError> {
    config.validate()?;
    let definition = config.initial_definition(report, granularity);
    let source = HttpRecordSource::new(config.clone())?;
    Ok(PivotController::new(source, config, definition))
}

/// Loads the configuration at `config_path` (defaults when absent), installs
/// the configured logging and builds the HTTP-backed controller. A logger
/// installed earlier in the process is kept.
pub fn start(
    config_path: &std::path::Path,
    report: trend_engine::ReportKind,
    granularity: trend_engine::Granularity,
) -> Result<PivotController<HttpRecordSource>, DashboardError> {
    let config = DashboardConfig::load_or_default(config_path)?;
    match init_from_config(&config) {
        Ok(()) | Err(DashboardError::LoggerInstalled) => {}
        Err(err) => return Err(err),
    }
    crate::log_info!("CONFIG", "dashboard against {} ({:?} {:?})", config.base_url, report, granularity);
    http_controller(config, report, granularity)
}
