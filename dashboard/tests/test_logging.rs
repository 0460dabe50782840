//! FILENAME: tests/test_logging.rs
//! PURPOSE: Logging installed from the dashboard configuration.
//! CONTEXT: The global logger can be installed once per process, so this
//! binary holds a single test.

use dashboard_lib::log::{LevelFilter, Log};
use dashboard_lib::{init_logging, log_debug, log_info, log_warn, start, DashboardError};
use trend_engine::{Granularity, ReportKind};

#[tokio::test]
async fn test_start_writes_configured_log_file() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("logs").join("dashboard.log");
    let config_path = dir.path().join("dashboard.json");
    let config = serde_json::json!({
        "logLevel": "debug",
        "logFile": log_path,
    });
    std::fs::write(&config_path, config.to_string()).unwrap();

    let controller = start(&config_path, ReportKind::Sunrise, Granularity::Week).unwrap();
    assert_eq!(controller.config().log_file.as_deref(), Some(log_path.as_path()));

    log_info!("EXPORT", "WeeklyDefectTrend.xlsx written");
    log_debug!("FETCH", "token {} issued", 1);
    log_warn!("FETCH", "discarded stale response");
    dashboard_lib::log::logger().flush();

    let content = std::fs::read_to_string(&log_path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    let installed = format!("|INFO|CONFIG|logging at DEBUG to {}", log_path.display());
    assert!(lines.iter().any(|l| l.ends_with(&installed)));
    assert!(lines.iter().any(|l| l.ends_with("|INFO|EXPORT|WeeklyDefectTrend.xlsx written")));
    assert!(lines.iter().any(|l| l.ends_with("|DEBUG|FETCH|token 1 issued")));
    assert!(lines.iter().any(|l| l.ends_with("|WARN|FETCH|discarded stale response")));

    // Sequence numbers increase line by line
    let seqs: Vec<u64> = lines
        .iter()
        .map(|l| l.split('|').next().unwrap().parse().unwrap())
        .collect();
    assert!(seqs.windows(2).all(|w| w[0] < w[1]));

    // Installed once; a second start keeps the existing logger
    assert!(matches!(init_logging(None, LevelFilter::Info), Err(DashboardError::LoggerInstalled)));
    assert!(start(&dir.path().join("missing.json"), ReportKind::SubCon, Granularity::Day).is_ok());
}
