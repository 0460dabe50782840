//! FILENAME: dashboard/src/config.rs
//! PURPOSE: Dashboard configuration loaded from JSON.
//! CONTEXT: Every field has a default, so an empty object (or no file at all)
//! yields a working configuration against a local API server.

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::LevelFilter;

use qc_model::{Dimension, NormalizeOptions};
use serde::{Deserialize, Serialize};
use trend_engine::{Granularity, RateClassifier, ReportKind, TrendDefinition};

use crate::error::ConfigError;

// ============================================================================
// ENDPOINTS
// ============================================================================

/// Endpoint paths of one report family. Granularities without their own
/// endpoint are served by the daily one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEndpoints {
    pub daily: String,
    #[serde(default)]
    pub weekly: Option<String>,
    #[serde(default)]
    pub monthly: Option<String>,
    #[serde(default)]
    pub yearly: Option<String>,
}

impl ReportEndpoints {
    pub fn path_for(&self, granularity: Granularity) -> &str {
        let specific = match granularity {
            Granularity::Day => None,
            Granularity::Week => self.weekly.as_deref(),
            Granularity::Month => self.monthly.as_deref(),
            Granularity::Year => self.yearly.as_deref(),
        };
        specific.unwrap_or(&self.daily)
    }

    fn sunrise() -> Self {
        ReportEndpoints {
            daily: "/api/sunrise/qc1-data".to_string(),
            weekly: Some("/api/sunrise/qc1-weekly-data".to_string()),
            monthly: None,
            yearly: None,
        }
    }

    fn sub_con() -> Self {
        ReportEndpoints {
            daily: "/api/subcon-qc-dashboard-daily-trend".to_string(),
            weekly: None,
            monthly: Some("/api/subcon-qc-dashboard-monthly-trend".to_string()),
            yearly: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointConfig {
    #[serde(default = "ReportEndpoints::sunrise")]
    pub sunrise: ReportEndpoints,

    #[serde(default = "ReportEndpoints::sub_con")]
    pub sub_con: ReportEndpoints,

    /// Defect master list (`[{defectName, defectCode}]`). Unset means defect
    /// rows are ordered by the codes carried on the records, if any.
    #[serde(default)]
    pub defect_catalog: Option<String>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        EndpointConfig {
            sunrise: ReportEndpoints::sunrise(),
            sub_con: ReportEndpoints::sub_con(),
            defect_catalog: None,
        }
    }
}

impl EndpointConfig {
    pub fn path_for(&self, report: ReportKind, granularity: Granularity) -> &str {
        match report {
            ReportKind::Sunrise => self.sunrise.path_for(granularity),
            ReportKind::SubCon => self.sub_con.path_for(granularity),
        }
    }
}

// ============================================================================
// DASHBOARD CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardConfig {
    pub base_url: String,
    pub endpoints: EndpointConfig,
    pub timeout_secs: u64,
    pub thresholds: RateClassifier,
    pub default_group_by: Vec<Dimension>,
    pub fold_case: bool,
    pub export_dir: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    /// `off`, `error`, `warn`, `info`, `debug` or `trace`.
    pub log_level: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            base_url: "http://localhost:5000".to_string(),
            endpoints: EndpointConfig::default(),
            timeout_secs: 30,
            thresholds: RateClassifier::default(),
            default_group_by: vec![Dimension::Line],
            fold_case: false,
            export_dir: None,
            log_file: None,
            log_level: "info".to_string(),
        }
    }
}

impl DashboardConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: DashboardConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Loads `path` when it exists, otherwise returns the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                field: "baseUrl",
                message: format!("'{}' is not an http(s) URL", self.base_url),
            });
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "timeoutSecs",
                message: "must be at least 1".to_string(),
            });
        }
        for (name, scheme) in [("overall", self.thresholds.overall), ("perDefect", self.thresholds.per_defect)] {
            if !(scheme.high.is_finite() && scheme.mid.is_finite()) || scheme.mid > scheme.high {
                return Err(ConfigError::Invalid {
                    field: "thresholds",
                    message: format!("{} needs finite bounds with mid <= high", name),
                });
            }
        }
        self.log_level_filter()?;
        Ok(())
    }

    pub fn log_level_filter(&self) -> Result<LevelFilter, ConfigError> {
        self.log_level.trim().parse().map_err(|_| ConfigError::Invalid {
            field: "logLevel",
            message: format!("unknown level '{}'", self.log_level),
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Starting definition for a report, carrying the configured grouping,
    /// normalization and thresholds.
    pub fn initial_definition(&self, report: ReportKind, granularity: Granularity) -> TrendDefinition {
        TrendDefinition {
            group_by: self.default_group_by.clone(),
            normalize: NormalizeOptions { fold_case: self.fold_case },
            thresholds: self.thresholds,
            ..TrendDefinition::new(report, granularity)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_yields_defaults() {
        let config = DashboardConfig::from_json("{}").unwrap();
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.default_group_by, vec![Dimension::Line]);
    }

    #[test]
    fn test_endpoint_fallback() {
        let endpoints = EndpointConfig::default();
        assert_eq!(endpoints.path_for(ReportKind::Sunrise, Granularity::Week), "/api/sunrise/qc1-weekly-data");
        assert_eq!(endpoints.path_for(ReportKind::Sunrise, Granularity::Year), "/api/sunrise/qc1-data");
        assert_eq!(
            endpoints.path_for(ReportKind::SubCon, Granularity::Month),
            "/api/subcon-qc-dashboard-monthly-trend"
        );
        assert_eq!(
            endpoints.path_for(ReportKind::SubCon, Granularity::Week),
            "/api/subcon-qc-dashboard-daily-trend"
        );
    }

    #[test]
    fn test_partial_override() {
        let config = DashboardConfig::from_json(
            r#"{"baseUrl": "https://qc.example.com", "timeoutSecs": 5,
                "defaultGroupBy": ["Line", "Buyer"], "foldCase": true,
                "endpoints": {"defectCatalog": "/api/defects"}}"#,
        )
        .unwrap();
        assert_eq!(config.base_url, "https://qc.example.com");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.endpoints.defect_catalog.as_deref(), Some("/api/defects"));
        assert_eq!(config.endpoints.sunrise, ReportEndpoints::sunrise());

        let def = config.initial_definition(ReportKind::Sunrise, Granularity::Day);
        assert_eq!(def.group_by, vec![Dimension::Line, Dimension::Buyer]);
        assert!(def.normalize.fold_case);
    }

    #[test]
    fn test_log_settings() {
        let config = DashboardConfig::from_json(r#"{"logLevel": "Debug", "logFile": "logs/dashboard.log"}"#).unwrap();
        assert_eq!(config.log_level_filter().unwrap(), LevelFilter::Debug);
        assert_eq!(config.log_file, Some(PathBuf::from("logs/dashboard.log")));
        assert_eq!(DashboardConfig::default().log_level_filter().unwrap(), LevelFilter::Info);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            DashboardConfig::from_json(r#"{"baseUrl": "qc.local"}"#),
            Err(ConfigError::Invalid { field: "baseUrl", .. })
        ));
        assert!(matches!(
            DashboardConfig::from_json(r#"{"timeoutSecs": 0}"#),
            Err(ConfigError::Invalid { field: "timeoutSecs", .. })
        ));
        assert!(matches!(
            DashboardConfig::from_json(r#"{"logLevel": "loud"}"#),
            Err(ConfigError::Invalid { field: "logLevel", .. })
        ));
        assert!(matches!(DashboardConfig::from_json("[1, 2]"), Err(ConfigError::Json(_))));
    }
}
