//! FILENAME: dashboard/src/source.rs
//! PURPOSE: Where inspection records come from.
//! CONTEXT: The controller only sees the `RecordSource` trait. The HTTP
//! implementation talks to the QC REST API; tests substitute an in-memory one.

use async_trait::async_trait;
use chrono::NaiveDate;
use qc_model::{decode_records, DecodedRecords, Dimension};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use trend_engine::{DateRange, DefectCatalog, Granularity, ReportKind, TrendDefinition};

use crate::config::DashboardConfig;
use crate::error::FetchError;

// ============================================================================
// QUERY
// ============================================================================

/// Server-side filter for one fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchQuery {
    pub report: ReportKind,
    pub granularity: Granularity,
    pub date_range: DateRange,
    pub filters: Vec<(Dimension, String)>,
    pub defect_name: Option<String>,
}

impl FetchQuery {
    /// Query for a definition. Without an explicit range the granularity's
    /// default window ending `today` is used.
    pub fn from_definition(definition: &TrendDefinition, today: NaiveDate) -> Self {
        let date_range = definition
            .date_range
            .unwrap_or_else(|| DateRange::default_for(definition.granularity, today));
        let filters = Dimension::ALL
            .iter()
            .filter_map(|d| definition.filter_value(*d).map(|v| (*d, v.to_string())))
            .collect();

        FetchQuery {
            report: definition.report,
            granularity: definition.granularity,
            date_range,
            filters,
            defect_name: definition
                .defect_filter
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
        }
    }

    /// URL query parameters. Blank filter values are omitted.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("startDate", self.date_range.start.format("%Y-%m-%d").to_string()),
            ("endDate", self.date_range.end.format("%Y-%m-%d").to_string()),
        ];
        for (dimension, value) in &self.filters {
            let value = value.trim();
            if !value.is_empty() {
                params.push((dimension.query_param(), value.to_string()));
            }
        }
        if let Some(name) = &self.defect_name {
            params.push(("defectName", name.clone()));
        }
        params
    }
}

// ============================================================================
// SOURCE TRAIT
// ============================================================================

#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetches the records matching `query`. Malformed records are counted in
    /// the result, never returned as an error.
    async fn fetch(&self, query: &FetchQuery) -> Result<DecodedRecords, FetchError>;

    /// Fetches the defect master list, if this source has one.
    async fn fetch_catalog(&self) -> Result<Option<DefectCatalog>, FetchError> {
        Ok(None)
    }
}

// ============================================================================
// HTTP SOURCE
// ============================================================================

pub struct HttpRecordSource {
    client: Client,
    config: DashboardConfig,
}

impl HttpRecordSource {
    pub fn new(config: DashboardConfig) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(HttpRecordSource { client, config })
    }

    /// Absolute URL of an endpoint path.
    pub fn url_for(&self, path: &str) -> Result<String, FetchError> {
        join_url(&self.config.base_url, path)
    }

    async fn get_text(&self, url: &str, params: &[(&'static str, String)]) -> Result<String, FetchError> {
        let response = self.client.get(url).query(params).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl RecordSource for HttpRecordSource {
    async fn fetch(&self, query: &FetchQuery) -> Result<DecodedRecords, FetchError> {
        let url = self.url_for(self.config.endpoints.path_for(query.report, query.granularity))?;
        let params = query.params();
        log::debug!(target: "FETCH", "GET {} {:?}", url, params);

        let body = self.get_text(&url, &params).await?;
        let decoded = decode_records(&body)?;
        if decoded.skipped > 0 {
            log::warn!(target: "FETCH", "{}: skipped {} malformed records", url, decoded.skipped);
        }
        Ok(decoded)
    }

    async fn fetch_catalog(&self) -> Result<Option<DefectCatalog>, FetchError> {
        let Some(path) = self.config.endpoints.defect_catalog.as_deref() else {
            return Ok(None);
        };
        let url = self.url_for(path)?;
        let body = self.get_text(&url, &[]).await?;
        let catalog: DefectCatalog = serde_json::from_str(&body).map_err(qc_model::RecordError::from)?;
        log::debug!(target: "FETCH", "catalog: {} coded defects", catalog.len());
        Ok(Some(catalog))
    }
}

fn join_url(base: &str, path: &str) -> Result<String, FetchError> {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        return Err(FetchError::InvalidUrl(path.to_string()));
    }
    if path.starts_with("http://") || path.starts_with("https://") {
        return Ok(path.to_string());
    }
    Ok(format!("{}/{}", base, path.trim_start_matches('/')))
}
