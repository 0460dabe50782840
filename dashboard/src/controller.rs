//! FILENAME: dashboard/src/controller.rs
//! PURPOSE: Owns the dashboard state between user actions.
//! CONTEXT: Holds the current definition and the last fetched record set,
//! tags every fetch with a token so late responses cannot overwrite newer
//! ones, caches the projected view, and runs exports off the async executor.
//! Every failure ends up as controller state; nothing escapes as a panic.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Local, NaiveDate};
use qc_model::{DecodedRecords, InspectionRecord};
use report_export::{ExportFormat, ExportedFile};
use serde::{Deserialize, Serialize};
use trend_engine::{DefectCatalog, TrendCalculator, TrendDefinition, TrendView};

use crate::config::DashboardConfig;
use crate::error::{DashboardError, FetchError};
use crate::source::{FetchQuery, RecordSource};
use crate::{log_debug, log_error, log_info, log_warn};

// ============================================================================
// STATUS
// ============================================================================

/// What the screen should show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "camelCase")]
pub enum ControllerStatus {
    /// Nothing fetched yet.
    Idle,
    Loading,
    Ready,
    /// Fetched, but nothing survives the filters.
    Empty,
    Failed(String),
}

/// Result of feeding a fetch completion to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied { records: usize, skipped: usize },
    /// A newer fetch was issued after this one; its result was dropped.
    Discarded,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Idle,
    Loaded,
    Failed(String),
}

struct Memo {
    data_version: u64,
    definition: TrendDefinition,
    view: Arc<TrendView>,
}

struct State {
    definition: TrendDefinition,
    records: Arc<Vec<InspectionRecord>>,
    decode_skipped: usize,
    catalog: Option<DefectCatalog>,
    data_version: u64,
    issued_token: u64,
    in_flight: bool,
    phase: Phase,
    memo: Option<Memo>,
}

// ============================================================================
// EXPORT GUARD
// ============================================================================

/// Marks an export as running until dropped.
pub struct ExportGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for ExportGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

// ============================================================================
// CONTROLLER
// ============================================================================

pub struct PivotController<S: RecordSource> {
    source: Arc<S>,
    config: DashboardConfig,
    state: Mutex<State>,
    exporting: Arc<AtomicBool>,
}

impl<S: RecordSource> PivotController<S> {
    pub fn new(source: S, config: DashboardConfig, definition: TrendDefinition) -> Self {
        PivotController {
            source: Arc::new(source),
            config,
            state: Mutex::new(State {
                definition,
                records: Arc::new(Vec::new()),
                decode_skipped: 0,
                catalog: None,
                data_version: 0,
                issued_token: 0,
                in_flight: false,
                phase: Phase::Idle,
                memo: None,
            }),
            exporting: Arc::new(AtomicBool::new(false)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // State stays consistent across a poisoned lock: every write is a
        // whole-field replacement.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn definition(&self) -> TrendDefinition {
        self.lock().definition.clone()
    }

    /// Replaces the definition. The next fetch and view use it; a fetch
    /// already in flight is superseded once the caller refreshes.
    pub fn set_definition(&self, definition: TrendDefinition) {
        self.lock().definition = definition;
    }

    pub fn update_definition(&self, update: impl FnOnce(&mut TrendDefinition)) {
        update(&mut self.lock().definition);
    }

    pub fn status(&self) -> ControllerStatus {
        let phase = {
            let state = self.lock();
            if state.in_flight {
                return ControllerStatus::Loading;
            }
            state.phase.clone()
        };
        match phase {
            Phase::Idle => ControllerStatus::Idle,
            Phase::Failed(message) => ControllerStatus::Failed(message),
            Phase::Loaded if self.view().is_empty() => ControllerStatus::Empty,
            Phase::Loaded => ControllerStatus::Ready,
        }
    }

    /// Records dropped while decoding the last response.
    pub fn decode_skipped(&self) -> usize {
        self.lock().decode_skipped
    }

    pub fn record_count(&self) -> usize {
        self.lock().records.len()
    }

    // ------------------------------------------------------------------------
    // Fetching
    // ------------------------------------------------------------------------

    /// Issues a new fetch token and the query for the current definition.
    pub fn begin_fetch(&self, today: NaiveDate) -> (u64, FetchQuery) {
        let mut state = self.lock();
        state.issued_token += 1;
        state.in_flight = true;
        let token = state.issued_token;
        let query = FetchQuery::from_definition(&state.definition, today);
        log_debug!("FETCH", "token {} issued for {:?} {:?}", token, query.report, query.granularity);
        (token, query)
    }

    /// Applies a fetch result, unless a newer token has been issued since.
    pub fn complete_fetch(&self, token: u64, result: Result<DecodedRecords, FetchError>) -> FetchOutcome {
        let mut state = self.lock();
        if token != state.issued_token {
            log_warn!("FETCH", "discarded stale response for token {} (latest {})", token, state.issued_token);
            return FetchOutcome::Discarded;
        }

        state.in_flight = false;
        state.data_version += 1;
        state.memo = None;

        match result {
            Ok(decoded) => {
                let records = decoded.records.len();
                let skipped = decoded.skipped;
                log_info!("FETCH", "token {}: {} records, {} skipped", token, records, skipped);
                state.records = Arc::new(decoded.records);
                state.decode_skipped = skipped;
                state.phase = Phase::Loaded;
                FetchOutcome::Applied { records, skipped }
            }
            Err(err) => {
                let message = err.to_string();
                log_error!("FETCH", "token {} failed: {}", token, message);
                state.records = Arc::new(Vec::new());
                state.decode_skipped = 0;
                state.phase = Phase::Failed(message.clone());
                FetchOutcome::Failed(message)
            }
        }
    }

    /// Fetches records for the current definition and applies them.
    pub async fn refresh(&self) -> FetchOutcome {
        self.refresh_as_of(Local::now().date_naive()).await
    }

    pub async fn refresh_as_of(&self, today: NaiveDate) -> FetchOutcome {
        let (token, query) = self.begin_fetch(today);
        let result = self.source.fetch(&query).await;
        self.complete_fetch(token, result)
    }

    /// Loads the defect master list. A failure keeps the current catalog.
    pub async fn load_catalog(&self) -> bool {
        match self.source.fetch_catalog().await {
            Ok(catalog) => {
                let loaded = catalog.is_some();
                let mut state = self.lock();
                state.catalog = catalog;
                state.memo = None;
                loaded
            }
            Err(err) => {
                log_warn!("FETCH", "defect catalog unavailable: {}", err);
                false
            }
        }
    }

    // ------------------------------------------------------------------------
    // View
    // ------------------------------------------------------------------------

    /// The projected view for the current records and definition.
    /// Recomputed only when either has changed since the last call.
    pub fn view(&self) -> Arc<TrendView> {
        let mut state = self.lock();
        if let Some(memo) = &state.memo {
            if memo.data_version == state.data_version && memo.definition == state.definition {
                return Arc::clone(&memo.view);
            }
        }

        let calculator = TrendCalculator::new(&state.definition);
        let calculator = match &state.catalog {
            Some(catalog) => calculator.with_catalog(catalog),
            None => calculator,
        };
        let view = Arc::new(calculator.calculate(&state.records));

        let memo = Memo {
            data_version: state.data_version,
            definition: state.definition.clone(),
            view: Arc::clone(&view),
        };
        state.memo = Some(memo);
        view
    }

    // ------------------------------------------------------------------------
    // Export
    // ------------------------------------------------------------------------

    pub fn is_exporting(&self) -> bool {
        self.exporting.load(Ordering::SeqCst)
    }

    /// Whether the export trigger should be enabled.
    pub fn can_export(&self) -> bool {
        !self.is_exporting() && self.status() == ControllerStatus::Ready
    }

    /// Claims the export slot, or fails if an export is already running.
    pub fn try_begin_export(&self) -> Result<ExportGuard, DashboardError> {
        self.exporting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| DashboardError::ExportRunning)?;
        Ok(ExportGuard {
            flag: Arc::clone(&self.exporting),
        })
    }

    pub async fn export(&self, format: ExportFormat) -> Result<ExportedFile, DashboardError> {
        self.export_dated(format, Local::now().date_naive(), None).await
    }

    /// Exports and writes the file into `dir`, or the configured export
    /// directory when `dir` is `None`.
    pub async fn export_to_dir(&self, format: ExportFormat, dir: Option<&Path>) -> Result<PathBuf, DashboardError> {
        let dir = dir
            .map(Path::to_path_buf)
            .or_else(|| self.config.export_dir.clone())
            .ok_or_else(|| DashboardError::ExportUnavailable("no export directory configured".to_string()))?;
        let file = self.export_dated(format, Local::now().date_naive(), Some(dir.clone())).await?;
        Ok(dir.join(file.file_name))
    }

    /// Renders the current view on a blocking worker. `created` is stamped
    /// into the file; with `dir` the file is also written there.
    pub async fn export_dated(
        &self,
        format: ExportFormat,
        created: NaiveDate,
        dir: Option<PathBuf>,
    ) -> Result<ExportedFile, DashboardError> {
        if let Phase::Failed(message) = &self.lock().phase {
            return Err(DashboardError::ExportUnavailable(message.clone()));
        }

        let guard = self.try_begin_export()?;
        let view = self.view();
        let classifier = self.lock().definition.thresholds;
        log_info!("EXPORT", "starting {} export of {} rows", format.extension(), view.rows.len());

        let task = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            let file = report_export::export(&view, format, &classifier, created)?;
            if let Some(dir) = dir {
                file.write_to(&dir)?;
            }
            Ok::<_, DashboardError>(file)
        });

        match task.await {
            Ok(result) => {
                if let Err(err) = &result {
                    log_error!("EXPORT", "{} export failed: {}", format.extension(), err);
                }
                result
            }
            Err(join) => Err(DashboardError::Worker(join.to_string())),
        }
    }
}
