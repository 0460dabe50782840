//! FILENAME: tests/test_controller.rs
//! PURPOSE: Controller behavior against an in-memory record source.

mod common;

use std::sync::Arc;

use chrono::NaiveDate;
use common::{line_record, sample_records, FakeSource};
use dashboard_lib::{
    http_controller, ControllerStatus, DashboardConfig, DashboardError, FetchOutcome, PivotController,
};
use qc_model::Dimension;
use report_export::{ExportError, ExportFormat};
use trend_engine::{DefectCatalog, Granularity, ReportKind, RowKind, TrendDefinition};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
}

fn weekly_by_line() -> TrendDefinition {
    TrendDefinition::new(ReportKind::Sunrise, Granularity::Week).with_group_by([Dimension::Line])
}

fn controller_with(source: FakeSource) -> PivotController<FakeSource> {
    PivotController::new(source, DashboardConfig::default(), weekly_by_line())
}

// ============================================================================
// FETCH
// ============================================================================

#[tokio::test]
async fn test_refresh_populates_view() {
    let controller = controller_with(FakeSource::new(sample_records()));
    assert_eq!(controller.status(), ControllerStatus::Idle);

    let outcome = controller.refresh_as_of(today()).await;
    assert_eq!(outcome, FetchOutcome::Applied { records: 3, skipped: 0 });
    assert_eq!(controller.status(), ControllerStatus::Ready);

    let view = controller.view();
    assert_eq!(view.group_count(), 2);
    assert_eq!(view.rows.last().map(|r| r.kind()), Some(RowKind::GrandTotal));
}

#[tokio::test]
async fn test_late_response_does_not_overwrite_newer() {
    let controller = Arc::new(controller_with(FakeSource::new(sample_records())));

    controller.update_definition(|d| d.defect_filter = Some("slow".to_string()));
    let slow = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.refresh_as_of(today()).await })
    };
    controller.source().started.notified().await;

    controller.update_definition(|d| d.defect_filter = None);
    let fresh = controller.refresh_as_of(today()).await;
    assert_eq!(fresh, FetchOutcome::Applied { records: 3, skipped: 0 });

    controller.source().release.notify_one();
    assert_eq!(slow.await.unwrap(), FetchOutcome::Discarded);
    assert_eq!(controller.record_count(), 3);
    assert_eq!(controller.status(), ControllerStatus::Ready);
}

#[tokio::test]
async fn test_failure_clears_data_until_refetch() {
    let controller = controller_with(FakeSource::new(sample_records()));
    controller.refresh_as_of(today()).await;

    controller.source().fail_with("connection refused");
    let outcome = controller.refresh_as_of(today()).await;
    assert!(matches!(outcome, FetchOutcome::Failed(ref m) if m.contains("connection refused")));
    assert_eq!(controller.record_count(), 0);
    assert!(matches!(controller.status(), ControllerStatus::Failed(_)));
    assert!(!controller.can_export());

    let err = controller.export_dated(ExportFormat::Pdf, today(), None).await.unwrap_err();
    assert!(matches!(err, DashboardError::ExportUnavailable(_)));

    controller.source().respond_with(sample_records());
    controller.refresh_as_of(today()).await;
    assert!(controller.can_export());
}

#[tokio::test]
async fn test_empty_result_is_a_valid_state() {
    let controller = controller_with(FakeSource::new(Vec::new()));
    controller.refresh_as_of(today()).await;
    assert_eq!(controller.status(), ControllerStatus::Empty);
    assert!(controller.view().rows.is_empty());

    let err = controller.export_dated(ExportFormat::Xlsx, today(), None).await.unwrap_err();
    assert!(matches!(err, DashboardError::Export(ExportError::NoData)));
    assert!(!controller.is_exporting());
}

// ============================================================================
// VIEW
// ============================================================================

#[tokio::test]
async fn test_view_reused_until_inputs_change() {
    let controller = controller_with(FakeSource::new(sample_records()));
    controller.refresh_as_of(today()).await;

    let first = controller.view();
    assert!(Arc::ptr_eq(&first, &controller.view()));

    // Pinning the line removes it from the group key
    controller.update_definition(|d| {
        d.filters.insert(Dimension::Line, "L1".to_string());
    });
    let pinned = controller.view();
    assert!(pinned.dimensions.is_empty());
    assert_eq!(pinned.group_count(), 1);

    // A refetch of identical data is a new data version
    controller.update_definition(|d| d.filters.clear());
    controller.refresh_as_of(today()).await;
    let again = controller.view();
    assert!(!Arc::ptr_eq(&first, &again));
    assert_eq!(*first, *again);
}

#[tokio::test]
async fn test_catalog_orders_defect_rows() {
    let mut catalog = DefectCatalog::new();
    catalog.insert("Pleat", "1");
    catalog.insert("Open Seam", "2");
    let mut source = FakeSource::new(vec![line_record(
        "2024-03-25",
        "L1",
        100,
        &[("Dirty Mark", 1), ("Open Seam", 2), ("Pleat", 1)],
    )]);
    source.catalog = Some(catalog);

    let controller = controller_with(source);
    assert!(controller.load_catalog().await);
    controller.refresh_as_of(today()).await;

    let labels: Vec<String> = controller.view().rows[1..4].iter().map(|r| r.label().to_string()).collect();
    assert_eq!(labels, vec!["Pleat", "Open Seam", "Dirty Mark"]);
}

// ============================================================================
// EXPORT
// ============================================================================

#[tokio::test]
async fn test_export_runs_on_worker() {
    let controller = controller_with(FakeSource::new(sample_records()));
    controller.refresh_as_of(today()).await;

    let file = controller.export_dated(ExportFormat::Xlsx, today(), None).await.unwrap();
    assert_eq!(file.file_name, "WeeklyDefectTrend.xlsx");
    assert!(file.bytes.starts_with(b"PK"));
    assert!(!controller.is_exporting());
}

#[tokio::test]
async fn test_second_export_while_running_is_refused() {
    let controller = controller_with(FakeSource::new(sample_records()));
    controller.refresh_as_of(today()).await;

    let guard = controller.try_begin_export().unwrap();
    assert!(!controller.can_export());
    let err = controller.export_dated(ExportFormat::Pdf, today(), None).await.unwrap_err();
    assert!(matches!(err, DashboardError::ExportRunning));
    drop(guard);

    assert!(controller.export_dated(ExportFormat::Pdf, today(), None).await.is_ok());
}

#[tokio::test]
async fn test_export_to_dir() {
    let dir = tempfile::tempdir().unwrap();
    let controller = controller_with(FakeSource::new(sample_records()));
    controller.refresh_as_of(today()).await;

    let path = controller.export_to_dir(ExportFormat::Pdf, Some(dir.path())).await.unwrap();
    assert_eq!(path, dir.path().join("WeeklyDefectTrend.pdf"));
    assert!(std::fs::read(&path).unwrap().starts_with(b"%PDF-1.4"));

    // No directory given and none configured
    let err = controller.export_to_dir(ExportFormat::Pdf, None).await.unwrap_err();
    assert!(matches!(err, DashboardError::ExportUnavailable(_)));
}

#[tokio::test]
async fn test_http_controller_validates_config() {
    let config = DashboardConfig {
        base_url: "ftp://qc.local".to_string(),
        ..DashboardConfig::default()
    };
    let err = http_controller(config, ReportKind::Sunrise, Granularity::Day).err().unwrap();
    assert!(matches!(err, DashboardError::Config(_)));

    let controller = http_controller(DashboardConfig::default(), ReportKind::SubCon, Granularity::Month).unwrap();
    assert_eq!(controller.definition().group_by, vec![Dimension::Line]);
    assert_eq!(controller.status(), ControllerStatus::Idle);
}
