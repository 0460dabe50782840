//! FILENAME: tests/common/mod.rs
//! PURPOSE: In-memory record source for controller tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use dashboard_lib::{FetchError, FetchQuery, RecordSource};
use qc_model::{DecodedRecords, Dimension, InspectionRecord};
use tokio::sync::Notify;
use trend_engine::DefectCatalog;

/// Serves canned responses keyed by the defect filter of the query.
/// A query whose defect filter is `"slow"` parks until `release` is notified.
pub struct FakeSource {
    pub fast: Mutex<Result<DecodedRecords, String>>,
    pub slow: DecodedRecords,
    pub catalog: Option<DefectCatalog>,
    pub started: Notify,
    pub release: Notify,
    pub calls: AtomicUsize,
}

impl FakeSource {
    pub fn new(records: Vec<InspectionRecord>) -> Self {
        FakeSource {
            fast: Mutex::new(Ok(DecodedRecords { records, skipped: 0 })),
            slow: DecodedRecords::default(),
            catalog: None,
            started: Notify::new(),
            release: Notify::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn fail_with(&self, message: &str) {
        *self.fast.lock().unwrap() = Err(message.to_string());
    }

    pub fn respond_with(&self, records: Vec<InspectionRecord>) {
        *self.fast.lock().unwrap() = Ok(DecodedRecords { records, skipped: 0 });
    }
}

#[async_trait]
impl RecordSource for FakeSource {
    async fn fetch(&self, query: &FetchQuery) -> Result<DecodedRecords, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if query.defect_name.as_deref() == Some("slow") {
            self.started.notify_one();
            self.release.notified().await;
            return Ok(self.slow.clone());
        }
        match &*self.fast.lock().unwrap() {
            Ok(decoded) => Ok(decoded.clone()),
            Err(message) => Err(FetchError::InvalidUrl(message.clone())),
        }
    }

    async fn fetch_catalog(&self) -> Result<Option<DefectCatalog>, FetchError> {
        Ok(self.catalog.clone())
    }
}

pub fn line_record(date: &str, line: &str, checked: u64, defects: &[(&str, u64)]) -> InspectionRecord {
    let total: u64 = defects.iter().map(|(_, q)| q).sum();
    defects.iter().fold(
        InspectionRecord::new(date, checked, total).with_dimension(Dimension::Line, line),
        |record, (name, qty)| record.with_defect(*name, *qty),
    )
}

pub fn sample_records() -> Vec<InspectionRecord> {
    vec![
        line_record("2024-03-25", "L1", 100, &[("Open Seam", 3), ("Pleat", 1)]),
        line_record("2024-03-26", "L1", 120, &[("Dirty Mark", 2)]),
        line_record("2024-03-27", "L2", 80, &[("Open Seam", 4)]),
    ]
}
