//! FILENAME: report-export/src/lib.rs
//! PURPOSE: Export of defect trend views to spreadsheet and PDF files.
//! CONTEXT: A `TrendView` is first laid out as an `ExportGrid`; each writer
//! renders that one grid. An empty view is refused before any file exists.

pub mod error;
pub mod grid;
pub mod pdf_writer;
pub mod xlsx_writer;

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use trend_engine::{RateClassifier, TrendView};

pub use error::ExportError;
pub use grid::{palette, CellAlign, CellStyle, ExportGrid, GridCell, GridRow, MergeRegion};
pub use pdf_writer::write_pdf;
pub use xlsx_writer::write_xlsx;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Xlsx,
    Pdf,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Pdf => "pdf",
        }
    }
}

/// A rendered export ready for download or saving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    pub file_name: String,
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
}

impl ExportedFile {
    /// Writes the file into `dir` under its own name and returns the path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)?;
        Ok(path)
    }
}

/// Renders `view` in `format`. `created` is the generation date recorded in
/// the file, which keeps repeated exports byte-identical.
pub fn export(
    view: &TrendView,
    format: ExportFormat,
    classifier: &RateClassifier,
    created: NaiveDate,
) -> Result<ExportedFile, ExportError> {
    let grid = ExportGrid::from_view(view, classifier)?;
    let bytes = match format {
        ExportFormat::Xlsx => write_xlsx(&grid, created)?,
        ExportFormat::Pdf => write_pdf(&grid, created)?,
    };

    let file_name = format!("{}.{}", grid.file_stem, format.extension());
    log::info!(target: "EXPORT", "{}: {} rows, {} bytes", file_name, grid.rows.len(), bytes.len());

    Ok(ExportedFile {
        file_name,
        format,
        bytes,
    })
}

/// Spreadsheet bytes for `view`.
pub fn to_spreadsheet(
    view: &TrendView,
    classifier: &RateClassifier,
    created: NaiveDate,
) -> Result<Vec<u8>, ExportError> {
    export(view, ExportFormat::Xlsx, classifier, created).map(|file| file.bytes)
}

/// Paginated document bytes for `view`.
pub fn to_paginated_document(
    view: &TrendView,
    classifier: &RateClassifier,
    created: NaiveDate,
) -> Result<Vec<u8>, ExportError> {
    export(view, ExportFormat::Pdf, classifier, created).map(|file| file.bytes)
}
