//! FILENAME: trend-engine/src/view.rs
//! Trend View - The renderable output of a pipeline run.
//!
//! Rows hold one cell per time key, aligned with `TrendView::time_keys`.
//! Rates are full precision; rounding happens when a cell becomes text.

use qc_model::Dimension;
use serde::{Deserialize, Serialize};

use crate::definition::ReportKind;
use crate::hierarchy::GroupKey;
use crate::severity::Severity;
use crate::time_key::{Granularity, TimeKey};

pub const GROUP_TOTAL_LABEL: &str = "GROUP TOTAL DHU%";
pub const GRAND_TOTAL_LABEL: &str = "OVERALL TOTAL DHU%";

// ============================================================================
// CELLS
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketCell {
    pub checked_qty: u64,
    pub defect_qty: u64,
    pub rate: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefectCell {
    pub qty: u64,
    pub rate: f64,
}

// ============================================================================
// ROWS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRow {
    pub group_values: GroupKey,
    pub cells: Vec<BucketCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefectRow {
    /// Owning group; carried for merge spans only.
    pub group_values: GroupKey,
    pub defect_name: String,
    pub cells: Vec<DefectCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalRow {
    pub cells: Vec<BucketCell>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RowKind {
    Group,
    Defect,
    GrandTotal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DisplayRow {
    Group(GroupRow),
    Defect(DefectRow),
    GrandTotal(TotalRow),
}

impl DisplayRow {
    pub fn kind(&self) -> RowKind {
        match self {
            DisplayRow::Group(_) => RowKind::Group,
            DisplayRow::Defect(_) => RowKind::Defect,
            DisplayRow::GrandTotal(_) => RowKind::GrandTotal,
        }
    }

    /// Text of the "Defect / Group" column.
    pub fn label(&self) -> &str {
        match self {
            DisplayRow::Group(_) => GROUP_TOTAL_LABEL,
            DisplayRow::Defect(row) => &row.defect_name,
            DisplayRow::GrandTotal(_) => GRAND_TOTAL_LABEL,
        }
    }

    /// Group values; empty for the grand total.
    pub fn group_values(&self) -> &[String] {
        match self {
            DisplayRow::Group(row) => row.group_values.as_slice(),
            DisplayRow::Defect(row) => row.group_values.as_slice(),
            DisplayRow::GrandTotal(_) => &[],
        }
    }

    pub fn bucket_count(&self) -> usize {
        match self {
            DisplayRow::Group(row) => row.cells.len(),
            DisplayRow::Defect(row) => row.cells.len(),
            DisplayRow::GrandTotal(row) => row.cells.len(),
        }
    }

    /// Rate in the bucket at `index`, zero when out of range.
    pub fn rate_at(&self, index: usize) -> f64 {
        match self {
            DisplayRow::Group(row) => row.cells.get(index).map_or(0.0, |c| c.rate),
            DisplayRow::Defect(row) => row.cells.get(index).map_or(0.0, |c| c.rate),
            DisplayRow::GrandTotal(row) => row.cells.get(index).map_or(0.0, |c| c.rate),
        }
    }

    pub fn rates(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.bucket_count()).map(move |i| self.rate_at(i))
    }
}

/// Rows `first_row .. first_row + len` belong to one group: its group row
/// followed by its defect rows. Exporters merge dimension cells over it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSpan {
    pub first_row: usize,
    pub len: usize,
}

impl GroupSpan {
    pub fn contains(&self, row: usize) -> bool {
        row >= self.first_row && row < self.first_row + self.len
    }

    pub fn last_row(&self) -> usize {
        self.first_row + self.len.saturating_sub(1)
    }
}

/// Summary card figures over the whole result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSummary {
    pub checked_qty: u64,
    pub defect_qty: u64,
    pub rate: f64,
    pub severity: Severity,
}

impl Default for TrendSummary {
    fn default() -> Self {
        TrendSummary {
            checked_qty: 0,
            defect_qty: 0,
            rate: 0.0,
            severity: Severity::Low,
        }
    }
}

// ============================================================================
// VIEW
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendView {
    pub report: ReportKind,
    pub granularity: Granularity,
    /// Active grouping dimensions, one leading column each.
    pub dimensions: Vec<Dimension>,
    pub time_keys: Vec<TimeKey>,
    pub time_labels: Vec<String>,
    /// Group blocks followed by the grand total row. Empty when no record
    /// survived filtering and bucketing.
    pub rows: Vec<DisplayRow>,
    pub spans: Vec<GroupSpan>,
    pub summary: TrendSummary,
    /// Records dropped because their timestamp could not be bucketed.
    pub skipped_records: usize,
    /// Records excluded by the definition's filters.
    pub filtered_records: usize,
}

impl TrendView {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn grand_total(&self) -> Option<&TotalRow> {
        match self.rows.last() {
            Some(DisplayRow::GrandTotal(row)) => Some(row),
            _ => None,
        }
    }

    /// Number of group blocks.
    pub fn group_count(&self) -> usize {
        self.spans.len()
    }

    pub fn title(&self) -> String {
        self.report.title(self.granularity)
    }

    pub fn file_stem(&self) -> String {
        self.report.file_stem(self.granularity)
    }

    pub fn sheet_name(&self) -> String {
        self.report.sheet_name(self.granularity)
    }
}
