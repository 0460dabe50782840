//! FILENAME: trend-engine/src/definition.rs
//! Trend Definition - The serializable report configuration.
//!
//! A `TrendDefinition` is an immutable snapshot of what the user asked for:
//! granularity, date window, equality filters and grouping. Every pipeline
//! run is a pure function of (records, definition); controllers replace the
//! definition instead of mutating it.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use qc_model::{normalize_with, Dimension, InspectionRecord, NormalizeOptions};
use serde::{Deserialize, Serialize};

use crate::severity::RateClassifier;
use crate::time_key::{default_window, parse_timestamp, Granularity};

// ============================================================================
// REPORT KIND
// ============================================================================

/// Which trend report family a definition belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReportKind {
    /// In-house sewing lines.
    Sunrise,
    /// Sub-contracted factories.
    SubCon,
}

impl Default for ReportKind {
    fn default() -> Self {
        ReportKind::Sunrise
    }
}

impl ReportKind {
    fn prefix(&self) -> &'static str {
        match self {
            ReportKind::Sunrise => "",
            ReportKind::SubCon => "SubCon",
        }
    }

    /// Export file name without extension, e.g. `WeeklyDefectTrend`.
    pub fn file_stem(&self, granularity: Granularity) -> String {
        format!("{}{}DefectTrend", self.prefix(), granularity.display_name())
    }

    pub fn title(&self, granularity: Granularity) -> String {
        match self {
            ReportKind::Sunrise => format!("{} Defect Trend Analysis", granularity.display_name()),
            ReportKind::SubCon => {
                format!("SubCon {} Defect Trend Analysis", granularity.display_name())
            }
        }
    }

    pub fn sheet_name(&self, granularity: Granularity) -> String {
        match self {
            ReportKind::Sunrise => format!("{} Defect Trend", granularity.display_name()),
            ReportKind::SubCon => format!("SubCon {} Defect Trend", granularity.display_name()),
        }
    }
}

// ============================================================================
// DATE RANGE
// ============================================================================

/// Inclusive calendar date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "DateRangeBounds")]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Bounds as they arrive on the wire, possibly reversed.
#[derive(Deserialize)]
struct DateRangeBounds {
    start: NaiveDate,
    end: NaiveDate,
}

impl From<DateRangeBounds> for DateRange {
    fn from(bounds: DateRangeBounds) -> Self {
        DateRange::new(bounds.start, bounds.end)
    }
}

impl DateRange {
    /// Builds a range, swapping the bounds if they arrive reversed.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            DateRange { start, end }
        } else {
            DateRange { start: end, end: start }
        }
    }

    pub fn default_for(granularity: Granularity, today: NaiveDate) -> Self {
        let (start, end) = default_window(granularity, today);
        DateRange::new(start, end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

// ============================================================================
// ORDERING
// ============================================================================

/// How group rows are ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GroupOrder {
    /// Plain string comparison per component; a prefix sorts first.
    Lexicographic,
    /// Alphanumeric comparison per component (`L2` before `L10`).
    Natural,
}

impl Default for GroupOrder {
    fn default() -> Self {
        GroupOrder::Lexicographic
    }
}

// ============================================================================
// DEFINITION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendDefinition {
    #[serde(default)]
    pub report: ReportKind,

    #[serde(default)]
    pub granularity: Granularity,

    /// Window applied to record dates. `None` accepts every date.
    #[serde(default)]
    pub date_range: Option<DateRange>,

    /// Dimension equality filters. A non-blank filter pins the dimension,
    /// which removes it from grouping.
    #[serde(default)]
    pub filters: BTreeMap<Dimension, String>,

    /// Keep only records that carry this defect name.
    #[serde(default)]
    pub defect_filter: Option<String>,

    /// Dimensions the user asked to group by.
    #[serde(default)]
    pub group_by: Vec<Dimension>,

    #[serde(default)]
    pub normalize: NormalizeOptions,

    #[serde(default)]
    pub group_order: GroupOrder,

    /// Keep only defects ranking in the top N of at least one bucket.
    #[serde(default)]
    pub top_defects: Option<usize>,

    #[serde(default)]
    pub thresholds: RateClassifier,
}

impl TrendDefinition {
    pub fn new(report: ReportKind, granularity: Granularity) -> Self {
        TrendDefinition {
            report,
            granularity,
            ..Default::default()
        }
    }

    pub fn with_group_by(mut self, dimensions: impl IntoIterator<Item = Dimension>) -> Self {
        self.group_by = dimensions.into_iter().collect();
        self
    }

    pub fn with_filter(mut self, dimension: Dimension, value: impl Into<String>) -> Self {
        self.filters.insert(dimension, value.into());
        self
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    pub fn with_defect_filter(mut self, defect_name: impl Into<String>) -> Self {
        self.defect_filter = Some(defect_name.into());
        self
    }

    /// The filter value for a dimension, if it is set and non-blank.
    pub fn filter_value(&self, dimension: Dimension) -> Option<&str> {
        self.filters
            .get(&dimension)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn is_pinned(&self, dimension: Dimension) -> bool {
        self.filter_value(dimension).is_some()
    }

    /// Dimensions that form the group key: requested and not pinned,
    /// in canonical column order.
    pub fn active_dimensions(&self) -> Vec<Dimension> {
        Dimension::ALL
            .iter()
            .copied()
            .filter(|d| self.group_by.contains(d) && !self.is_pinned(*d))
            .collect()
    }

    fn defect_filter_value(&self) -> Option<&str> {
        self.defect_filter
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// Client-side re-check of the server filters.
    ///
    /// Dimension and defect filters compare case-insensitively. A record whose
    /// timestamp cannot be parsed passes the date check; the hierarchy builder
    /// drops and counts it.
    pub fn matches(&self, record: &InspectionRecord) -> bool {
        if let (Some(range), Some(date)) = (
            self.date_range,
            record.timestamp.as_deref().and_then(parse_timestamp),
        ) {
            if !range.contains(date) {
                return false;
            }
        }

        for dimension in Dimension::ALL {
            if let Some(wanted) = self.filter_value(dimension) {
                let actual = normalize_with(record.dimension_value(dimension), self.normalize);
                if !actual.eq_ignore_ascii_case(wanted) {
                    return false;
                }
            }
        }

        match self.defect_filter_value() {
            Some(wanted) => record
                .defects
                .iter()
                .filter_map(|d| d.name())
                .any(|name| name.eq_ignore_ascii_case(wanted)),
            None => true,
        }
    }
}
