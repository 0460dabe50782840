//! FILENAME: trend-engine/src/engine.rs
//! Trend Engine - Turns inspection records into a renderable `TrendView`.
//!
//! Algorithm:
//! 1. Re-check the definition's filters and fold the surviving records into
//!    a hierarchy (group -> time bucket -> totals)
//! 2. Order group nodes and, within each group, its defect names
//! 3. Emit one group row and one row per defect for every group, recording
//!    the row span of each block as it is emitted
//! 4. Append the grand total row, computed from raw accumulators
//! 5. Summarize the whole result for the overall card

use std::cmp::Ordering;
use std::collections::BTreeSet;

use qc_model::InspectionRecord;

use crate::catalog::DefectCatalog;
use crate::definition::{GroupOrder, TrendDefinition};
use crate::hierarchy::{defect_rate, HierarchyBuilder, HierarchyNode};
use crate::severity::RateContext;
use crate::sort::natural_cmp_keys;
use crate::time_key::TimeKey;
use crate::view::{
    BucketCell, DefectCell, DefectRow, DisplayRow, GroupRow, GroupSpan, TotalRow, TrendSummary,
    TrendView,
};

// ============================================================================
// ROW PROJECTOR
// ============================================================================

/// Rows plus the span of every group block within them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    pub rows: Vec<DisplayRow>,
    pub spans: Vec<GroupSpan>,
}

/// Flattens hierarchy nodes into ordered display rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowProjector<'a> {
    group_order: GroupOrder,
    top_defects: Option<usize>,
    catalog: Option<&'a DefectCatalog>,
}

impl<'a> RowProjector<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn group_order(mut self, order: GroupOrder) -> Self {
        self.group_order = order;
        self
    }

    pub fn top_defects(mut self, limit: Option<usize>) -> Self {
        self.top_defects = limit;
        self
    }

    pub fn catalog(mut self, catalog: Option<&'a DefectCatalog>) -> Self {
        self.catalog = catalog.filter(|c| !c.is_empty());
        self
    }

    /// Projects `nodes` over `time_keys` (sorted ascending).
    /// Produces no rows at all when there are no nodes.
    pub fn project(&self, nodes: &[HierarchyNode], time_keys: &[TimeKey]) -> Projection {
        let mut projection = Projection::default();
        if nodes.is_empty() {
            return projection;
        }

        let mut ordered: Vec<&HierarchyNode> = nodes.iter().collect();
        ordered.sort_by(|a, b| compare_groups(self.group_order, &a.group_values, &b.group_values));

        for node in ordered {
            let first_row = projection.rows.len();
            projection.rows.push(DisplayRow::Group(group_row(node, time_keys)));

            for name in self.defect_names(node) {
                projection.rows.push(DisplayRow::Defect(defect_row(node, name, time_keys)));
            }

            projection.spans.push(GroupSpan {
                first_row,
                len: projection.rows.len() - first_row,
            });
        }

        projection
            .rows
            .push(DisplayRow::GrandTotal(grand_total_row(nodes, time_keys)));
        projection
    }

    /// Defect names of a group in display order, after the top-N cut.
    fn defect_names<'n>(&self, node: &'n HierarchyNode) -> Vec<&'n str> {
        let mut names: Vec<&str> = match self.top_defects {
            Some(limit) => top_defect_names(node, limit).into_iter().collect(),
            None => node.defect_names().into_iter().collect(),
        };

        if let Some(catalog) = self.catalog {
            names.sort_by(|a, b| catalog.compare(a, b));
        }
        names
    }
}

fn group_row(node: &HierarchyNode, time_keys: &[TimeKey]) -> GroupRow {
    let cells = time_keys
        .iter()
        .map(|key| match node.buckets.get(key) {
            Some(bucket) => BucketCell {
                checked_qty: bucket.checked_qty,
                defect_qty: bucket.defect_qty,
                rate: bucket.rate(),
            },
            None => BucketCell::default(),
        })
        .collect();

    GroupRow {
        group_values: node.group_values.clone(),
        cells,
    }
}

fn defect_row(node: &HierarchyNode, name: &str, time_keys: &[TimeKey]) -> DefectRow {
    let cells = time_keys
        .iter()
        .map(|key| match node.buckets.get(key) {
            Some(bucket) => DefectCell {
                qty: bucket.defect_qty_of(name),
                rate: bucket.defect_rate_of(name),
            },
            None => DefectCell::default(),
        })
        .collect();

    DefectRow {
        group_values: node.group_values.clone(),
        defect_name: name.to_string(),
        cells,
    }
}

/// Sums raw quantities of every node per time key.
fn grand_total_row(nodes: &[HierarchyNode], time_keys: &[TimeKey]) -> TotalRow {
    let mut cells = vec![BucketCell::default(); time_keys.len()];

    for node in nodes {
        for (key, bucket) in &node.buckets {
            if let Ok(idx) = time_keys.binary_search(key) {
                let cell = &mut cells[idx];
                cell.checked_qty = cell.checked_qty.saturating_add(bucket.checked_qty);
                cell.defect_qty = cell.defect_qty.saturating_add(bucket.defect_qty);
            }
        }
    }

    for cell in &mut cells {
        cell.rate = defect_rate(cell.defect_qty, cell.checked_qty);
    }
    TotalRow { cells }
}

/// Names ranking in the top `limit` positive quantities of at least one
/// bucket. Ties at the cut are broken by name.
fn top_defect_names(node: &HierarchyNode, limit: usize) -> BTreeSet<&str> {
    let mut keep = BTreeSet::new();
    if limit == 0 {
        return keep;
    }

    for bucket in node.buckets.values() {
        let mut ranked: Vec<(&str, u64)> = bucket
            .defects
            .iter()
            .filter(|(_, qty)| **qty > 0)
            .map(|(name, qty)| (name.as_str(), *qty))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        keep.extend(ranked.into_iter().take(limit).map(|(name, _)| name));
    }

    keep
}

// ============================================================================
// TREND CALCULATOR
// ============================================================================

/// Runs the whole pipeline for one definition.
pub struct TrendCalculator<'a> {
    definition: &'a TrendDefinition,
    catalog: Option<&'a DefectCatalog>,
}

impl<'a> TrendCalculator<'a> {
    pub fn new(definition: &'a TrendDefinition) -> Self {
        TrendCalculator {
            definition,
            catalog: None,
        }
    }

    /// Uses an explicit defect master list for defect row order.
    pub fn with_catalog(mut self, catalog: &'a DefectCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn calculate(&self, records: &[InspectionRecord]) -> TrendView {
        let definition = self.definition;
        let dimensions = definition.active_dimensions();
        let extractor = definition.granularity.extractor();

        let mut builder = HierarchyBuilder::with_extractor(&dimensions, extractor)
            .normalize_options(definition.normalize);
        let mut filtered = 0usize;
        for record in records {
            if definition.matches(record) {
                builder.add(record);
            } else {
                filtered += 1;
            }
        }
        let hierarchy = builder.finish();

        // Codes carried on the records stand in for a missing master list
        let derived;
        let catalog = match self.catalog {
            Some(catalog) => Some(catalog),
            None => {
                derived = DefectCatalog::from_records(records);
                Some(&derived)
            }
        };

        let projection = RowProjector::new()
            .group_order(definition.group_order)
            .top_defects(definition.top_defects)
            .catalog(catalog)
            .project(&hierarchy.nodes, &hierarchy.time_keys);

        let summary = summarize(definition, &hierarchy.nodes);

        log::debug!(
            target: "TREND",
            "{} {:?}: {} records, {} filtered, {} skipped -> {} groups, {} rows",
            definition.report.file_stem(definition.granularity),
            dimensions,
            records.len(),
            filtered,
            hierarchy.skipped_records,
            hierarchy.nodes.len(),
            projection.rows.len()
        );

        TrendView {
            report: definition.report,
            granularity: definition.granularity,
            dimensions,
            time_labels: hierarchy
                .time_keys
                .iter()
                .map(|key| extractor.label_of(key))
                .collect(),
            time_keys: hierarchy.time_keys,
            rows: projection.rows,
            spans: projection.spans,
            summary,
            skipped_records: hierarchy.skipped_records,
            filtered_records: filtered,
        }
    }
}

fn summarize(definition: &TrendDefinition, nodes: &[HierarchyNode]) -> TrendSummary {
    let (checked_qty, defect_qty) = nodes
        .iter()
        .flat_map(|node| node.buckets.values())
        .fold((0u64, 0u64), |(checked, defects), bucket| {
            (
                checked.saturating_add(bucket.checked_qty),
                defects.saturating_add(bucket.defect_qty),
            )
        });

    let rate = defect_rate(defect_qty, checked_qty);
    TrendSummary {
        checked_qty,
        defect_qty,
        rate,
        severity: definition.thresholds.classify(rate, RateContext::Overall),
    }
}

/// Runs the pipeline with defect order taken from codes on the records
/// (alphabetical when none carry a code).
pub fn calculate_trend(definition: &TrendDefinition, records: &[InspectionRecord]) -> TrendView {
    TrendCalculator::new(definition).calculate(records)
}

/// Orders two group keys the way `GroupOrder` says.
pub fn compare_groups(order: GroupOrder, a: &[String], b: &[String]) -> Ordering {
    match order {
        GroupOrder::Lexicographic => a.cmp(b),
        GroupOrder::Natural => natural_cmp_keys(a, b),
    }
}
