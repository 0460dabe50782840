//! FILENAME: trend-engine/src/hierarchy.rs
//! Hierarchy construction - folds flat inspection records into
//! group -> time bucket -> totals.
//!
//! Accumulation only ever adds, so the result does not depend on input
//! order. A record contributes to exactly one (group, bucket) pair; records
//! whose timestamp cannot be bucketed are counted and dropped.

use std::collections::{BTreeMap, BTreeSet};

use qc_model::{normalize_with, Dimension, InspectionRecord, NormalizeOptions};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::time_key::{Granularity, TimeKey, TimeKeyExtractor};

/// Normalized dimension values for the active dimensions, in order.
pub type GroupKey = SmallVec<[String; 5]>;

/// Defect rate in percent. Zero when nothing was checked.
pub fn defect_rate(defect_qty: u64, checked_qty: u64) -> f64 {
    if checked_qty == 0 {
        0.0
    } else {
        defect_qty as f64 / checked_qty as f64 * 100.0
    }
}

// ============================================================================
// BUCKET ENTRY
// ============================================================================

/// Accumulated totals for one (group, time key) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketEntry {
    pub checked_qty: u64,
    pub defect_qty: u64,
    pub defects: BTreeMap<String, u64>,
}

impl BucketEntry {
    fn accumulate(&mut self, record: &InspectionRecord) {
        self.checked_qty = self.checked_qty.saturating_add(record.checked_qty);
        self.defect_qty = self.defect_qty.saturating_add(record.defect_qty);

        for entry in &record.defects {
            let Some(name) = entry.name() else {
                continue;
            };
            let slot = self.defects.entry(name.to_string()).or_insert(0);
            *slot = slot.saturating_add(entry.qty);
        }
    }

    pub fn rate(&self) -> f64 {
        defect_rate(self.defect_qty, self.checked_qty)
    }

    pub fn defect_qty_of(&self, name: &str) -> u64 {
        self.defects.get(name).copied().unwrap_or(0)
    }

    pub fn defect_rate_of(&self, name: &str) -> f64 {
        defect_rate(self.defect_qty_of(name), self.checked_qty)
    }
}

// ============================================================================
// HIERARCHY NODE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyNode {
    pub group_values: GroupKey,
    pub buckets: BTreeMap<TimeKey, BucketEntry>,
}

impl HierarchyNode {
    fn new(group_values: GroupKey) -> Self {
        HierarchyNode {
            group_values,
            buckets: BTreeMap::new(),
        }
    }

    /// Every defect name seen in any bucket of this group, alphabetically.
    pub fn defect_names(&self) -> BTreeSet<&str> {
        self.buckets
            .values()
            .flat_map(|bucket| bucket.defects.keys().map(String::as_str))
            .collect()
    }
}

/// Output of a build: nodes in first-seen order plus the sorted union of
/// time keys across all nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hierarchy {
    pub nodes: Vec<HierarchyNode>,
    pub time_keys: Vec<TimeKey>,
    pub skipped_records: usize,
}

// ============================================================================
// BUILDER
// ============================================================================

pub struct HierarchyBuilder<'a> {
    dimensions: &'a [Dimension],
    extractor: &'a dyn TimeKeyExtractor,
    normalize: NormalizeOptions,
    index: FxHashMap<GroupKey, usize>,
    nodes: Vec<HierarchyNode>,
    time_keys: BTreeSet<TimeKey>,
    skipped: usize,
}

impl<'a> HierarchyBuilder<'a> {
    pub fn new(dimensions: &'a [Dimension], granularity: Granularity) -> Self {
        Self::with_extractor(dimensions, granularity.extractor())
    }

    pub fn with_extractor(dimensions: &'a [Dimension], extractor: &'a dyn TimeKeyExtractor) -> Self {
        HierarchyBuilder {
            dimensions,
            extractor,
            normalize: NormalizeOptions::default(),
            index: FxHashMap::default(),
            nodes: Vec::new(),
            time_keys: BTreeSet::new(),
            skipped: 0,
        }
    }

    pub fn normalize_options(mut self, options: NormalizeOptions) -> Self {
        self.normalize = options;
        self
    }

    /// Folds one record in. Returns `false` when the record was dropped
    /// because its timestamp could not be bucketed.
    pub fn add(&mut self, record: &InspectionRecord) -> bool {
        let Some(time_key) = self.extractor.record_key(record) else {
            self.skipped += 1;
            return false;
        };

        let group_key: GroupKey = self
            .dimensions
            .iter()
            .map(|d| normalize_with(record.dimension_value(*d), self.normalize))
            .collect();

        let node_idx = match self.index.get(&group_key) {
            Some(&idx) => idx,
            None => {
                let idx = self.nodes.len();
                self.index.insert(group_key.clone(), idx);
                self.nodes.push(HierarchyNode::new(group_key));
                idx
            }
        };

        self.nodes[node_idx]
            .buckets
            .entry(time_key)
            .or_default()
            .accumulate(record);
        self.time_keys.insert(time_key);
        true
    }

    pub fn add_all<'r>(&mut self, records: impl IntoIterator<Item = &'r InspectionRecord>) {
        for record in records {
            self.add(record);
        }
    }

    pub fn finish(self) -> Hierarchy {
        Hierarchy {
            nodes: self.nodes,
            time_keys: self.time_keys.into_iter().collect(),
            skipped_records: self.skipped,
        }
    }
}

/// Builds the hierarchy for `records` grouped by `dimensions`.
pub fn build(
    records: &[InspectionRecord],
    dimensions: &[Dimension],
    granularity: Granularity,
) -> Hierarchy {
    let mut builder = HierarchyBuilder::new(dimensions, granularity);
    builder.add_all(records);
    builder.finish()
}
