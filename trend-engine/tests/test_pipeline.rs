//! FILENAME: tests/test_pipeline.rs
//! PURPOSE: End-to-end tests of the trend pipeline: records in, view out.

mod common;

use std::collections::BTreeMap;

use common::{generated_records, line_record, sample_records};
use qc_model::{format_rate, Dimension, InspectionRecord};
use trend_engine::{
    build, calculate_trend, DisplayRow, Granularity, GroupKey, HierarchyNode, ReportKind,
    TimeKey, TrendDefinition, WeekBuckets, TimeKeyExtractor, BucketEntry,
};

fn by_line(granularity: Granularity) -> TrendDefinition {
    TrendDefinition::new(ReportKind::Sunrise, granularity).with_group_by([Dimension::Line])
}

/// Totals keyed by (group, time key), independent of node order.
fn totals(nodes: &[HierarchyNode]) -> BTreeMap<(GroupKey, TimeKey), BucketEntry> {
    nodes
        .iter()
        .flat_map(|node| {
            node.buckets
                .iter()
                .map(move |(key, bucket)| ((node.group_values.clone(), *key), bucket.clone()))
        })
        .collect()
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn test_single_line_single_day_scenario() {
    let records = vec![
        line_record("L1", "2024-03-01", 100, &[("Open Seam", 5)]),
        line_record("L1", "2024-03-01", 50, &[]),
    ];

    let view = calculate_trend(&by_line(Granularity::Day), &records);

    assert_eq!(view.time_keys.len(), 1);
    assert_eq!(view.time_keys[0].to_string(), "2024-03-01");
    assert_eq!(view.rows.len(), 3);

    match &view.rows[0] {
        DisplayRow::Group(row) => {
            assert_eq!(row.group_values.as_slice(), &["L1".to_string()]);
            assert_eq!(row.cells[0].checked_qty, 150);
            assert_eq!(row.cells[0].defect_qty, 5);
            assert_eq!(format_rate(row.cells[0].rate), "3.33%");
        }
        other => panic!("expected group row, got {:?}", other),
    }

    match &view.rows[1] {
        DisplayRow::Defect(row) => {
            assert_eq!(row.defect_name, "Open Seam");
            assert_eq!(row.cells[0].qty, 5);
            assert!((row.cells[0].rate - 5.0 / 150.0 * 100.0).abs() < 1e-12);
            assert_eq!(format_rate(row.cells[0].rate), "3.33%");
        }
        other => panic!("expected defect row, got {:?}", other),
    }

    let total = view.grand_total().expect("grand total row");
    assert_eq!(format_rate(total.cells[0].rate), "3.33%");
    assert_eq!(format_rate(view.summary.rate), "3.33%");
}

#[test]
fn test_iso_week_year_boundary_buckets() {
    let records = vec![InspectionRecord::new("2024-12-30", 10, 1)];
    assert_eq!(WeekBuckets.record_key(&records[0]).unwrap().to_string(), "2025-W01");

    let view = calculate_trend(&by_line(Granularity::Week), &sample_records());
    let keys: Vec<String> = view.time_keys.iter().map(|k| k.to_string()).collect();
    assert_eq!(keys, vec!["2024-W52", "2025-W01", "2025-W02"]);
    assert_eq!(view.time_labels[1], "W01 '25 (Dec 30 - Jan 05)");
}

#[test]
fn test_unparseable_dates_are_reported() {
    let view = calculate_trend(&by_line(Granularity::Day), &sample_records());
    assert_eq!(view.skipped_records, 1);
}

// ============================================================================
// PROPERTIES
// ============================================================================

#[test]
fn test_accumulation_ignores_record_order() {
    let records = generated_records(500, 42);
    let dims = [Dimension::Line, Dimension::Buyer];

    let forward = build(&records, &dims, Granularity::Month);

    let mut reversed = records.clone();
    reversed.reverse();
    let backward = build(&reversed, &dims, Granularity::Month);

    let mut interleaved: Vec<InspectionRecord> = records.iter().step_by(2).cloned().collect();
    interleaved.extend(records.iter().skip(1).step_by(2).cloned());
    let shuffled = build(&interleaved, &dims, Granularity::Month);

    assert_eq!(totals(&forward.nodes), totals(&backward.nodes));
    assert_eq!(totals(&forward.nodes), totals(&shuffled.nodes));
    assert_eq!(forward.time_keys, shuffled.time_keys);

    // Row output is order-independent too
    let def = TrendDefinition::new(ReportKind::Sunrise, Granularity::Month).with_group_by(dims);
    assert_eq!(calculate_trend(&def, &records).rows, calculate_trend(&def, &reversed).rows);
}

#[test]
fn test_rates_are_always_finite() {
    let mut records = generated_records(300, 7);
    records.push(line_record("L1", "2024-05-05", 0, &[("Open Seam", 3)]));

    for granularity in [Granularity::Day, Granularity::Week, Granularity::Month, Granularity::Year] {
        let view = calculate_trend(&by_line(granularity), &records);
        for row in &view.rows {
            for rate in row.rates() {
                assert!(rate.is_finite(), "non-finite rate in {:?}", row.kind());
                assert!(rate >= 0.0);
            }
        }
        assert!(view.summary.rate.is_finite());
    }
}

#[test]
fn test_zero_checked_bucket_rate_is_zero() {
    let records = vec![line_record("L1", "2024-05-05", 0, &[("Open Seam", 3)])];
    let view = calculate_trend(&by_line(Granularity::Day), &records);
    assert_eq!(view.rows[0].rate_at(0), 0.0);
    assert_eq!(view.rows[1].rate_at(0), 0.0);
    assert_eq!(view.rows[2].rate_at(0), 0.0);
}

#[test]
fn test_row_count_matches_groups_and_defects() {
    let records = generated_records(400, 99);
    let dims = [Dimension::Line, Dimension::Buyer];
    let def = TrendDefinition::new(ReportKind::Sunrise, Granularity::Week).with_group_by(dims);

    let hierarchy = build(&records, &dims, Granularity::Week);
    let expected: usize = hierarchy
        .nodes
        .iter()
        .map(|node| 1 + node.defect_names().len())
        .sum::<usize>()
        + 1;

    let view = calculate_trend(&def, &records);
    assert_eq!(view.rows.len(), expected);
    assert_eq!(view.spans.len(), hierarchy.nodes.len());

    // Spans tile the rows before the grand total exactly
    let mut next = 0;
    for span in &view.spans {
        assert_eq!(span.first_row, next);
        assert!(matches!(view.rows[span.first_row], DisplayRow::Group(_)));
        next += span.len;
    }
    assert_eq!(next, view.rows.len() - 1);
}

#[test]
fn test_grand_total_uses_raw_sums() {
    let records = generated_records(250, 1234);
    let view = calculate_trend(&by_line(Granularity::Month), &records);
    let total = view.grand_total().expect("grand total row");

    let extractor = Granularity::Month.extractor();
    for (idx, key) in view.time_keys.iter().enumerate() {
        let (checked, defects) = records
            .iter()
            .filter(|r| extractor.record_key(r) == Some(*key))
            .fold((0u64, 0u64), |(c, d), r| (c + r.checked_qty, d + r.defect_qty));

        assert_eq!(total.cells[idx].checked_qty, checked);
        assert_eq!(total.cells[idx].defect_qty, defects);
        let expected = if checked == 0 { 0.0 } else { defects as f64 / checked as f64 * 100.0 };
        assert_eq!(total.cells[idx].rate, expected);
    }
}

#[test]
fn test_grand_total_independent_of_grouping() {
    let records = generated_records(250, 5);
    let flat = calculate_trend(&TrendDefinition::new(ReportKind::Sunrise, Granularity::Year), &records);
    let grouped = calculate_trend(
        &TrendDefinition::new(ReportKind::Sunrise, Granularity::Year)
            .with_group_by([Dimension::Line, Dimension::Buyer]),
        &records,
    );
    assert_eq!(flat.grand_total(), grouped.grand_total());
}

#[test]
fn test_pipeline_is_deterministic() {
    let records = sample_records();
    let def = TrendDefinition::new(ReportKind::SubCon, Granularity::Week)
        .with_group_by([Dimension::Line, Dimension::Buyer]);

    let first = calculate_trend(&def, &records);
    let second = calculate_trend(&def, &records);
    assert_eq!(first, second);
    assert_eq!(first.file_stem(), "SubConWeeklyDefectTrend");
}
