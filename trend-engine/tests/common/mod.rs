//! FILENAME: tests/common/mod.rs
//! Record fixtures for trend pipeline integration tests.

#![allow(dead_code)]

use qc_model::{Dimension, InspectionRecord};

/// Record on one line with a per-defect breakdown; `defectQty` is the sum.
pub fn line_record(line: &str, date: &str, checked: u64, defects: &[(&str, u64)]) -> InspectionRecord {
    let total = defects.iter().map(|(_, qty)| *qty).sum();
    defects.iter().fold(
        InspectionRecord::new(date, checked, total).with_dimension(Dimension::Line, line),
        |record, (name, qty)| record.with_defect(*name, *qty),
    )
}

/// A mixed batch over three lines, two buyers and several dates,
/// including a year boundary and a zero-checked record.
pub fn sample_records() -> Vec<InspectionRecord> {
    vec![
        line_record("L1", "2024-12-30", 120, &[("Open Seam", 3), ("Broken Stitch", 1)])
            .with_dimension(Dimension::Buyer, "Aritzia"),
        line_record("L1", "2024-12-31", 80, &[("Open Seam", 2)])
            .with_dimension(Dimension::Buyer, "Aritzia"),
        line_record("L2", "2024-12-23", 200, &[("Dirty Mark", 4), ("Skip Stitch", 2)])
            .with_dimension(Dimension::Buyer, "Elho"),
        line_record("L2", "2025-01-06", 0, &[("Dirty Mark", 1)]).with_dimension(Dimension::Buyer, "Elho"),
        line_record("L10", "2025-01-07", 150, &[]).with_dimension(Dimension::Buyer, "Elho"),
        line_record("L10", "2025-01-08", 150, &[("Open Seam", 6), ("Pleat", 3), ("Broken Stitch", 1)]),
        InspectionRecord::new("31-12-2024", 50, 1).with_dimension(Dimension::Line, "L1"),
    ]
}

/// Deterministic pseudo-random batch for property-style checks.
pub fn generated_records(count: usize, seed: u64) -> Vec<InspectionRecord> {
    const LINES: [&str; 4] = ["L1", "L2", "L7", "L10"];
    const BUYERS: [&str; 3] = ["Aritzia", "Elho", ""];
    const DEFECTS: [&str; 5] = ["Open Seam", "Broken Stitch", "Dirty Mark", "Skip Stitch", "Pleat"];

    let mut state = seed | 1;
    let mut next = move || {
        // xorshift64
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        state
    };

    (0..count)
        .map(|_| {
            let day = 1 + next() % 28;
            let month = 1 + next() % 12;
            let checked = next() % 200;
            let mut record = InspectionRecord::new(format!("2024-{:02}-{:02}", month, day), checked, 0)
                .with_dimension(Dimension::Line, LINES[(next() % 4) as usize])
                .with_dimension(Dimension::Buyer, BUYERS[(next() % 3) as usize]);
            for _ in 0..next() % 3 {
                let qty = next() % 5;
                record.defect_qty += qty;
                record = record.with_defect(DEFECTS[(next() % 5) as usize], qty);
            }
            record
        })
        .collect()
}
