//! FILENAME: model/src/lib.rs
//! PURPOSE: Shared types for the QC defect trend suite.
//! CONTEXT: Re-exports the inspection record model, the grouping dimensions
//! and the presentation primitives (colors, rate formatting) used by both the
//! trend engine and the exporters.

pub mod dimension;
pub mod error;
pub mod number_format;
pub mod record;
pub mod style;

pub use dimension::{normalize, normalize_with, Dimension, NormalizeOptions, MISSING_VALUE};
pub use error::RecordError;
pub use number_format::format_rate;
pub use record::{decode_record_values, decode_records, DecodedRecords, DefectEntry, InspectionRecord};
pub use style::Color;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_groups_missing_dimensions_under_sentinel() {
        let record = InspectionRecord::new("2024-03-01", 10, 1);
        assert_eq!(normalize(record.dimension_value(Dimension::Buyer)), MISSING_VALUE);
    }

    #[test]
    fn integration_decode_and_normalize() {
        let json = r#"[
            {"inspectionDate": "2024-03-01", "lineNo": " L1 ", "CheckedQty": 100,
             "totalDefectsQty": 5, "DefectArray": [{"defectName": "Open Seam", "defectQty": 5}]}
        ]"#;

        let decoded = decode_records(json).unwrap();
        assert_eq!(decoded.records.len(), 1);
        assert_eq!(decoded.skipped, 0);

        let record = &decoded.records[0];
        assert_eq!(normalize(record.dimension_value(Dimension::Line)), "L1");
        assert_eq!(format_rate(record.defect_qty as f64 / record.checked_qty as f64 * 100.0), "5.00%");
    }
}
