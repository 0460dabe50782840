//! FILENAME: model/src/dimension.rs
//! PURPOSE: Grouping dimensions and the normalization applied to their values.
//! CONTEXT: Records arrive with optional, inconsistently spaced dimension
//! fields. Every value is reduced to a canonical string before it becomes part
//! of a group key, so records with a missing field still group together under
//! the sentinel instead of being dropped.

use serde::{Deserialize, Serialize};

/// Canonical stand-in for a missing or empty dimension value.
pub const MISSING_VALUE: &str = "N/A";

/// A field that inspection records can be grouped by.
///
/// The declaration order is the canonical column order of every report
/// (Line, MO, Buyer, Color, Size).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Dimension {
    Line,
    Mo,
    Buyer,
    Color,
    Size,
}

impl Dimension {
    /// All dimensions in canonical column order.
    pub const ALL: [Dimension; 5] = [
        Dimension::Line,
        Dimension::Mo,
        Dimension::Buyer,
        Dimension::Color,
        Dimension::Size,
    ];

    /// Column header used on screen and in exports.
    pub fn display_name(&self) -> &'static str {
        match self {
            Dimension::Line => "Line",
            Dimension::Mo => "MO",
            Dimension::Buyer => "Buyer",
            Dimension::Color => "Color",
            Dimension::Size => "Size",
        }
    }

    /// Query parameter name understood by the inspection API.
    pub fn query_param(&self) -> &'static str {
        match self {
            Dimension::Line => "lineNo",
            Dimension::Mo => "MONo",
            Dimension::Buyer => "Buyer",
            Dimension::Color => "Color",
            Dimension::Size => "Size",
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Options controlling how dimension values are canonicalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct NormalizeOptions {
    /// Upper-case values after trimming so "Red" and "RED" form one group.
    /// Off by default: grouping is case-sensitive.
    #[serde(default)]
    pub fold_case: bool,
}

/// Normalizes a raw dimension value with the default (case-preserving) options.
pub fn normalize(raw: Option<&str>) -> String {
    normalize_with(raw, NormalizeOptions::default())
}

/// Trims surrounding whitespace and maps absent or blank input to [`MISSING_VALUE`].
pub fn normalize_with(raw: Option<&str>, options: NormalizeOptions) -> String {
    match raw.map(str::trim) {
        None | Some("") => MISSING_VALUE.to_string(),
        Some(value) if options.fold_case => value.to_uppercase(),
        Some(value) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_values_map_to_sentinel() {
        assert_eq!(normalize(None), "N/A");
        assert_eq!(normalize(Some("")), "N/A");
        assert_eq!(normalize(Some("   ")), "N/A");
    }

    #[test]
    fn test_trims_but_preserves_case() {
        assert_eq!(normalize(Some("  Red ")), "Red");
        assert_ne!(normalize(Some("Red")), normalize(Some("RED")));
    }

    #[test]
    fn test_fold_case_merges_spellings() {
        let options = NormalizeOptions { fold_case: true };
        assert_eq!(normalize_with(Some(" Red"), options), "RED");
        assert_eq!(normalize_with(Some("RED"), options), "RED");
        assert_eq!(normalize_with(None, options), MISSING_VALUE);
    }

    #[test]
    fn test_canonical_order() {
        let mut dims = vec![Dimension::Size, Dimension::Line, Dimension::Buyer];
        dims.sort();
        assert_eq!(dims, vec![Dimension::Line, Dimension::Buyer, Dimension::Size]);
        assert_eq!(Dimension::Mo.display_name(), "MO");
        assert_eq!(Dimension::Mo.query_param(), "MONo");
    }
}
