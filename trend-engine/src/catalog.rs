//! FILENAME: trend-engine/src/catalog.rs
//! Defect master list: stable defect name to defect code mapping.
//!
//! Used only for ordering defect rows. Coded defects come first in code
//! order (numeric-aware), uncoded names follow alphabetically.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use qc_model::InspectionRecord;
use serde::{Deserialize, Serialize};

use crate::sort::natural_cmp;

/// One entry of the master list as served by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub defect_name: String,
    pub defect_code: CatalogCode,
}

/// Codes are sent as strings by some endpoints and as numbers by others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CatalogCode {
    Int(i64),
    Text(String),
}

impl CatalogCode {
    fn into_text(self) -> String {
        match self {
            CatalogCode::Int(n) => n.to_string(),
            CatalogCode::Text(s) => s.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<CatalogEntry>", into = "Vec<CatalogEntry>")]
pub struct DefectCatalog {
    codes: BTreeMap<String, String>,
}

impl DefectCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, code: impl Into<String>) {
        let code = code.into();
        let name = name.into();
        if !code.trim().is_empty() && !name.trim().is_empty() {
            self.codes.insert(name.trim().to_string(), code.trim().to_string());
        }
    }

    /// Builds a catalog from codes carried on the records themselves.
    /// The first code seen for a name wins.
    pub fn from_records(records: &[InspectionRecord]) -> Self {
        let mut catalog = DefectCatalog::new();
        for entry in records.iter().flat_map(|r| r.defects.iter()) {
            if let (Some(name), Some(code)) = (entry.name(), entry.defect_code.as_deref()) {
                if !catalog.codes.contains_key(name) {
                    catalog.insert(name, code);
                }
            }
        }
        catalog
    }

    pub fn code_of(&self, name: &str) -> Option<&str> {
        self.codes.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Row ordering for two defect names.
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        match (self.code_of(a), self.code_of(b)) {
            (Some(x), Some(y)) => natural_cmp(x, y).then_with(|| a.cmp(b)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.cmp(b),
        }
    }
}

impl From<Vec<CatalogEntry>> for DefectCatalog {
    fn from(entries: Vec<CatalogEntry>) -> Self {
        let mut catalog = DefectCatalog::new();
        for entry in entries {
            catalog.insert(entry.defect_name, entry.defect_code.into_text());
        }
        catalog
    }
}

impl From<DefectCatalog> for Vec<CatalogEntry> {
    fn from(catalog: DefectCatalog) -> Self {
        catalog
            .codes
            .into_iter()
            .map(|(defect_name, code)| CatalogEntry {
                defect_name,
                defect_code: CatalogCode::Text(code),
            })
            .collect()
    }
}
