//! FILENAME: model/src/record.rs
//! PURPOSE: The inspection record as delivered by the QC REST API.
//! CONTEXT: Different endpoints spell the same fields differently
//! (`CheckedQty` vs `checkedQty`, `DefectArray` vs `defects`) and freely send
//! `null` for optional values. Decoding accepts all observed spellings and is
//! done record-by-record so one malformed entry never poisons a whole batch.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::dimension::Dimension;
use crate::error::RecordError;

// ============================================================================
// DEFECT ENTRY
// ============================================================================

/// One defect line within an inspection. `defect_name` is the identity key:
/// two entries with the same name are the same defect across records.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DefectEntry {
    #[serde(rename = "defectName", alias = "name", default, deserialize_with = "text")]
    pub defect_name: Option<String>,

    #[serde(rename = "qty", alias = "defectQty", default, deserialize_with = "quantity")]
    pub qty: u64,

    /// Canonical code from the defect master list, when the payload carries it.
    #[serde(
        rename = "defectCode",
        default,
        deserialize_with = "text",
        skip_serializing_if = "Option::is_none"
    )]
    pub defect_code: Option<String>,
}

impl DefectEntry {
    pub fn new(name: impl Into<String>, qty: u64) -> Self {
        DefectEntry {
            defect_name: Some(name.into()),
            qty,
            defect_code: None,
        }
    }

    /// The defect name without surrounding whitespace, if non-blank.
    /// Every lookup by defect name goes through this.
    pub fn name(&self) -> Option<&str> {
        self.defect_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

// ============================================================================
// INSPECTION RECORD
// ============================================================================

/// One QC inspection event. Read-only input to the trend pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InspectionRecord {
    /// Raw inspection date as sent by the API. Parsed lazily by the time
    /// bucketing layer; an unparseable value drops the record from the pivot.
    #[serde(
        rename = "inspectionDate",
        alias = "timestamp",
        alias = "date",
        default,
        deserialize_with = "text"
    )]
    pub timestamp: Option<String>,

    /// Pre-computed ISO week key (`YYYY-Www`) sent by the weekly endpoint.
    #[serde(
        rename = "weekKey",
        default,
        deserialize_with = "text",
        skip_serializing_if = "Option::is_none"
    )]
    pub week_key: Option<String>,

    #[serde(rename = "checkedQty", alias = "CheckedQty", default, deserialize_with = "quantity")]
    pub checked_qty: u64,

    /// Total defects found. Not reconciled against the sum of `defects`.
    #[serde(
        rename = "defectQty",
        alias = "totalDefectsQty",
        default,
        deserialize_with = "quantity"
    )]
    pub defect_qty: u64,

    #[serde(rename = "defects", alias = "DefectArray", default, deserialize_with = "defect_list")]
    pub defects: Vec<DefectEntry>,

    #[serde(rename = "lineNo", default, deserialize_with = "text")]
    pub line_no: Option<String>,

    #[serde(rename = "moNo", alias = "MONo", default, deserialize_with = "text")]
    pub mo_no: Option<String>,

    #[serde(rename = "buyer", alias = "Buyer", default, deserialize_with = "text")]
    pub buyer: Option<String>,

    #[serde(rename = "color", alias = "Color", default, deserialize_with = "text")]
    pub color: Option<String>,

    #[serde(rename = "size", alias = "Size", default, deserialize_with = "text")]
    pub size: Option<String>,
}

impl InspectionRecord {
    /// Creates a record with the given date and totals and no dimensions.
    pub fn new(timestamp: impl Into<String>, checked_qty: u64, defect_qty: u64) -> Self {
        InspectionRecord {
            timestamp: Some(timestamp.into()),
            checked_qty,
            defect_qty,
            ..Default::default()
        }
    }

    /// Sets a dimension value.
    pub fn with_dimension(mut self, dimension: Dimension, value: impl Into<String>) -> Self {
        let value = Some(value.into());
        match dimension {
            Dimension::Line => self.line_no = value,
            Dimension::Mo => self.mo_no = value,
            Dimension::Buyer => self.buyer = value,
            Dimension::Color => self.color = value,
            Dimension::Size => self.size = value,
        }
        self
    }

    /// Appends a defect entry.
    pub fn with_defect(mut self, name: impl Into<String>, qty: u64) -> Self {
        self.defects.push(DefectEntry::new(name, qty));
        self
    }

    /// Raw (un-normalized) value of a dimension field.
    pub fn dimension_value(&self, dimension: Dimension) -> Option<&str> {
        match dimension {
            Dimension::Line => self.line_no.as_deref(),
            Dimension::Mo => self.mo_no.as_deref(),
            Dimension::Buyer => self.buyer.as_deref(),
            Dimension::Color => self.color.as_deref(),
            Dimension::Size => self.size.as_deref(),
        }
    }
}

// ============================================================================
// BATCH DECODING
// ============================================================================

/// Result of decoding an API payload: the records that decoded cleanly and
/// the number that were skipped as malformed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedRecords {
    pub records: Vec<InspectionRecord>,
    pub skipped: usize,
}

/// Decodes a JSON array of inspection records.
/// Fails only when the payload itself is not an array.
pub fn decode_records(json: &str) -> Result<DecodedRecords, RecordError> {
    match serde_json::from_str::<Value>(json)? {
        Value::Array(values) => Ok(decode_record_values(values)),
        other => Err(RecordError::NotAnArray(json_type_name(&other).to_string())),
    }
}

/// Decodes already-parsed JSON values one at a time.
pub fn decode_record_values(values: Vec<Value>) -> DecodedRecords {
    let mut decoded = DecodedRecords {
        records: Vec::with_capacity(values.len()),
        skipped: 0,
    };

    for value in values {
        match serde_json::from_value::<InspectionRecord>(value) {
            Ok(record) => decoded.records.push(record),
            Err(_) => decoded.skipped += 1,
        }
    }

    decoded
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// FIELD DESERIALIZERS
// ============================================================================

/// Accepts strings and numbers (line numbers are sometimes sent as integers);
/// `null` becomes `None`.
fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected text, found {}",
            json_type_name(&other)
        ))),
    }
}

/// Non-negative integral quantity; `null` counts as zero.
fn quantity<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<f64>::deserialize(deserializer)? {
        None => Ok(0),
        Some(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 => Ok(v as u64),
        Some(v) => Err(D::Error::custom(format!("invalid quantity {}", v))),
    }
}

fn defect_list<'de, D>(deserializer: D) -> Result<Vec<DefectEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<DefectEntry>>::deserialize(deserializer)?.unwrap_or_default())
}
