//! Output data model: document kinds, field maps, extraction records.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Resolved document type for one processed PDF.
///
/// The declared layouts plus the two sentinels: `Unknown` for text that
/// matched no rule, `Error` for documents that failed to process at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    /// Export permit notice (輸出許可通知書).
    ExportPermit,
    /// Air waybill ("AWB No" header).
    AirWaybill,
    /// Ocean waybill ("WAYBILL" header).
    OceanWaybill,
    /// Text extracted but no rule matched.
    Unknown,
    /// Processing failed for this document.
    Error,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::ExportPermit => "ExportPermit",
            DocumentKind::AirWaybill => "AirWaybill",
            DocumentKind::OceanWaybill => "OceanWaybill",
            DocumentKind::Unknown => "Unknown",
            DocumentKind::Error => "Error",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single extracted field value.
///
/// The field schema is type-dependent, so values are either a scalar
/// string (already comma-joined for multi-match patterns) or a list of
/// formatted entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    /// Flatten to a single display string; lists join with ", ".
    pub fn flatten(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::List(items) => items.join(", "),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(s) => s.is_empty(),
            FieldValue::List(items) => items.is_empty(),
        }
    }
}

/// Open per-type field schema: field name to value, stable iteration order.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// Final output unit: one record per input document, created once and
/// never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRecord {
    /// Source PDF filename.
    pub filename: String,

    /// Resolved document type.
    pub kind: DocumentKind,

    /// Extracted fields (empty for `Unknown` and `Error`).
    pub fields: FieldMap,

    /// Failure message (only for `Error`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// When this record was produced.
    pub processed_at: DateTime<Utc>,
}

impl ExtractionRecord {
    /// Record for a successfully classified document (including `Unknown`).
    pub fn classified(filename: impl Into<String>, kind: DocumentKind, fields: FieldMap) -> Self {
        Self {
            filename: filename.into(),
            kind,
            fields,
            error: None,
            processed_at: Utc::now(),
        }
    }

    /// Record for a document that failed to process.
    pub fn failure(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            kind: DocumentKind::Error,
            fields: FieldMap::new(),
            error: Some(message.into()),
            processed_at: Utc::now(),
        }
    }

    /// Serialized field column for the output table.
    ///
    /// `Error` rows carry the failure message; other rows flatten the
    /// non-empty field values in field-name order.
    pub fn serialized_fields(&self) -> String {
        if let Some(err) = &self.error {
            return err.clone();
        }
        self.fields
            .values()
            .filter(|v| !v.is_empty())
            .map(FieldValue::flatten)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_list_joins_with_comma_space() {
        let value = FieldValue::List(vec!["Widget A: 72".into(), "Widget B: 168".into()]);
        assert_eq!(value.flatten(), "Widget A: 72, Widget B: 168");
    }

    #[test]
    fn test_error_record_serializes_message() {
        let record = ExtractionRecord::failure("bad.pdf", "failed to parse PDF: broken");
        assert_eq!(record.kind, DocumentKind::Error);
        assert_eq!(record.serialized_fields(), "failed to parse PDF: broken");
    }

    #[test]
    fn test_serialized_fields_skips_empty_values() {
        let mut fields = FieldMap::new();
        fields.insert("pcs_count".into(), FieldValue::Text(String::new()));
        fields.insert(
            "product_info".into(),
            FieldValue::List(vec!["Widget A: 72".into()]),
        );
        let record = ExtractionRecord::classified("a.pdf", DocumentKind::AirWaybill, fields);
        assert_eq!(record.serialized_fields(), "Widget A: 72");
    }

    #[test]
    fn test_kind_display_names() {
        assert_eq!(DocumentKind::ExportPermit.to_string(), "ExportPermit");
        assert_eq!(DocumentKind::Unknown.to_string(), "Unknown");
    }
}
