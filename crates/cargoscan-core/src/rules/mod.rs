//! Document classification and field extraction rules.
//!
//! Classification is an ordered, first-match-wins table of substring
//! markers over the full OCR text. Each rule pairs its marker test with
//! the field extractor for that layout, so adding a document type means
//! adding one table entry.

mod patterns;

use regex::Regex;
use tracing::debug;

use crate::record::{DocumentKind, FieldMap, FieldValue};

/// One entry in the classification table.
pub struct DocumentTypeRule {
    pub kind: DocumentKind,
    identify: fn(&str) -> bool,
    extract: fn(&str) -> FieldMap,
}

/// Classification rules in priority order. Earlier entries win when a
/// document carries markers for more than one type, so the export
/// permit marker outranks the waybill headers and "AWB No" outranks
/// the bare "WAYBILL" header it contains.
pub static RULES: &[DocumentTypeRule] = &[
    DocumentTypeRule {
        kind: DocumentKind::ExportPermit,
        identify: is_export_permit,
        extract: extract_export_permit,
    },
    DocumentTypeRule {
        kind: DocumentKind::AirWaybill,
        identify: is_air_waybill,
        extract: extract_air_waybill,
    },
    DocumentTypeRule {
        kind: DocumentKind::OceanWaybill,
        identify: is_ocean_waybill,
        extract: extract_ocean_waybill,
    },
];

fn is_export_permit(text: &str) -> bool {
    text.contains("輸出許可通知書")
}

fn is_air_waybill(text: &str) -> bool {
    text.to_lowercase().contains("awb no")
}

fn is_ocean_waybill(text: &str) -> bool {
    text.to_lowercase().contains("waybill")
}

fn extract_export_permit(text: &str) -> FieldMap {
    let mut fields = FieldMap::new();
    fields.insert(
        "pcs_count".into(),
        FieldValue::Text(join_matches(&patterns::PCS_JP, text)),
    );
    fields
}

fn extract_air_waybill(text: &str) -> FieldMap {
    let mut fields = FieldMap::new();
    fields.insert(
        "pcs_count".into(),
        FieldValue::Text(join_matches(&patterns::PCS_EN, text)),
    );
    fields.insert(
        "product_info".into(),
        FieldValue::List(product_lines(text)),
    );
    fields
}

fn extract_ocean_waybill(text: &str) -> FieldMap {
    let mut fields = FieldMap::new();
    fields.insert(
        "pcs_count".into(),
        FieldValue::Text(join_matches(&patterns::PCS_AFTER_KG, text)),
    );
    fields
}

/// Resolve the document type for extracted text, first matching rule wins.
pub fn classify(text: &str) -> DocumentKind {
    for rule in RULES {
        if (rule.identify)(text) {
            debug!(kind = %rule.kind, "matched document type rule");
            return rule.kind;
        }
    }
    DocumentKind::Unknown
}

/// Run the field extractor for `kind` over `text`.
///
/// `Unknown` and `Error` have no extractor and yield an empty map.
pub fn extract_fields(kind: DocumentKind, text: &str) -> FieldMap {
    RULES
        .iter()
        .find(|rule| rule.kind == kind)
        .map(|rule| (rule.extract)(text))
        .unwrap_or_default()
}

/// First capture group of every match, comma-joined in document order.
fn join_matches(pattern: &Regex, text: &str) -> String {
    pattern
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Itemized product lines from an air waybill manifest, formatted as
/// "description: count".
fn product_lines(text: &str) -> Vec<String> {
    patterns::PRODUCT_LINE
        .captures_iter(text)
        .map(|caps| format!("{}: {}", caps[2].trim(), &caps[3]))
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_classify_each_marker() {
        assert_eq!(classify("……輸出許可通知書……"), DocumentKind::ExportPermit);
        assert_eq!(classify("AWB No: 123-45678"), DocumentKind::AirWaybill);
        assert_eq!(classify("SEA WAYBILL original"), DocumentKind::OceanWaybill);
        assert_eq!(classify("unrelated text"), DocumentKind::Unknown);
    }

    #[test]
    fn test_classify_markers_are_case_insensitive() {
        assert_eq!(classify("awb no 123"), DocumentKind::AirWaybill);
        assert_eq!(classify("Sea Waybill No. 42"), DocumentKind::OceanWaybill);
    }

    #[test]
    fn test_rule_order_breaks_ties() {
        // "AWB No" contains "waybill"-free text but an air waybill header
        // often carries the word WAYBILL too; the AWB rule must win.
        let text = "HOUSE AIR WAYBILL\nAWB No 123-45678";
        assert_eq!(classify(text), DocumentKind::AirWaybill);

        // An export permit quoting an AWB number stays an export permit.
        let text = "輸出許可通知書\nAWB No 123-45678";
        assert_eq!(classify(text), DocumentKind::ExportPermit);
    }

    #[test]
    fn test_classify_is_deterministic() {
        let text = "WAYBILL kg 12 something";
        assert_eq!(classify(text), classify(text));
    }

    #[test]
    fn test_export_permit_fields_join_in_document_order() {
        let text = "輸出許可通知書 個数 72個 のち 168 個";
        let fields = extract_fields(DocumentKind::ExportPermit, text);
        assert_eq!(fields["pcs_count"], FieldValue::Text("72, 168".into()));
    }

    #[test]
    fn test_air_waybill_product_lines() {
        let text = "AWB No 123\n1 Widget A 0.05 kg | JAPAN 72PCS\ntotal 72 PCS";
        let fields = extract_fields(DocumentKind::AirWaybill, text);
        assert_eq!(
            fields["product_info"],
            FieldValue::List(vec!["Widget A: 72".into()])
        );
        assert_eq!(fields["pcs_count"], FieldValue::Text("72, 72".into()));
    }

    #[test]
    fn test_ocean_waybill_counts_after_kg() {
        let text = "WAYBILL\n120.5 kg 12\n3.0 KG 4";
        let fields = extract_fields(DocumentKind::OceanWaybill, text);
        assert_eq!(fields["pcs_count"], FieldValue::Text("12, 4".into()));
    }

    #[test]
    fn test_extract_fields_is_idempotent() {
        let text = "AWB No 9\n1 Widget A 0.05 kg | JAPAN 72PCS";
        let first = extract_fields(DocumentKind::AirWaybill, text);
        let second = extract_fields(DocumentKind::AirWaybill, text);
        assert_eq!(first, second);
    }

    #[test]
    fn test_unknown_and_error_extract_nothing() {
        assert!(extract_fields(DocumentKind::Unknown, "72 PCS").is_empty());
        assert!(extract_fields(DocumentKind::Error, "72 PCS").is_empty());
    }
}
