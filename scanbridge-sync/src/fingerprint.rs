//! Content fingerprints for records.
//!
//! Canonical form: fields sorted by name, engine-derived fields dropped,
//! each field written as `len(name) name value-json`. The 128-bit XXH3 of
//! that byte string is the fingerprint. Stable across restarts and across
//! both sink adapters.

use serde_json::Value;
use xxhash_rust::xxh3::Xxh3;

use scanbridge_core::types::DERIVED_FIELDS;
use scanbridge_core::{Fingerprint, Record};

/// Fingerprint of `record`, independent of field order.
pub fn fingerprint(record: &Record) -> Fingerprint {
    let mut fields: Vec<(&String, &Value)> = record
        .iter()
        .filter(|(name, _)| !DERIVED_FIELDS.contains(&name.as_str()))
        .collect();
    fields.sort_unstable_by(|a, b| a.0.cmp(b.0));

    let mut hasher = Xxh3::new();
    for (name, value) in fields {
        hasher.update(&(name.len() as u64).to_le_bytes());
        hasher.update(name.as_bytes());
        write_value(&mut hasher, value);
    }
    Fingerprint(hasher.digest128())
}

fn write_value(hasher: &mut Xxh3, value: &Value) {
    // Compact JSON. Decoded cells are scalars, so no nested key order.
    let encoded = value.to_string();
    hasher.update(&(encoded.len() as u64).to_le_bytes());
    hasher.update(encoded.as_bytes());
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use scanbridge_core::types::{INGESTED_AT_FIELD, KNOWN_EXPLOITED_FIELD};
    use scanbridge_scanner::parse_cell;

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn field_order_does_not_matter() {
        let a = record(&[("a", json!(1)), ("b", json!(2))]);
        let b = record(&[("b", json!(2)), ("a", json!(1))]);
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn any_value_change_changes_fingerprint() {
        let base = record(&[("host", json!("10.0.0.5")), ("port", json!(443))]);
        let changed = record(&[("host", json!("10.0.0.5")), ("port", json!(444))]);
        assert_ne!(fingerprint(&base), fingerprint(&changed));
    }

    #[rstest]
    #[case::number_vs_text(json!(443), json!("443"))]
    #[case::integer_vs_float(json!(1), json!(1.0))]
    #[case::null_vs_empty(json!(null), json!(""))]
    #[case::bool_vs_text(json!(true), json!("true"))]
    fn value_type_is_part_of_identity(#[case] left: Value, #[case] right: Value) {
        let a = record(&[("port", left)]);
        let b = record(&[("port", right)]);
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn oversized_numeric_cells_stay_distinct() {
        let a = record(&[("Serial", parse_cell("123456789012345678901"))]);
        let b = record(&[("Serial", parse_cell("123456789012345678902"))]);
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn field_boundaries_are_unambiguous() {
        let a = record(&[("ab", json!("c"))]);
        let b = record(&[("a", json!("bc"))]);
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn derived_fields_are_ignored() {
        let raw = record(&[("CVE", json!("CVE-2021-44228"))]);
        let mut enriched = raw.clone();
        enriched.insert(INGESTED_AT_FIELD.to_string(), json!(1_700_000_000));
        enriched.insert(KNOWN_EXPLOITED_FIELD.to_string(), json!(true));
        assert_eq!(fingerprint(&raw), fingerprint(&enriched));
    }

    #[test]
    fn ten_thousand_distinct_records_do_not_collide() {
        let mut seen = HashSet::new();
        for i in 0..10_000u32 {
            let r = record(&[
                ("Plugin ID", json!(i % 97)),
                ("Host", json!(format!("10.0.{}.{}", i / 256, i % 256))),
                ("Port", json!(i % 1024)),
            ]);
            assert!(seen.insert(fingerprint(&r)), "collision at record {i}");
        }
    }

    #[test]
    fn hex_form_is_stable() {
        let r = record(&[("a", json!(1))]);
        assert_eq!(fingerprint(&r).to_hex(), fingerprint(&r.clone()).to_hex());
        assert_eq!(fingerprint(&r).to_hex().len(), 32);
    }
}
