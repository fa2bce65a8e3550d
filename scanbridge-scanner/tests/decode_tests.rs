use rstest::rstest;
use serde_json::{json, Value};

use scanbridge_scanner::{parse_cell, RecordReader, ScannerError};

// ---------------------------------------------------------------------------
// Cell typing
// ---------------------------------------------------------------------------

#[rstest]
#[case("", Value::Null)]
#[case("   ", Value::Null)]
#[case("NaN", Value::Null)]
#[case("443", json!(443))]
#[case("-1", json!(-1))]
#[case("7.5", json!(7.5))]
#[case("CVE-2021-44228", json!("CVE-2021-44228"))]
#[case("inf", json!("inf"))]
#[case("tcp", json!("tcp"))]
#[case("123456789012345678901", json!("123456789012345678901"))]
#[case("-99999999999999999999", json!("-99999999999999999999"))]
#[case("0.12345678901234567890", json!("0.12345678901234567890"))]
#[case("1.50000000000000000000", json!(1.5))]
#[case("1e20", json!(1e20))]
fn cells_are_typed(#[case] raw: &str, #[case] expected: Value) {
    assert_eq!(parse_cell(raw), expected);
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

const EXPORT: &str = "Plugin ID,CVE,CVSS,Risk,Host,Protocol,Port,Name\n\
19506,,0,None,10.0.0.5,tcp,0,Nessus Scan Information\n\
156032,CVE-2021-44228,10.0,Critical,10.0.0.7,tcp,8080,\"Apache Log4j, RCE\"\n";

#[test]
fn rows_decode_in_header_order() {
    let reader = RecordReader::new(EXPORT.as_bytes()).unwrap();
    assert_eq!(reader.headers()[0], "Plugin ID");

    let records: Vec<_> = reader.collect::<Result<_, _>>().unwrap();
    assert_eq!(records.len(), 2);

    let keys: Vec<_> = records[1].keys().cloned().collect();
    assert_eq!(
        keys,
        vec!["Plugin ID", "CVE", "CVSS", "Risk", "Host", "Protocol", "Port", "Name"]
    );
    assert_eq!(records[0]["CVE"], Value::Null);
    assert_eq!(records[1]["CVE"], json!("CVE-2021-44228"));
    assert_eq!(records[1]["CVSS"], json!(10.0));
    assert_eq!(records[1]["Port"], json!(8080));
    assert_eq!(records[1]["Name"], json!("Apache Log4j, RCE"));
}

#[test]
fn oversized_integers_keep_their_digits() {
    let csv = "Plugin ID,Serial\n1,123456789012345678901\n1,123456789012345678902\n";
    let records: Vec<_> = RecordReader::new(csv.as_bytes())
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(records[0]["Serial"], json!("123456789012345678901"));
    assert_eq!(records[1]["Serial"], json!("123456789012345678902"));
    assert_ne!(records[0], records[1]);
}

#[test]
fn header_only_export_yields_no_records() {
    let reader = RecordReader::new(b"Plugin ID,CVE\n".as_slice()).unwrap();
    assert_eq!(reader.count(), 0);
}

#[test]
fn ragged_row_is_a_decode_error() {
    let mut reader = RecordReader::new(b"a,b\n1,2\n3\n".as_slice()).unwrap();
    assert!(reader.next().unwrap().is_ok());
    let err = reader.next().unwrap().unwrap_err();
    assert!(matches!(err, ScannerError::Csv(_)));
    assert!(err.is_decode());
}

#[test]
fn multiline_quoted_cells_stay_in_one_record() {
    let csv = "Name,Output\nbanner,\"line one\nline two\"\n";
    let records: Vec<_> = RecordReader::new(csv.as_bytes())
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["Output"], json!("line one\nline two"));
}
