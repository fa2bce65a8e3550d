//! CSV export → [`Record`] decoding.
//!
//! [`RecordReader`] borrows the downloaded bytes and decodes one row per
//! `next()`. It is single-pass: re-reading requires a new export.

use csv::{ReaderBuilder, StringRecord};
use serde_json::{Number, Value};

use scanbridge_core::Record;

use crate::error::ScannerError;

/// Lazy row decoder over a CSV export.
pub struct RecordReader<'a> {
    inner: csv::Reader<&'a [u8]>,
    headers: Vec<String>,
    row: StringRecord,
}

impl<'a> RecordReader<'a> {
    /// Read the header row. Fails if the payload has no valid header.
    pub fn new(bytes: &'a [u8]) -> Result<Self, ScannerError> {
        let mut inner = ReaderBuilder::new().has_headers(true).from_reader(bytes);
        let headers = inner.headers()?.iter().map(str::to_string).collect();
        Ok(Self {
            inner,
            headers,
            row: StringRecord::new(),
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    fn current_record(&self) -> Record {
        self.headers
            .iter()
            .zip(self.row.iter())
            .map(|(name, cell)| (name.clone(), parse_cell(cell)))
            .collect()
    }
}

impl Iterator for RecordReader<'_> {
    type Item = Result<Record, ScannerError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.inner.read_record(&mut self.row) {
            Ok(true) => Some(Ok(self.current_record())),
            Ok(false) => None,
            Err(err) => Some(Err(err.into())),
        }
    }
}

/// Type one CSV cell: empty / `NaN` → null, integers, finite floats, else
/// the raw string.
///
/// A number that `f64` cannot hold digit for digit stays a string, so two
/// distinct cells never decode to the same value.
pub fn parse_cell(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return Value::Null;
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return Value::Number(int.into());
    }
    if is_integer_literal(trimmed) || significant_digits(trimmed) > F64_EXACT_DIGITS {
        return Value::String(raw.to_string());
    }
    if let Ok(float) = trimmed.parse::<f64>() {
        if let Some(number) = Number::from_f64(float) {
            return Value::Number(number);
        }
    }
    Value::String(raw.to_string())
}

/// Decimal digits any `f64` reproduces exactly.
const F64_EXACT_DIGITS: usize = 15;

fn is_integer_literal(text: &str) -> bool {
    let digits = text.strip_prefix(['+', '-']).unwrap_or(text);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Significant digits of the mantissa, ignoring leading and trailing zeros.
fn significant_digits(text: &str) -> usize {
    let mantissa = text.split(['e', 'E']).next().unwrap_or(text);
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    digits.trim_start_matches('0').trim_end_matches('0').len()
}
