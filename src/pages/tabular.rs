//! Header-driven CSV parsing.

use std::collections::BTreeMap;

use crate::error::Failure;

/// One data row keyed by column header.
pub type Row = BTreeMap<String, String>;

/// Parse CSV text with a header row into row mappings.
///
/// Blank lines are skipped. Short rows simply lack the trailing columns and
/// extra cells past the header are ignored; deciding whether a row is usable
/// is left to the caller.
pub fn parse_tabular(text: &str) -> Result<Vec<Row>, Failure> {
  let mut reader = csv::ReaderBuilder::new()
    .flexible(true)
    .trim(csv::Trim::Headers)
    .from_reader(text.as_bytes());

  let headers = reader.headers()?.clone();

  let mut rows = Vec::new();
  for record in reader.records() {
    let record = record?;
    let row: Row = headers
      .iter()
      .zip(record.iter())
      .map(|(header, value)| (header.to_string(), value.to_string()))
      .collect();
    rows.push(row);
  }

  Ok(rows)
}
