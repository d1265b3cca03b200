//! CSV export of the valid page set.

use std::collections::BTreeSet;

use crate::error::Failure;

use super::types::{Page, COLUMNS};

/// Render pages as CSV using the sheet's column headers.
///
/// Modelled columns come first, then every extra column seen on any page in
/// name order. Pages lacking an extra column get an empty cell.
pub fn to_csv(pages: &[Page]) -> Result<String, Failure> {
  if pages.is_empty() {
    return Err(Failure::Validation("no valid pages to export".to_string()));
  }

  let extra: BTreeSet<&str> = pages
    .iter()
    .flat_map(|page| page.extra.keys().map(String::as_str))
    .collect();
  let headers: Vec<&str> = COLUMNS.iter().copied().chain(extra).collect();

  let mut writer = csv::Writer::from_writer(Vec::new());
  writer.write_record(&headers)?;
  for page in pages {
    writer.write_record(headers.iter().map(|h| page.column(h).unwrap_or_default()))?;
  }

  let bytes = writer
    .into_inner()
    .map_err(|e| Failure::Parse(e.to_string()))?;
  String::from_utf8(bytes).map_err(|e| Failure::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::pages::tabular::parse_tabular;

  #[test]
  fn test_export_uses_sheet_headers_and_parses_back() {
    let page = Page {
      id: "P1".into(),
      title: "Home, sweet".into(),
      subtitle: String::new(),
      content: "<p>\"hi\"</p>".into(),
      image_address: String::new(),
      colour: "#fff".into(),
      external_link: String::new(),
      custom_page: "false".into(),
      parent: String::new(),
      category: "1".into(),
      timestamp: "01/01/2024 10.00.00".into(),
      extra: Default::default(),
    };

    let text = to_csv(std::slice::from_ref(&page)).unwrap();
    assert!(text.starts_with("ID,title,subtitle,content,"));

    let rows = parse_tabular(&text).unwrap();
    assert_eq!(Page::from_row(&rows[0]), Some(page));
  }

  #[test]
  fn test_extra_columns_survive_export() {
    let rows = parse_tabular(
      "ID,title,Informazioni cronologiche,notes\n\
       P1,Home,01/01/2024 10.00.00,kept\n\
       P2,About,01/01/2024 10.00.00,\n",
    )
    .unwrap();
    let pages: Vec<Page> = rows.iter().filter_map(Page::from_row).collect();

    let text = to_csv(&pages).unwrap();
    assert!(text.lines().next().unwrap().ends_with(",Informazioni cronologiche,notes"));

    let exported = parse_tabular(&text).unwrap();
    assert_eq!(exported[0]["notes"], "kept");
    assert_eq!(exported[1]["notes"], "");
    assert_eq!(Page::from_row(&exported[0]).as_ref(), pages.first());
  }

  #[test]
  fn test_empty_export_is_refused() {
    assert!(matches!(to_csv(&[]), Err(Failure::Validation(_))));
  }
}
