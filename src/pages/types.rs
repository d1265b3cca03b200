use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::tabular::Row;

/// Column headers that may carry the form-submission timestamp.
pub const TIMESTAMP_COLUMNS: &[&str] = &["Informazioni cronologiche", "Timestamp"];

/// Modelled columns, in export order.
pub const COLUMNS: &[&str] = &[
  "ID",
  "title",
  "subtitle",
  "content",
  "image_address",
  "colour",
  "external_link",
  "custom_page",
  "parent",
  "category",
  "Informazioni cronologiche",
];

/// One content page, as stored in the sheet.
///
/// Field names serialize to the sheet's column headers, so the same shape is
/// used for the stored snapshot and for CSV export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
  #[serde(rename = "ID")]
  pub id: String,
  pub title: String,
  #[serde(default)]
  pub subtitle: String,
  /// Rich-text HTML
  #[serde(default)]
  pub content: String,
  #[serde(default)]
  pub image_address: String,
  #[serde(default)]
  pub colour: String,
  #[serde(default)]
  pub external_link: String,
  #[serde(default)]
  pub custom_page: String,
  /// Parent page id, empty for top-level pages
  #[serde(default)]
  pub parent: String,
  /// Raw ordering value; see [`Page::category_rank`]
  #[serde(default)]
  pub category: String,
  #[serde(rename = "Informazioni cronologiche")]
  pub timestamp: String,
  /// Sheet columns without a dedicated field, kept verbatim
  #[serde(flatten)]
  pub extra: BTreeMap<String, String>,
}

impl Page {
  /// Build a page from a parsed row.
  ///
  /// Returns `None` when the id, title or timestamp is missing.
  pub fn from_row(row: &Row) -> Option<Self> {
    let field = |name: &str| row.get(name).cloned().unwrap_or_default();

    let id = field("ID");
    let title = field("title");
    let timestamp = TIMESTAMP_COLUMNS
      .iter()
      .find_map(|c| row.get(*c).filter(|v| !v.is_empty()))
      .cloned()
      .unwrap_or_default();

    if id.is_empty() || title.is_empty() || timestamp.is_empty() {
      return None;
    }

    Some(Self {
      id,
      title,
      subtitle: field("subtitle"),
      content: field("content"),
      image_address: field("image_address"),
      colour: field("colour"),
      external_link: field("external_link"),
      custom_page: field("custom_page"),
      parent: field("parent"),
      category: field("category"),
      timestamp,
      extra: row
        .iter()
        .filter(|(k, _)| !COLUMNS.contains(&k.as_str()) && !TIMESTAMP_COLUMNS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect(),
    })
  }

  /// Value of a modelled or extra column.
  pub fn column(&self, name: &str) -> Option<&str> {
    let value = match name {
      "ID" => &self.id,
      "title" => &self.title,
      "subtitle" => &self.subtitle,
      "content" => &self.content,
      "image_address" => &self.image_address,
      "colour" => &self.colour,
      "external_link" => &self.external_link,
      "custom_page" => &self.custom_page,
      "parent" => &self.parent,
      "category" => &self.category,
      "Informazioni cronologiche" => &self.timestamp,
      other => return self.extra.get(other).map(String::as_str),
    };
    Some(value.as_str())
  }

  pub fn is_custom_page(&self) -> bool {
    self.custom_page.trim().eq_ignore_ascii_case("true")
  }

  pub fn has_external_link(&self) -> bool {
    !self.external_link.trim().is_empty()
  }

  pub fn is_top_level(&self) -> bool {
    self.parent.is_empty()
  }

  /// Manual ordering position.
  ///
  /// Reads a leading integer the way a lenient number parser would
  /// (`"3"`, `" 3rd"`, `"3.5"` all give 3). Absent, unparseable, zero or
  /// negative values mean "unordered".
  pub fn category_rank(&self) -> Option<u64> {
    let s = self.category.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
      Some(b'-') => (true, &s[1..]),
      Some(b'+') => (false, &s[1..]),
      _ => (false, s),
    };

    let end = digits
      .find(|c: char| !c.is_ascii_digit())
      .unwrap_or(digits.len());
    let digits = &digits[..end];
    if digits.is_empty() || negative {
      return None;
    }

    let value = digits.parse::<u64>().unwrap_or(u64::MAX);
    (value > 0).then_some(value)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn row(pairs: &[(&str, &str)]) -> Row {
    pairs
      .iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect()
  }

  fn with_category(category: &str) -> Page {
    Page {
      category: category.to_string(),
      ..Page::from_row(&row(&[
        ("ID", "P"),
        ("title", "T"),
        ("Informazioni cronologiche", "01/01/2024 10.00.00"),
      ]))
      .unwrap()
    }
  }

  #[test]
  fn test_from_row_requires_id_title_timestamp() {
    let full = [
      ("ID", "P1"),
      ("title", "Home"),
      ("Informazioni cronologiche", "01/01/2024 10.00.00"),
    ];
    assert!(Page::from_row(&row(&full)).is_some());

    for missing in ["ID", "title", "Informazioni cronologiche"] {
      let partial: Vec<_> = full.iter().copied().filter(|(k, _)| *k != missing).collect();
      assert!(Page::from_row(&row(&partial)).is_none(), "missing {missing}");
    }
  }

  #[test]
  fn test_from_row_accepts_english_timestamp_header() {
    let page = Page::from_row(&row(&[
      ("ID", "P1"),
      ("title", "Home"),
      ("Timestamp", "01/01/2024 10.00.00"),
    ]))
    .unwrap();
    assert_eq!(page.timestamp, "01/01/2024 10.00.00");
    assert!(page.is_top_level());
  }

  #[test]
  fn test_unmodelled_columns_are_kept() {
    let page = Page::from_row(&row(&[
      ("ID", "P1"),
      ("title", "Home"),
      ("Timestamp", "01/01/2024 10.00.00"),
      ("Indirizzo email", "a@b.test"),
      ("notes", ""),
    ]))
    .unwrap();

    assert_eq!(page.extra.len(), 2);
    assert_eq!(page.column("Indirizzo email"), Some("a@b.test"));
    assert_eq!(page.column("title"), Some("Home"));
    assert_eq!(page.column("Timestamp"), None);

    let json = serde_json::to_string(&page).unwrap();
    assert!(json.contains("\"Indirizzo email\":\"a@b.test\""));
    let back: Page = serde_json::from_str(&json).unwrap();
    assert_eq!(back, page);
  }

  #[test]
  fn test_category_rank() {
    assert_eq!(with_category("3").category_rank(), Some(3));
    assert_eq!(with_category(" 12abc").category_rank(), Some(12));
    assert_eq!(with_category("2.9").category_rank(), Some(2));
    assert_eq!(with_category("+4").category_rank(), Some(4));
    assert_eq!(with_category("").category_rank(), None);
    assert_eq!(with_category("0").category_rank(), None);
    assert_eq!(with_category("-1").category_rank(), None);
    assert_eq!(with_category("category1").category_rank(), None);
  }

  #[test]
  fn test_custom_page_flag_is_case_insensitive() {
    let mut page = with_category("");
    page.custom_page = "TRUE".into();
    assert!(page.is_custom_page());
    page.custom_page = "false".into();
    assert!(!page.is_custom_page());
  }
}
