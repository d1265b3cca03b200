//! Version resolution and deletion filtering.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;
use tracing::debug;

use super::tabular::Row;
use super::timestamp::parse_timestamp;
use super::types::Page;

/// Keep the most recent version of every page id.
///
/// Rows without an id, title or timestamp are skipped entirely. A timestamp
/// that is present but unparseable never counts as newer: such a row can
/// seed an id but never replaces another version, while any parseable
/// version replaces it. When two rows carry the same timestamp the one
/// encountered later wins. Output order is the order in which each id was
/// first seen.
pub fn most_recent_per_identifier(rows: &[Row]) -> Vec<Page> {
  let mut latest: Vec<(Page, Option<NaiveDateTime>)> = Vec::new();
  let mut positions: HashMap<String, usize> = HashMap::new();

  for row in rows {
    let Some(page) = Page::from_row(row) else {
      continue;
    };
    let stamp = parse_timestamp(&page.timestamp);
    if stamp.is_none() {
      debug!(id = %page.id, timestamp = %page.timestamp, "unparseable timestamp, row never counts as newer");
    }

    match positions.get(&page.id) {
      Some(&i) => {
        if is_newer(stamp, latest[i].1) {
          latest[i] = (page, stamp);
        }
      }
      None => {
        positions.insert(page.id.clone(), latest.len());
        latest.push((page, stamp));
      }
    }
  }

  latest.into_iter().map(|(page, _)| page).collect()
}

fn is_newer(candidate: Option<NaiveDateTime>, current: Option<NaiveDateTime>) -> bool {
  match (candidate, current) {
    (Some(candidate), Some(current)) => candidate >= current,
    (Some(_), None) => true,
    (None, _) => false,
  }
}

/// Ids listed in the deletion table.
pub fn deletion_ids(rows: &[Row]) -> HashSet<String> {
  rows
    .iter()
    .filter_map(|row| row.get("ID"))
    .filter(|id| !id.is_empty())
    .cloned()
    .collect()
}

/// Drop every page whose id is in `deleted`.
pub fn exclude_deleted(pages: Vec<Page>, deleted: &HashSet<String>) -> Vec<Page> {
  pages
    .into_iter()
    .filter(|page| !deleted.contains(&page.id))
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use proptest::prelude::*;

  const TS: &str = "Informazioni cronologiche";

  fn row(id: &str, title: &str, timestamp: &str) -> Row {
    [("ID", id), ("title", title), (TS, timestamp)]
      .into_iter()
      .map(|(k, v)| (k.to_string(), v.to_string()))
      .collect()
  }

  #[test]
  fn test_latest_timestamp_wins() {
    let rows = vec![
      row("P1", "old", "01/01/2024 10.00.00"),
      row("P1", "new", "02/01/2024 09.00.00"),
    ];
    let pages = most_recent_per_identifier(&rows);

    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].title, "new");
    assert_eq!(pages[0].timestamp, "02/01/2024 09.00.00");
  }

  #[test]
  fn test_older_row_after_newer_is_ignored() {
    let rows = vec![
      row("P1", "new", "05/03/2024 10.00.00"),
      row("P1", "old", "04/03/2024 23.00.00"),
    ];
    assert_eq!(most_recent_per_identifier(&rows)[0].title, "new");
  }

  #[test]
  fn test_equal_timestamps_later_row_wins() {
    let rows = vec![
      row("P1", "first", "01/01/2024 10.00.00"),
      row("P1", "second", "01/01/2024 10.00.00"),
    ];
    assert_eq!(most_recent_per_identifier(&rows)[0].title, "second");
  }

  #[test]
  fn test_incomplete_rows_are_excluded() {
    let rows = vec![
      row("", "no id", "01/01/2024 10.00.00"),
      row("P2", "", "01/01/2024 10.00.00"),
      row("P3", "no stamp", ""),
      row("P5", "ok", "01/01/2024 10.00.00"),
    ];
    let pages = most_recent_per_identifier(&rows);
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].id, "P5");
  }

  #[test]
  fn test_unparseable_timestamp_still_seeds_a_page() {
    let pages = most_recent_per_identifier(&[row("P1", "Home", "01/01/2024 10.00.00 extra")]);
    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].title, "Home");

    let pages = most_recent_per_identifier(&[
      row("P2", "first", "yesterday"),
      row("P2", "second", "31/02/2024 10.00.00"),
    ]);
    assert_eq!(pages[0].title, "first");
  }

  #[test]
  fn test_unparseable_timestamp_never_replaces_a_parsed_one() {
    let parsed_first = most_recent_per_identifier(&[
      row("P1", "parsed", "01/01/2024 10.00.00"),
      row("P1", "odd", "02/01/2024 10:00"),
    ]);
    assert_eq!(parsed_first[0].title, "parsed");

    let odd_first = most_recent_per_identifier(&[
      row("P1", "odd", "02/01/2024 10:00"),
      row("P1", "parsed", "01/01/2024 10.00.00"),
    ]);
    assert_eq!(odd_first[0].title, "parsed");
  }

  #[test]
  fn test_first_seen_order_is_kept() {
    let rows = vec![
      row("B", "b1", "01/01/2024 10.00.00"),
      row("A", "a1", "01/01/2024 10.00.00"),
      row("B", "b2", "02/01/2024 10.00.00"),
    ];
    let ids: Vec<_> = most_recent_per_identifier(&rows)
      .into_iter()
      .map(|p| p.id)
      .collect();
    assert_eq!(ids, vec!["B", "A"]);
  }

  #[test]
  fn test_deleted_pages_are_removed() {
    let pages = most_recent_per_identifier(&[
      row("P1", "keep", "01/01/2024 10.00.00"),
      row("P2", "drop", "01/01/2024 10.00.00"),
    ]);
    let deleted = deletion_ids(&[row("P2", "", "")]);

    let valid = exclude_deleted(pages, &deleted);
    assert_eq!(valid.len(), 1);
    assert_eq!(valid[0].id, "P1");
  }

  #[test]
  fn test_deletion_ids_ignore_blank_rows() {
    let ids = deletion_ids(&[row("", "", ""), row("P9", "", "")]);
    assert_eq!(ids, HashSet::from(["P9".to_string()]));
  }

  fn arb_rows() -> impl Strategy<Value = Vec<Row>> {
    prop::collection::vec(
      (0..5u8, 1..28u32, 0..24u32, 0..3u32).prop_map(|(id, day, hour, title)| {
        row(
          &format!("P{id}"),
          &format!("t{title}"),
          &format!("{day:02}/01/2024 {hour:02}.00.00"),
        )
      }),
      0..40,
    )
  }

  proptest! {
    #[test]
    fn prop_one_record_per_id_with_max_timestamp(rows in arb_rows()) {
      let pages = most_recent_per_identifier(&rows);

      let ids: HashSet<_> = pages.iter().map(|p| p.id.clone()).collect();
      prop_assert_eq!(ids.len(), pages.len());

      for page in &pages {
        let chosen = parse_timestamp(&page.timestamp).unwrap();
        for other in rows.iter().filter(|r| r["ID"] == page.id) {
          prop_assert!(chosen >= parse_timestamp(&other[TS]).unwrap());
        }
      }
    }

    #[test]
    fn prop_exclude_deleted_is_exact(
      rows in arb_rows(),
      deleted in prop::collection::hash_set((0..5u8).prop_map(|i| format!("P{i}")), 0..5),
    ) {
      let pages = most_recent_per_identifier(&rows);
      let kept = exclude_deleted(pages.clone(), &deleted);

      prop_assert!(kept.iter().all(|p| !deleted.contains(&p.id)));
      let expected = pages.iter().filter(|p| !deleted.contains(&p.id)).count();
      prop_assert_eq!(kept.len(), expected);
    }
  }
}
