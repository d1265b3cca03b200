//! Manual ordering of sibling pages.

use super::types::Page;

/// Reorder pages by their `category` value.
///
/// Pages with a positive category are grouped by value and the groups laid
/// out from the front in ascending order; pages sharing a category keep
/// their relative input order. Uncategorized pages then fill the remaining
/// slots in their original relative order. The categorized block is
/// contiguous, so every free slot lies after it and filling reduces to
/// appending.
pub fn reorder_by_category(pages: Vec<Page>) -> Vec<Page> {
  let (mut ordered, unordered): (Vec<Page>, Vec<Page>) = pages
    .into_iter()
    .partition(|page| page.category_rank().is_some());

  // Stable: ties keep input order
  ordered.sort_by_key(|page| page.category_rank());

  ordered.into_iter().chain(unordered).collect()
}
