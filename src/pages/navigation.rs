//! Tree queries over the page forest and where a selected page leads.
//!
//! Parent chains are not validated. A cycle simply produces pages that are
//! unreachable from the top level.

use url::{form_urlencoded, Url};

use super::types::Page;

/// Pages directly under `parent`, or the top-level pages when `parent` is
/// `None` or empty.
pub fn children_of<'a>(pages: &'a [Page], parent: Option<&str>) -> Vec<&'a Page> {
  let parent = parent.unwrap_or_default();
  pages.iter().filter(|page| page.parent == parent).collect()
}

pub fn has_children(pages: &[Page], id: &str) -> bool {
  pages.iter().any(|page| page.parent == id)
}

pub fn find_page<'a>(pages: &'a [Page], id: &str) -> Option<&'a Page> {
  pages.iter().find(|page| page.id == id)
}

/// Pages that may be chosen as a parent: regular content pages only.
pub fn parent_candidates(pages: &[Page]) -> Vec<&Page> {
  pages
    .iter()
    .filter(|page| !page.has_external_link() && !page.is_custom_page())
    .collect()
}

/// Where activating a page in the list view leads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
  /// The list view scoped to this page's children
  Children(String),
  /// A hand-written page under `/pages/custom/`
  Custom(String),
  /// The in-app PDF viewer
  PdfViewer(String),
  /// An external site
  External(String),
  /// The detail view
  Detail(String),
}

impl Destination {
  pub fn href(&self) -> &str {
    match self {
      Self::Children(href)
      | Self::Custom(href)
      | Self::PdfViewer(href)
      | Self::External(href)
      | Self::Detail(href) => href,
    }
  }
}

/// Resolve the destination for `page`.
///
/// `day_of_month` picks the calendar anchor on the detail view and
/// `now_millis` busts intermediary caches on external links.
pub fn resolve_destination(
  page: &Page,
  pages: &[Page],
  day_of_month: u32,
  now_millis: i64,
) -> Destination {
  if has_children(pages, &page.id) {
    return Destination::Children(format!("items.html?parent={}", page.id));
  }

  if page.is_custom_page() {
    return Destination::Custom(format!("/pages/custom/{}.html", page.id));
  }

  if page.has_external_link() {
    let link = page.external_link.trim();
    if is_pdf_url(link) {
      let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("url", link)
        .finish();
      return Destination::PdfViewer(format!("/pages/pdf-viewer.html?{query}"));
    }

    let separator = if link.contains('?') { '&' } else { '?' };
    return Destination::External(format!("{link}{separator}timestamp={now_millis}"));
  }

  Destination::Detail(format!("single-item.html?id={}#cal{}", page.id, day_of_month))
}

/// Whether a link points at a PDF, either by path or by a query that ends
/// in `.pdf`.
pub fn is_pdf_url(link: &str) -> bool {
  match Url::parse(link) {
    Ok(url) => {
      let path = url.path().to_lowercase();
      let query = url.query().unwrap_or_default().to_lowercase();
      path.ends_with(".pdf") || query.ends_with(".pdf")
    }
    Err(_) => {
      let lower = link.to_lowercase();
      let path = lower.split(['?', '#']).next().unwrap_or_default();
      path.ends_with(".pdf") || lower.ends_with(".pdf")
    }
  }
}
