//! Admin write path: page creation, editing and deletion through the
//! hosted form endpoint.
//!
//! Writes never touch the local snapshot. New versions only become visible
//! after the next forced refresh picks them up from the sheet.

use sha1::{Digest, Sha1};
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use crate::config::{FormFields, FormsConfig};
use crate::error::Failure;
use crate::net::{Request, Transport};
use crate::pages::Page;

/// Upper bound on the rich-text content of one page, in characters.
pub const MAX_CONTENT_LEN: usize = 45_000;

/// Fresh page id, `ID-<uuid v4>`.
pub fn generate_id() -> String {
  format!("ID-{}", Uuid::new_v4())
}

/// Lowercase hex SHA-1 of a form id.
pub fn hash_form_id(form_id: &str) -> String {
  hex::encode(Sha1::digest(form_id.as_bytes()))
}

/// A page version about to be submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDraft {
  pub id: String,
  pub title: String,
  pub subtitle: String,
  pub content: String,
  pub image_address: String,
  pub colour: String,
  pub external_link: String,
  pub custom_page: bool,
  pub parent: String,
  pub category: String,
}

impl Default for PageDraft {
  fn default() -> Self {
    Self {
      id: String::new(),
      title: String::new(),
      subtitle: String::new(),
      content: String::new(),
      image_address: String::new(),
      colour: "#ffffff".to_string(),
      external_link: String::new(),
      custom_page: false,
      parent: String::new(),
      category: String::new(),
    }
  }
}

impl PageDraft {
  /// Blank draft with a freshly generated id.
  pub fn blank() -> Self {
    Self {
      id: generate_id(),
      ..Self::default()
    }
  }

  /// Draft pre-filled from an existing page; submitting it records a new
  /// version of that page.
  pub fn from_page(page: &Page) -> Self {
    let colour = if page.colour.trim().is_empty() {
      Self::default().colour
    } else {
      page.colour.clone()
    };

    Self {
      id: page.id.clone(),
      title: page.title.clone(),
      subtitle: page.subtitle.clone(),
      content: page.content.clone(),
      image_address: page.image_address.clone(),
      colour,
      external_link: page.external_link.clone(),
      custom_page: page.is_custom_page(),
      parent: page.parent.clone(),
      category: page.category.clone(),
    }
  }

  /// Clear fields that make no sense for the kind of page.
  ///
  /// A custom page has no subtitle, content or external link. A page with an
  /// external link has no subtitle, content, custom flag or category.
  pub fn normalized(mut self) -> Self {
    if self.custom_page {
      self.subtitle.clear();
      self.content.clear();
      self.external_link.clear();
    }
    if !self.external_link.trim().is_empty() {
      self.subtitle.clear();
      self.content.clear();
      self.custom_page = false;
      self.category.clear();
    }
    self
  }

  pub fn validate(&self) -> Result<(), Failure> {
    if self.id.trim().is_empty() {
      return Err(Failure::Validation("page id is required".into()));
    }
    if self.title.trim().is_empty() {
      return Err(Failure::Validation("title is required".into()));
    }
    let len = self.content.chars().count();
    if len > MAX_CONTENT_LEN {
      return Err(Failure::Validation(format!(
        "content is {len} characters, limit is {MAX_CONTENT_LEN}"
      )));
    }
    Ok(())
  }

  fn form_fields(&self, fields: &FormFields) -> Vec<(String, String)> {
    let custom = if self.custom_page { "true" } else { "false" };
    vec![
      (fields.id.clone(), self.id.clone()),
      (fields.title.clone(), self.title.clone()),
      (fields.subtitle.clone(), self.subtitle.clone()),
      (fields.content.clone(), self.content.trim().to_string()),
      (fields.image.clone(), self.image_address.clone()),
      (fields.colour.clone(), self.colour.clone()),
      (fields.external_link.clone(), self.external_link.clone()),
      (fields.custom_page.clone(), custom.to_string()),
      (fields.parent.clone(), self.parent.clone()),
      (fields.category.clone(), self.category.clone()),
    ]
  }
}

/// Posts page versions and deletion requests to the form endpoint.
///
/// The form id doubles as the admin password: it is checked against the
/// configured hash before anything is sent.
pub struct FormClient<T: Transport> {
  transport: T,
  config: FormsConfig,
}

impl<T: Transport> FormClient<T> {
  pub fn new(transport: T, config: FormsConfig) -> Self {
    Self { transport, config }
  }

  /// `{base_url}/{form_id}/formResponse`
  pub fn form_response_url(&self, form_id: &str) -> Result<Url, Failure> {
    let mut url = Url::parse(&self.config.base_url)
      .map_err(|e| Failure::Validation(format!("bad forms base url: {e}")))?;
    url
      .path_segments_mut()
      .map_err(|_| Failure::Validation("forms base url cannot take a path".into()))?
      .pop_if_empty()
      .push(form_id)
      .push("formResponse");
    Ok(url)
  }

  /// Check a typed form id against `expected_hash`. Returns the trimmed id.
  pub fn authorize(&self, form_id: &str, expected_hash: &str) -> Result<String, Failure> {
    let form_id = form_id.trim();
    if form_id.is_empty() {
      return Err(Failure::Validation("form id is required".into()));
    }
    if !hash_form_id(form_id).eq_ignore_ascii_case(expected_hash.trim()) {
      warn!("form id rejected");
      return Err(Failure::AccessDenied);
    }
    Ok(form_id.to_string())
  }

  /// Submit a new version of a page (creation and edits alike).
  pub async fn submit_page(&self, form_id: &str, draft: PageDraft) -> Result<(), Failure> {
    let form_id = self.authorize(form_id, &self.config.creation_password_hash)?;
    let draft = draft.normalized();
    draft.validate()?;

    let form = draft.form_fields(&self.config.fields);
    self.post(&form_id, form).await?;
    info!(id = %draft.id, "page version submitted");
    Ok(())
  }

  /// Record a deletion request for `page_id`.
  pub async fn submit_deletion(&self, form_id: &str, page_id: &str) -> Result<(), Failure> {
    let form_id = self.authorize(form_id, &self.config.deletion_password_hash)?;
    let page_id = page_id.trim();
    if page_id.is_empty() {
      return Err(Failure::Validation("select a page to delete".into()));
    }

    let form = vec![(self.config.fields.deletion_id.clone(), page_id.to_string())];
    self.post(&form_id, form).await?;
    info!(id = %page_id, "deletion submitted");
    Ok(())
  }

  /// Any HTTP response counts as accepted; the endpoint's answer is opaque.
  async fn post(&self, form_id: &str, form: Vec<(String, String)>) -> Result<(), Failure> {
    let url = self.form_response_url(form_id)?;
    let request = Request::post_form(url.clone(), form);

    match self.transport.fetch(&request).await {
      Ok(response) => {
        info!(url = %url, status = response.status, "form endpoint answered");
        Ok(())
      }
      Err(e) => Err(Failure::Submission {
        url: url.to_string(),
        reason: e.to_string(),
      }),
    }
  }
}
