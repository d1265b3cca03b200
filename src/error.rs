//! Failure taxonomy shared by the reconciliation layer, the offline cache
//! controller and the forms client.

use thiserror::Error;

/// Everything that can go wrong below the CLI.
///
/// Read-path failures are absorbed by [`crate::pages::CachedPagesClient`];
/// write-path failures are surfaced to whoever started the submission.
#[derive(Debug, Error)]
pub enum Failure {
  /// Remote endpoint errored, or answered with nothing usable.
  #[error("fetch failed for {url}: {reason}")]
  Fetch { url: String, reason: String },
  /// Tabular text could not be read.
  #[error("malformed tabular data: {0}")]
  Parse(String),
  /// Durable storage could not be read or written.
  #[error("storage failure: {0}")]
  Storage(String),
  /// Network-level error while posting a form.
  #[error("submission to {url} failed: {reason}")]
  Submission { url: String, reason: String },
  #[error("access denied: form id does not match")]
  AccessDenied,
  #[error("invalid input: {0}")]
  Validation(String),
}

impl Failure {
  pub fn fetch(url: impl Into<String>, reason: impl ToString) -> Self {
    Self::Fetch {
      url: url.into(),
      reason: reason.to_string(),
    }
  }

  pub fn storage(reason: impl ToString) -> Self {
    Self::Storage(reason.to_string())
  }
}

impl From<rusqlite::Error> for Failure {
  fn from(e: rusqlite::Error) -> Self {
    Self::Storage(e.to_string())
  }
}

impl From<csv::Error> for Failure {
  fn from(e: csv::Error) -> Self {
    Self::Parse(e.to_string())
  }
}
