//! Valid-page query with a durable snapshot in front of the sheet exports.

use std::sync::Arc;

use tracing::{info, warn};

use crate::cache::{CacheResult, SnapshotLayer, SnapshotStore};
use crate::config::SheetsConfig;
use crate::error::Failure;
use crate::net::Transport;

use super::client::SheetsClient;
use super::export;
use super::reconcile::{deletion_ids, exclude_deleted, most_recent_per_identifier};
use super::types::Page;

/// Key of the snapshot slot.
pub const SNAPSHOT_KEY: &str = "validPages";

/// Sheet client with a snapshot cache.
///
/// Every read failure is absorbed: callers always get a page list, possibly
/// stale, possibly empty. Concurrent refreshes race on the snapshot slot and
/// the last writer wins.
pub struct CachedPagesClient<T: Transport, S: SnapshotStore> {
  inner: SheetsClient<T>,
  cache: SnapshotLayer<S>,
  sheets: SheetsConfig,
}

impl<T: Transport, S: SnapshotStore> CachedPagesClient<T, S> {
  pub fn new(transport: T, storage: Arc<S>, sheets: SheetsConfig) -> Self {
    Self {
      inner: SheetsClient::new(transport),
      cache: SnapshotLayer::new(storage, SNAPSHOT_KEY),
      sheets,
    }
  }

  /// The current valid pages: latest version of every page, minus deleted
  /// ones.
  ///
  /// Serves the stored snapshot unless `force_fresh` is set or there is no
  /// snapshot yet. A refresh that fails, or whose page export has no rows,
  /// leaves the snapshot untouched and serves it instead.
  pub async fn valid_pages(&self, force_fresh: bool) -> CacheResult<Vec<Page>> {
    info!(force_fresh, "loading valid pages");
    let result = self.cache.fetch(force_fresh, || self.reconcile()).await;
    info!(source = ?result.source, count = result.data.len(), "valid pages ready");
    result
  }

  /// Fresh valid pages rendered as CSV.
  pub async fn export_csv(&self) -> Result<String, Failure> {
    let pages = self.valid_pages(true).await;
    export::to_csv(&pages.data)
  }

  async fn reconcile(&self) -> Result<Vec<Page>, Failure> {
    let (active, deleted) = tokio::join!(
      self.inner.fetch_rows(&self.sheets.pages),
      self.inner.fetch_rows(&self.sheets.deleted),
    );

    let active = active?;
    if active.is_empty() {
      return Err(Failure::fetch(self.sheets.pages.as_str(), "export has no rows"));
    }

    let deleted = deleted?;
    if deleted.is_empty() {
      warn!("deletion table is empty, nothing to filter");
    }

    let recent = most_recent_per_identifier(&active);
    let valid = exclude_deleted(recent, &deletion_ids(&deleted));
    info!(rows = active.len(), valid = valid.len(), "reconciled page exports");

    Ok(valid)
  }
}
