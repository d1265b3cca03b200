//! Snapshot layer: serve the stored snapshot, refresh on demand, and fall
//! back to the stored snapshot whenever a refresh fails.

use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::traits::{CacheResult, SnapshotStore};
use crate::error::Failure;

/// Orchestrates one snapshot slot in a [`SnapshotStore`].
///
/// The slot has no expiry. It is replaced wholesale after every successful
/// refresh and never touched when a refresh fails.
pub struct SnapshotLayer<S: SnapshotStore> {
  storage: Arc<S>,
  key: String,
}

impl<S: SnapshotStore> SnapshotLayer<S> {
  pub fn new(storage: Arc<S>, key: impl Into<String>) -> Self {
    Self {
      storage,
      key: key.into(),
    }
  }

  /// Read the stored snapshot. Unreadable or undecodable data counts as absent.
  pub fn cached<T: DeserializeOwned>(&self) -> Option<T> {
    let raw = match self.storage.get(&self.key) {
      Ok(Some(raw)) => raw,
      Ok(None) => return None,
      Err(e) => {
        error!(key = %self.key, error = %e, "failed to read snapshot");
        return None;
      }
    };

    match serde_json::from_str(&raw) {
      Ok(data) => Some(data),
      Err(e) => {
        error!(key = %self.key, error = %e, "stored snapshot is not decodable");
        None
      }
    }
  }

  /// Replace the stored snapshot.
  pub fn store<T: Serialize>(&self, data: &T) -> Result<(), Failure> {
    let raw = serde_json::to_string(data).map_err(Failure::storage)?;
    self.storage.set(&self.key, &raw)
  }

  /// Fetch with the snapshot policy.
  ///
  /// 1. Unless `force_fresh`, return the stored snapshot if there is one
  /// 2. Otherwise run `fetcher`; on success replace the snapshot and return
  ///    the fresh data (a failed write is logged, not returned)
  /// 3. On any fetcher failure return the stored snapshot, else `T::default()`
  pub async fn fetch<T, F, Fut>(&self, force_fresh: bool, fetcher: F) -> CacheResult<T>
  where
    T: Serialize + DeserializeOwned + Default,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, Failure>>,
  {
    if !force_fresh {
      if let Some(cached) = self.cached() {
        debug!(key = %self.key, "serving stored snapshot");
        return CacheResult::from_cache(cached);
      }
      info!(key = %self.key, "no stored snapshot, fetching fresh data");
    }

    match fetcher().await {
      Ok(data) => {
        match self.store(&data) {
          Ok(()) => debug!(key = %self.key, "snapshot replaced"),
          Err(e) => error!(key = %self.key, error = %e, "failed to persist snapshot"),
        }
        CacheResult::from_network(data)
      }
      Err(e) => {
        warn!(key = %self.key, error = %e, "refresh failed, falling back to stored snapshot");
        match self.cached() {
          Some(cached) => CacheResult::fallback(cached),
          None => CacheResult::empty(),
        }
      }
    }
  }
}

impl<S: SnapshotStore> Clone for SnapshotLayer<S> {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      key: self.key.clone(),
    }
  }
}
