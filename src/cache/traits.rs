//! Core traits and types for the storage layer.

use crate::error::Failure;
use crate::net::Response;

/// A durable key-value slot. No transactions, no schema versioning.
pub trait SnapshotStore: Send + Sync {
  fn get(&self, key: &str) -> Result<Option<String>, Failure>;

  /// Replace the value stored under `key`.
  fn set(&self, key: &str, value: &str) -> Result<(), Failure>;
}

/// Cache-by-name response storage.
pub trait CacheStorage: Send + Sync {
  /// Names of every cache, in creation order.
  fn cache_names(&self) -> Result<Vec<String>, Failure>;

  fn has_cache(&self, name: &str) -> Result<bool, Failure>;

  /// Create the named cache if it does not exist yet.
  fn open_cache(&self, name: &str) -> Result<(), Failure>;

  /// Look `key` up across every cache, oldest cache first.
  fn match_any(&self, key: &str) -> Result<Option<Response>, Failure>;

  fn put(&self, name: &str, key: &str, response: &Response) -> Result<(), Failure>;

  /// Store a batch in one transaction: either every entry lands or none does.
  fn put_all(&self, name: &str, entries: &[(String, Response)]) -> Result<(), Failure>;

  /// Drop a cache with all its entries. Returns whether it existed.
  fn delete_cache(&self, name: &str) -> Result<bool, Failure>;

  /// Request keys stored in the named cache.
  fn entry_keys(&self, name: &str) -> Result<Vec<String>, Failure>;

  /// The cache generation whose install last completed.
  fn installed_generation(&self) -> Result<Option<String>, Failure>;

  fn mark_installed(&self, name: &str) -> Result<(), Failure>;
}

/// Result of a snapshot read, including where the data came from.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  pub data: T,
  pub source: CacheSource,
}

impl<T> CacheResult<T> {
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
    }
  }

  pub fn from_cache(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
    }
  }

  /// Refresh failed; serving the last good snapshot.
  pub fn fallback(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Fallback,
    }
  }
}

impl<T: Default> CacheResult<T> {
  /// Refresh failed and there was nothing cached.
  pub fn empty() -> Self {
    Self {
      data: T::default(),
      source: CacheSource::Empty,
    }
  }
}

/// Indicates where snapshot data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Freshly fetched and reconciled
  Network,
  /// Stored snapshot, no refresh attempted
  Cache,
  /// Stored snapshot, served because the refresh failed
  Fallback,
  /// Refresh failed and no snapshot exists
  Empty,
}
