//! Offline cache controller.
//!
//! Sits in front of the network transport and keeps one versioned
//! generation of cached responses:
//! - **install** stores the core asset manifest as one all-or-nothing batch
//! - **activate** deletes every other generation, then takes control
//! - **intercept** serves cached responses and caches clean network ones
//! - **refresh** (via an `update-cache` message) re-fetches the
//!   manifest and drops stale generations without a version bump
//!
//! The sheet export endpoints are never read from or written to the cache.

mod key;
mod message;

pub use key::KeyRules;
pub use message::MessageChannel;

use futures::future::try_join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::cache::CacheStorage;
use crate::config::OfflineConfig;
use crate::error::Failure;
use crate::net::{Method, Request, Response, Transport};

pub struct CacheController<T: Transport, S: CacheStorage> {
  network: T,
  storage: Arc<S>,
  cache_name: String,
  manifest: Vec<Url>,
  keys: KeyRules,
  /// Set once activation finished; before that every request goes straight
  /// to the network
  claimed: Arc<AtomicBool>,
}

impl<T: Transport, S: CacheStorage> CacheController<T, S> {
  /// `excluded` are the endpoints that must always bypass the cache.
  pub fn new(
    network: T,
    storage: Arc<S>,
    config: &OfflineConfig,
    excluded: &[Url],
  ) -> Result<Self, Failure> {
    let manifest = config
      .manifest
      .iter()
      .map(|path| {
        config
          .origin
          .join(path)
          .map_err(|e| Failure::Validation(format!("bad manifest entry {path}: {e}")))
      })
      .collect::<Result<Vec<_>, _>>()?;

    Ok(Self {
      network,
      storage,
      cache_name: config.cache_name.clone(),
      manifest,
      keys: KeyRules::new(&config.normalized_paths, excluded),
      claimed: Arc::new(AtomicBool::new(false)),
    })
  }

  pub fn cache_name(&self) -> &str {
    &self.cache_name
  }

  pub fn is_claimed(&self) -> bool {
    self.claimed.load(Ordering::Acquire)
  }

  /// Bring the controller up: install the current generation if it has not
  /// been installed yet, activate, and take control.
  ///
  /// Failures are logged only. A failed install keeps older generations
  /// around and the controller still takes control so whatever is cached
  /// keeps being served.
  pub async fn start(&self) {
    let installed = self.storage.installed_generation().unwrap_or_else(|e| {
      error!(error = %e, "failed to read installed cache generation");
      None
    });

    if installed.as_deref() != Some(self.cache_name.as_str()) {
      info!(cache = %self.cache_name, "installing cache generation");
      match self.install().await {
        Ok(count) => {
          info!(cache = %self.cache_name, count, "all files are cached");
          if let Err(e) = self.storage.mark_installed(&self.cache_name) {
            error!(error = %e, "failed to record installed cache generation");
          }
        }
        Err(e) => {
          error!(cache = %self.cache_name, error = %e, "install failed, keeping previous generations");
          self.claim();
          return;
        }
      }
    }

    if let Err(e) = self.activate() {
      error!(error = %e, "failed to activate cache generation");
      self.claim();
    }
  }

  /// Store every manifest asset in the current generation.
  ///
  /// All assets are fetched first; if any of them fails nothing is stored.
  pub async fn install(&self) -> Result<usize, Failure> {
    self.add_all().await
  }

  /// Delete every generation except the current one, then take control.
  pub fn activate(&self) -> Result<usize, Failure> {
    let removed = self.delete_stale_caches()?;
    self.claim();
    info!(cache = %self.cache_name, removed, "cache generation active");
    Ok(removed)
  }

  /// Handle the `update-cache` command: re-fetch the manifest into the
  /// current generation, then drop every other generation. The two steps
  /// fail independently.
  pub async fn refresh(&self) {
    info!(cache = %self.cache_name, "triggering cache update");

    match self.add_all().await {
      Ok(count) => info!(count, "cache updated successfully"),
      Err(e) => error!(error = %e, "failed to update cache"),
    }

    match self.delete_stale_caches() {
      Ok(removed) => info!(removed, "old caches deleted successfully"),
      Err(e) => error!(error = %e, "failed to delete old caches"),
    }
  }

  /// Intercept one request.
  pub async fn handle_fetch(&self, request: &Request) -> Result<Response, Failure> {
    if !self.is_claimed() || request.method != Method::Get {
      return self.network.fetch(request).await;
    }

    if self.keys.is_excluded(&request.url) {
      debug!(url = %request.url, "bypassing cache for excluded url");
      return self.network.fetch(request).await;
    }

    let key = self.keys.cache_key(&request.url);
    match self.storage.match_any(&key) {
      Ok(Some(cached)) => {
        debug!(key = %key, "serving from cache");
        return Ok(cached);
      }
      Ok(None) => {}
      Err(e) => warn!(key = %key, error = %e, "cache lookup failed, using network"),
    }

    let response = self.network.fetch(request).await?;
    if response.is_success() {
      match self.storage.put(&self.cache_name, &key, &response) {
        Ok(()) => debug!(key = %key, "cached network response"),
        Err(e) => warn!(key = %key, error = %e, "failed to cache network response"),
      }
    }

    Ok(response)
  }

  fn claim(&self) {
    self.claimed.store(true, Ordering::Release);
  }

  async fn add_all(&self) -> Result<usize, Failure> {
    let fetches = self.manifest.iter().map(|url| async move {
      let response = self.network.fetch(&Request::get(url.clone())).await?;
      if !response.is_success() {
        return Err(Failure::fetch(
          url.as_str(),
          format!("unexpected status {}", response.status),
        ));
      }
      Ok((url.to_string(), response))
    });

    let entries = try_join_all(fetches).await?;
    self.storage.open_cache(&self.cache_name)?;
    self.storage.put_all(&self.cache_name, &entries)?;
    Ok(entries.len())
  }

  fn delete_stale_caches(&self) -> Result<usize, Failure> {
    let mut removed = 0;
    for name in self.storage.cache_names()? {
      if name != self.cache_name {
        info!(cache = %name, "deleting old cache");
        self.storage.delete_cache(&name)?;
        removed += 1;
      }
    }
    Ok(removed)
  }
}

impl<T: Transport, S: CacheStorage> Transport for CacheController<T, S> {
  async fn fetch(&self, request: &Request) -> Result<Response, Failure> {
    self.handle_fetch(request).await
  }
}

impl<T: Transport + Clone, S: CacheStorage> Clone for CacheController<T, S> {
  fn clone(&self) -> Self {
    Self {
      network: self.network.clone(),
      storage: Arc::clone(&self.storage),
      cache_name: self.cache_name.clone(),
      manifest: self.manifest.clone(),
      keys: self.keys.clone(),
      claimed: Arc::clone(&self.claimed),
    }
  }
}
