//! Cache keys for intercepted requests.

use url::Url;

/// `origin + path`, without query or fragment.
pub fn origin_and_path(url: &Url) -> String {
  let mut bare = url.clone();
  bare.set_query(None);
  bare.set_fragment(None);
  bare.to_string()
}

/// Decides how a request URL maps onto a cache key.
#[derive(Debug, Clone)]
pub struct KeyRules {
  normalized_paths: Vec<String>,
  excluded: Vec<String>,
}

impl KeyRules {
  /// `normalized_paths` lose their query string when used as keys;
  /// `excluded` URLs (compared without query) never touch the cache.
  pub fn new(normalized_paths: &[String], excluded: &[Url]) -> Self {
    Self {
      normalized_paths: normalized_paths.to_vec(),
      excluded: excluded.iter().map(origin_and_path).collect(),
    }
  }

  pub fn is_excluded(&self, url: &Url) -> bool {
    self.excluded.contains(&origin_and_path(url))
  }

  pub fn cache_key(&self, url: &Url) -> String {
    if self.normalized_paths.iter().any(|p| p == url.path()) {
      origin_and_path(url)
    } else {
      let mut key = url.clone();
      key.set_fragment(None);
      key.to_string()
    }
  }
}
