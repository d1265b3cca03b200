use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub sheets: SheetsConfig,
  pub forms: FormsConfig,
  pub offline: OfflineConfig,
  #[serde(default)]
  pub storage: StorageConfig,
  /// Write logs to this file instead of stderr
  pub log_file: Option<PathBuf>,
}

/// CSV export endpoints of the backing spreadsheets.
#[derive(Debug, Clone, Deserialize)]
pub struct SheetsConfig {
  /// Active page versions
  pub pages: Url,
  /// Deletion requests
  pub deleted: Url,
}

impl SheetsConfig {
  /// Endpoints that must always bypass the offline cache.
  pub fn endpoints(&self) -> Vec<Url> {
    vec![self.pages.clone(), self.deleted.clone()]
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FormsConfig {
  /// Submissions go to `{base_url}/{form_id}/formResponse`
  #[serde(default = "default_forms_base")]
  pub base_url: String,
  /// Hex SHA-1 of the creation form id
  pub creation_password_hash: String,
  /// Hex SHA-1 of the deletion form id
  pub deletion_password_hash: String,
  pub fields: FormFields,
}

/// Opaque form entry ids (e.g. `entry.1896761587`) for each page field.
#[derive(Debug, Clone, Deserialize)]
pub struct FormFields {
  pub id: String,
  pub title: String,
  pub subtitle: String,
  pub content: String,
  pub image: String,
  pub colour: String,
  pub external_link: String,
  pub custom_page: String,
  pub parent: String,
  pub category: String,
  /// Field of the deletion form carrying the page id
  pub deletion_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OfflineConfig {
  /// Versioned cache generation name; bump it to replace every cached asset
  pub cache_name: String,
  /// Site origin used to resolve manifest paths
  pub origin: Url,
  /// Core assets stored at install time
  #[serde(default = "default_manifest")]
  pub manifest: Vec<String>,
  /// Paths whose query string is ignored for cache lookups
  #[serde(default = "default_normalized_paths")]
  pub normalized_paths: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
  /// SQLite file (default: $XDG_DATA_HOME/pageshelf/cache.db)
  pub path: Option<PathBuf>,
}

fn default_forms_base() -> String {
  "https://docs.google.com/forms/d/e".to_string()
}

fn default_manifest() -> Vec<String> {
  [
    "/",
    "/index.html",
    "/pages/items.html",
    "/pages/single-item.html",
    "/styles.css",
    "/main.js",
    "/images/logoSAFA.png",
    "js/index.js",
    "js/items.js",
    "js/single-item.js",
  ]
  .into_iter()
  .map(String::from)
  .collect()
}

fn default_normalized_paths() -> Vec<String> {
  vec![
    "/pages/items.html".to_string(),
    "/pages/single-item.html".to_string(),
  ]
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./pageshelf.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/pageshelf/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/pageshelf/config.yaml\n\
                 See pageshelf.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("pageshelf.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("pageshelf").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;

    if config.offline.cache_name.trim().is_empty() {
      return Err(eyre!("offline.cache_name must not be empty"));
    }

    Ok(config)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const MINIMAL: &str = r#"
sheets:
  pages: https://docs.google.com/spreadsheets/d/AAA/export?format=csv
  deleted: https://docs.google.com/spreadsheets/d/BBB/export?format=csv
forms:
  creation_password_hash: "00"
  deletion_password_hash: "11"
  fields:
    id: entry.1
    title: entry.2
    subtitle: entry.3
    content: entry.4
    image: entry.5
    colour: entry.6
    external_link: entry.7
    custom_page: entry.8
    parent: entry.9
    category: entry.10
    deletion_id: entry.11
offline:
  cache_name: site-cache-v1
  origin: https://site.example
"#;

  #[test]
  fn test_minimal_config_fills_defaults() {
    let config = Config::from_yaml(MINIMAL).unwrap();

    assert_eq!(config.offline.manifest.len(), 10);
    assert_eq!(config.offline.normalized_paths, default_normalized_paths());
    assert_eq!(config.forms.base_url, "https://docs.google.com/forms/d/e");
    assert!(config.storage.path.is_none());
    assert_eq!(config.sheets.endpoints().len(), 2);
  }

  #[test]
  fn test_blank_cache_name_is_rejected() {
    let yaml = MINIMAL.replace("site-cache-v1", "\"  \"");
    assert!(Config::from_yaml(&yaml).is_err());
  }

  #[test]
  fn test_missing_explicit_path_is_an_error() {
    let err = Config::load(Some(Path::new("/nonexistent/pageshelf.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }

  #[test]
  fn test_load_from_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pageshelf.yaml");
    std::fs::write(&path, MINIMAL).unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(config.offline.cache_name, "site-cache-v1");
  }
}
