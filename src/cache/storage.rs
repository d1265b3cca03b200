//! SQLite implementation of both storage traits.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::traits::{CacheStorage, SnapshotStore};
use crate::error::Failure;
use crate::net::Response;

/// SQLite-based storage shared by the snapshot slot and the response caches.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

impl SqliteStorage {
  /// Open the storage at `path`, or at the default location when `None`.
  pub fn open(path: Option<&Path>) -> Result<Self, Failure> {
    let path = match path {
      Some(p) => p.to_path_buf(),
      None => Self::default_path()?,
    };

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| Failure::storage(format!("failed to create storage directory: {e}")))?;
    }

    let conn = Connection::open(&path).map_err(|e| {
      Failure::storage(format!(
        "failed to open storage at {}: {}",
        path.display(),
        e
      ))
    })?;

    Self::with_connection(conn)
  }

  /// Storage that lives only as long as this value.
  pub fn in_memory() -> Result<Self, Failure> {
    Self::with_connection(Connection::open_in_memory()?)
  }

  fn with_connection(conn: Connection) -> Result<Self, Failure> {
    let storage = Self {
      conn: Mutex::new(conn),
    };
    storage.run_migrations()?;
    Ok(storage)
  }

  /// Get the default database path.
  fn default_path() -> Result<PathBuf, Failure> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| Failure::storage("could not determine data directory"))?;

    Ok(data_dir.join("pageshelf").join("cache.db"))
  }

  fn run_migrations(&self) -> Result<(), Failure> {
    self
      .lock()?
      .execute_batch(SCHEMA)
      .map_err(|e| Failure::storage(format!("failed to run migrations: {e}")))
  }

  fn lock(&self) -> Result<MutexGuard<'_, Connection>, Failure> {
    self
      .conn
      .lock()
      .map_err(|e| Failure::storage(format!("lock poisoned: {e}")))
  }
}

const SCHEMA: &str = r#"
-- Durable key-value slot (page snapshot)
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    stored_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Named response caches; rowid order is creation order
CREATE TABLE IF NOT EXISTS cache_names (
    name TEXT PRIMARY KEY,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS cache_entries (
    cache_name TEXT NOT NULL,
    request_key TEXT NOT NULL,
    status INTEGER NOT NULL,
    content_type TEXT,
    body BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (cache_name, request_key)
);

CREATE INDEX IF NOT EXISTS idx_cache_entries_key ON cache_entries(request_key);

CREATE TABLE IF NOT EXISTS cache_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

const INSTALLED_KEY: &str = "installed_generation";

fn insert_entry(conn: &Connection, name: &str, key: &str, response: &Response) -> Result<(), Failure> {
  conn.execute(
    "INSERT OR IGNORE INTO cache_names (name) VALUES (?)",
    params![name],
  )?;
  conn.execute(
    "INSERT OR REPLACE INTO cache_entries (cache_name, request_key, status, content_type, body, cached_at)
     VALUES (?, ?, ?, ?, ?, datetime('now'))",
    params![name, key, response.status, response.content_type, response.body],
  )?;
  Ok(())
}

impl SnapshotStore for SqliteStorage {
  fn get(&self, key: &str) -> Result<Option<String>, Failure> {
    let conn = self.lock()?;
    let value = conn
      .query_row(
        "SELECT value FROM kv_store WHERE key = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()?;
    Ok(value)
  }

  fn set(&self, key: &str, value: &str) -> Result<(), Failure> {
    let conn = self.lock()?;
    conn.execute(
      "INSERT OR REPLACE INTO kv_store (key, value, stored_at) VALUES (?, ?, datetime('now'))",
      params![key, value],
    )?;
    Ok(())
  }
}

impl CacheStorage for SqliteStorage {
  fn cache_names(&self) -> Result<Vec<String>, Failure> {
    let conn = self.lock()?;
    let mut stmt = conn.prepare("SELECT name FROM cache_names ORDER BY rowid")?;
    let names = stmt
      .query_map([], |row| row.get(0))?
      .collect::<Result<Vec<String>, _>>()?;
    Ok(names)
  }

  fn has_cache(&self, name: &str) -> Result<bool, Failure> {
    let conn = self.lock()?;
    let found: Option<i64> = conn
      .query_row(
        "SELECT 1 FROM cache_names WHERE name = ?",
        params![name],
        |row| row.get(0),
      )
      .optional()?;
    Ok(found.is_some())
  }

  fn open_cache(&self, name: &str) -> Result<(), Failure> {
    let conn = self.lock()?;
    conn.execute(
      "INSERT OR IGNORE INTO cache_names (name) VALUES (?)",
      params![name],
    )?;
    Ok(())
  }

  fn match_any(&self, key: &str) -> Result<Option<Response>, Failure> {
    let conn = self.lock()?;
    let response = conn
      .query_row(
        "SELECT e.status, e.content_type, e.body FROM cache_entries e
         INNER JOIN cache_names n ON n.name = e.cache_name
         WHERE e.request_key = ?
         ORDER BY n.rowid
         LIMIT 1",
        params![key],
        |row| {
          Ok(Response {
            status: row.get(0)?,
            content_type: row.get(1)?,
            body: row.get(2)?,
          })
        },
      )
      .optional()?;
    Ok(response)
  }

  fn put(&self, name: &str, key: &str, response: &Response) -> Result<(), Failure> {
    let conn = self.lock()?;
    insert_entry(&conn, name, key, response)
  }

  fn put_all(&self, name: &str, entries: &[(String, Response)]) -> Result<(), Failure> {
    let mut conn = self.lock()?;
    let tx = conn.transaction()?;
    for (key, response) in entries {
      insert_entry(&tx, name, key, response)?;
    }
    tx.commit()?;
    Ok(())
  }

  fn delete_cache(&self, name: &str) -> Result<bool, Failure> {
    let mut conn = self.lock()?;
    let tx = conn.transaction()?;
    tx.execute(
      "DELETE FROM cache_entries WHERE cache_name = ?",
      params![name],
    )?;
    let removed = tx.execute("DELETE FROM cache_names WHERE name = ?", params![name])?;
    tx.commit()?;
    Ok(removed > 0)
  }

  fn entry_keys(&self, name: &str) -> Result<Vec<String>, Failure> {
    let conn = self.lock()?;
    let mut stmt = conn.prepare(
      "SELECT request_key FROM cache_entries WHERE cache_name = ? ORDER BY request_key",
    )?;
    let keys = stmt
      .query_map(params![name], |row| row.get(0))?
      .collect::<Result<Vec<String>, _>>()?;
    Ok(keys)
  }

  fn installed_generation(&self) -> Result<Option<String>, Failure> {
    let conn = self.lock()?;
    let value = conn
      .query_row(
        "SELECT value FROM cache_meta WHERE key = ?",
        params![INSTALLED_KEY],
        |row| row.get(0),
      )
      .optional()?;
    Ok(value)
  }

  fn mark_installed(&self, name: &str) -> Result<(), Failure> {
    let conn = self.lock()?;
    conn.execute(
      "INSERT OR REPLACE INTO cache_meta (key, value) VALUES (?, ?)",
      params![INSTALLED_KEY, name],
    )?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn page(body: &str) -> Response {
    Response {
      status: 200,
      content_type: Some("text/html".to_string()),
      body: body.as_bytes().to_vec(),
    }
  }

  #[test]
  fn test_kv_roundtrip_and_replace() {
    let storage = SqliteStorage::in_memory().unwrap();
    assert_eq!(storage.get("validPages").unwrap(), None);

    storage.set("validPages", "[1]").unwrap();
    storage.set("validPages", "[2]").unwrap();
    assert_eq!(storage.get("validPages").unwrap().as_deref(), Some("[2]"));
  }

  #[test]
  fn test_put_creates_cache_and_match_finds_entry() {
    let storage = SqliteStorage::in_memory().unwrap();
    storage.put("v1", "https://site/a", &page("a")).unwrap();

    assert!(storage.has_cache("v1").unwrap());
    assert_eq!(storage.match_any("https://site/a").unwrap(), Some(page("a")));
    assert_eq!(storage.match_any("https://site/b").unwrap(), None);
  }

  #[test]
  fn test_match_prefers_oldest_cache() {
    let storage = SqliteStorage::in_memory().unwrap();
    storage.put("old", "k", &page("old")).unwrap();
    storage.put("new", "k", &page("new")).unwrap();

    assert_eq!(storage.match_any("k").unwrap(), Some(page("old")));
    assert_eq!(storage.cache_names().unwrap(), vec!["old", "new"]);
  }

  #[test]
  fn test_delete_cache_removes_entries() {
    let storage = SqliteStorage::in_memory().unwrap();
    storage.put("old", "k", &page("old")).unwrap();

    assert!(storage.delete_cache("old").unwrap());
    assert!(!storage.delete_cache("old").unwrap());
    assert_eq!(storage.match_any("k").unwrap(), None);
    assert!(storage.entry_keys("old").unwrap().is_empty());
  }

  #[test]
  fn test_put_all_stores_batch() {
    let storage = SqliteStorage::in_memory().unwrap();
    let batch = vec![
      ("https://site/".to_string(), page("root")),
      ("https://site/styles.css".to_string(), page("css")),
    ];
    storage.put_all("v1", &batch).unwrap();

    assert_eq!(
      storage.entry_keys("v1").unwrap(),
      vec!["https://site/", "https://site/styles.css"]
    );
  }

  #[test]
  fn test_installed_generation_marker() {
    let storage = SqliteStorage::in_memory().unwrap();
    assert_eq!(storage.installed_generation().unwrap(), None);
    storage.mark_installed("v2").unwrap();
    assert_eq!(storage.installed_generation().unwrap().as_deref(), Some("v2"));
  }

  #[test]
  fn test_file_storage_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("cache.db");

    SqliteStorage::open(Some(&path))
      .unwrap()
      .set("validPages", "[]")
      .unwrap();

    let reopened = SqliteStorage::open(Some(&path)).unwrap();
    assert_eq!(reopened.get("validPages").unwrap().as_deref(), Some("[]"));
  }
}
