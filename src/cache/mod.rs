//! Durable local storage for the site.
//!
//! Two independent stores live in the same SQLite file:
//! - a key-value slot holding the last reconciled page snapshot
//! - named response caches owned by the offline cache controller
//!
//! [`SnapshotLayer`] wraps the key-value slot with the serve-cached,
//! refresh-on-demand, fall-back-on-failure policy.

mod layer;
mod storage;
mod traits;

pub use layer::SnapshotLayer;
pub use storage::SqliteStorage;
pub use traits::{CacheResult, CacheSource, CacheStorage, SnapshotStore};
