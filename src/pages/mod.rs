//! Page catalogue: the spreadsheet-backed record set and everything derived
//! from it.

mod cached_client;
mod client;
pub mod export;
pub mod navigation;
pub mod order;
pub mod reconcile;
pub mod tabular;
pub mod timestamp;
mod types;

pub use cached_client::CachedPagesClient;
pub use types::Page;
