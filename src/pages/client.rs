use tracing::debug;
use url::Url;

use crate::error::Failure;
use crate::net::{Request, Transport};

use super::tabular::{parse_tabular, Row};

/// Reads CSV exports of the backing spreadsheet.
#[derive(Clone)]
pub struct SheetsClient<T: Transport> {
  transport: T,
}

impl<T: Transport> SheetsClient<T> {
  pub fn new(transport: T) -> Self {
    Self { transport }
  }

  /// Fetch and parse one CSV export.
  pub async fn fetch_rows(&self, url: &Url) -> Result<Vec<Row>, Failure> {
    let response = self.transport.fetch(&Request::get(url.clone())).await?;
    if !response.is_success() {
      return Err(Failure::fetch(
        url.as_str(),
        format!("unexpected status {}", response.status),
      ));
    }

    let rows = parse_tabular(&response.text())?;
    debug!(url = %url, rows = rows.len(), "fetched sheet export");
    Ok(rows)
  }
}
