//! Messages from foreground contexts to the cache controller.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use super::CacheController;
use crate::cache::CacheStorage;
use crate::net::Transport;

/// Recognized controller messages, e.g. `{"action": "update-cache"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum ControllerMessage {
  /// Re-fetch the manifest and drop stale cache generations
  UpdateCache,
}

impl ControllerMessage {
  /// `None` for anything that is not a recognized message.
  pub fn parse(raw: Value) -> Option<Self> {
    serde_json::from_value(raw).ok()
  }
}

/// Fire-and-forget channel into a running controller.
///
/// Messages are handled one at a time in arrival order. Nothing is sent back;
/// outcomes are only visible in the logs.
pub struct MessageChannel {
  tx: mpsc::UnboundedSender<Value>,
  handle: JoinHandle<()>,
}

impl MessageChannel {
  pub fn spawn<T, S>(controller: CacheController<T, S>) -> Self
  where
    T: Transport + Clone + 'static,
    S: CacheStorage + 'static,
  {
    let (tx, mut rx) = mpsc::unbounded_channel::<Value>();

    let handle = tokio::spawn(async move {
      while let Some(raw) = rx.recv().await {
        match ControllerMessage::parse(raw) {
          Some(ControllerMessage::UpdateCache) => controller.refresh().await,
          None => debug!("ignoring unrecognized controller message"),
        }
      }
    });

    Self { tx, handle }
  }

  /// Post a message. Returns false if the controller has stopped.
  pub fn post(&self, message: Value) -> bool {
    self.tx.send(message).is_ok()
  }

  /// Stop accepting messages and wait for queued ones to finish.
  ///
  /// Returns false if the message loop died, e.g. from a panic while
  /// handling a message.
  pub async fn close(self) -> bool {
    drop(self.tx);
    match self.handle.await {
      Ok(()) => true,
      Err(e) => {
        error!(error = %e, "controller message loop stopped abnormally");
        false
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::SqliteStorage;
  use crate::config::OfflineConfig;
  use crate::error::Failure;
  use crate::net::{Request, Response};
  use serde_json::json;
  use std::sync::Arc;

  #[derive(Clone)]
  struct PanickingTransport;

  impl Transport for PanickingTransport {
    async fn fetch(&self, _request: &Request) -> Result<Response, Failure> {
      panic!("transport blew up");
    }
  }

  #[test]
  fn test_parse_update_cache() {
    assert_eq!(
      ControllerMessage::parse(json!({ "action": "update-cache" })),
      Some(ControllerMessage::UpdateCache)
    );
  }

  #[test]
  fn test_parse_rejects_unknown_shapes() {
    assert_eq!(ControllerMessage::parse(json!({ "action": "nuke" })), None);
    assert_eq!(ControllerMessage::parse(json!("update-cache")), None);
    assert_eq!(ControllerMessage::parse(json!({})), None);
  }

  #[tokio::test]
  async fn test_close_reports_a_crashed_message_loop() {
    let config = OfflineConfig {
      cache_name: "cache-v1".into(),
      origin: "https://site.test/".parse().unwrap(),
      manifest: vec!["/".into()],
      normalized_paths: Vec::new(),
    };
    let storage = Arc::new(SqliteStorage::in_memory().unwrap());
    let controller = CacheController::new(PanickingTransport, storage, &config, &[]).unwrap();

    let channel = MessageChannel::spawn(controller);
    assert!(channel.post(json!({ "action": "update-cache" })));
    assert!(!channel.close().await);
  }
}
