//! In-memory transport for tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::Failure;

use super::{Request, Response, Transport};

/// Serves canned responses keyed by full URL and records every request.
///
/// Unknown URLs answer 404.
#[derive(Clone, Default)]
pub struct StubTransport {
  routes: Arc<Mutex<HashMap<String, Result<Response, String>>>>,
  log: Arc<Mutex<Vec<Request>>>,
}

impl StubTransport {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn respond(&self, url: &str, response: Response) {
    self
      .routes
      .lock()
      .unwrap()
      .insert(url.to_string(), Ok(response));
  }

  pub fn respond_text(&self, url: &str, body: &str) {
    self.respond(url, Response::ok(body));
  }

  /// Make requests to `url` fail at the network level.
  pub fn fail(&self, url: &str, reason: &str) {
    self
      .routes
      .lock()
      .unwrap()
      .insert(url.to_string(), Err(reason.to_string()));
  }

  pub fn requests(&self) -> Vec<Request> {
    self.log.lock().unwrap().clone()
  }

  pub fn hits(&self, url: &str) -> usize {
    self
      .log
      .lock()
      .unwrap()
      .iter()
      .filter(|r| r.url.as_str() == url)
      .count()
  }
}

impl Transport for StubTransport {
  async fn fetch(&self, request: &Request) -> Result<Response, Failure> {
    self.log.lock().unwrap().push(request.clone());

    let route = self.routes.lock().unwrap().get(request.url.as_str()).cloned();
    match route {
      Some(Ok(response)) => Ok(response),
      Some(Err(reason)) => Err(Failure::fetch(request.url.as_str(), reason)),
      None => Ok(Response::with_status(404)),
    }
  }
}
