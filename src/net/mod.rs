//! Network transport abstraction.
//!
//! Everything that talks to the outside world goes through [`Transport`], so
//! the offline cache controller can sit in front of the real HTTP client
//! without the callers noticing.

#[cfg(test)]
pub mod testing;

use std::future::Future;

use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::error::Failure;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
  Get,
  Post,
}

/// An outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
  pub method: Method,
  pub url: Url,
  /// Form-encoded body fields (POST only)
  pub form: Vec<(String, String)>,
}

impl Request {
  pub fn get(url: Url) -> Self {
    Self {
      method: Method::Get,
      url,
      form: Vec::new(),
    }
  }

  pub fn post_form(url: Url, form: Vec<(String, String)>) -> Self {
    Self {
      method: Method::Post,
      url,
      form,
    }
  }
}

/// A fully buffered response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
  pub status: u16,
  pub content_type: Option<String>,
  pub body: Vec<u8>,
}

impl Response {
  #[cfg(test)]
  pub fn ok(body: impl Into<Vec<u8>>) -> Self {
    Self {
      status: 200,
      content_type: None,
      body: body.into(),
    }
  }

  #[cfg(test)]
  pub fn with_status(status: u16) -> Self {
    Self {
      status,
      content_type: None,
      body: Vec::new(),
    }
  }

  /// Only a plain 200 counts as cacheable success.
  pub fn is_success(&self) -> bool {
    self.status == 200
  }

  pub fn text(&self) -> String {
    String::from_utf8_lossy(&self.body).into_owned()
  }
}

/// Something that can turn a [`Request`] into a [`Response`].
pub trait Transport: Send + Sync {
  fn fetch(&self, request: &Request) -> impl Future<Output = Result<Response, Failure>> + Send;
}

/// Transport backed by a shared `reqwest` client.
#[derive(Clone)]
pub struct HttpTransport {
  client: reqwest::Client,
}

impl HttpTransport {
  pub fn new() -> Result<Self, Failure> {
    let client = reqwest::Client::builder()
      .user_agent(concat!("pageshelf/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| Failure::fetch("<client>", e))?;

    Ok(Self { client })
  }
}

impl Transport for HttpTransport {
  async fn fetch(&self, request: &Request) -> Result<Response, Failure> {
    let builder = match request.method {
      Method::Get => self.client.get(request.url.clone()),
      Method::Post => self.client.post(request.url.clone()).form(&request.form),
    };

    let response = builder
      .send()
      .await
      .map_err(|e| Failure::fetch(request.url.as_str(), e))?;

    let status = response.status().as_u16();
    let content_type = response
      .headers()
      .get(CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .map(String::from);

    let body = response
      .bytes()
      .await
      .map_err(|e| Failure::fetch(request.url.as_str(), e))?
      .to_vec();

    Ok(Response {
      status,
      content_type,
      body,
    })
  }
}
