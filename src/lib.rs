//! # Event-driven HTTP client
//! Restwave is an HTTP client that reports each request's lifecycle as a
//! stream of events.
//! It has a lot of features:
//! - Follow redirect (301, 302, 303, 307), with `303` switching to `GET`
//! - Abort, retry and timeouts on a stable handle
//! - gzip/deflate and charset aware decoding
//! - Content-type driven JSON, XML and YAML body codecs, extensible at runtime
//! - Form, JSON and streaming multipart bodies
//! - Bearer and Basic authentication
//! - Reusable API clients through [`Service`]
//!
//! # Quick start
//! ```rust,no_run
//! # async fn example() {
//! use restwave::{Event, get};
//! use futures_util::StreamExt;
//!
//! let mut request = get("https://example.com/", None);
//! while let Some(event) = request.next().await {
//!     match event {
//!         Event::Success { body, .. } => println!("{body:?}"),
//!         Event::Error { error, .. } => eprintln!("{error}"),
//!         Event::Complete(_) => break,
//!         _ => {}
//!     }
//! }
//! # }
//! ```
//!
//! Requests are spawned on the current Tokio runtime; every function that
//! starts one panics when called outside a runtime.

pub mod backend;
pub use backend::{DefaultBackend, Transport};
pub use client::Client;
pub use codec::{Body, Parser};
pub use error::{Error, ErrorKind, ParseError, Result};
pub use event::{Completion, Event, Outcome};
pub use options::{Decoding, Payload, Query, RequestOptions};
pub use request::{Controller, RequestHandle};
pub use response::Response;
pub use service::Service;

pub use http::{self, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
pub use serde_json::{Value, json};
pub use url::Url;

pub mod auth;
pub mod codec;
pub mod decode;
pub mod error;
pub mod multipart;
pub mod redirect;
pub mod retry;
pub mod timeout;

mod client;
mod event;
mod options;
mod request;
mod response;
mod service;

/// A client on the default transport.
#[must_use]
pub fn client() -> DefaultBackend {
    DefaultBackend::default()
}

/// Start a request with the method and body described by `options`.
pub fn request(url: &str, options: RequestOptions) -> RequestHandle {
    client().request(url, options)
}

/// `GET url`
pub fn get(url: &str, options: impl Into<Option<RequestOptions>>) -> RequestHandle {
    client().get(url, options)
}

/// `POST url`
pub fn post(url: &str, options: impl Into<Option<RequestOptions>>) -> RequestHandle {
    client().post(url, options)
}

/// `PUT url`
pub fn put(url: &str, options: impl Into<Option<RequestOptions>>) -> RequestHandle {
    client().put(url, options)
}

/// `DELETE url`
pub fn delete(url: &str, options: impl Into<Option<RequestOptions>>) -> RequestHandle {
    client().delete(url, options)
}

/// `PATCH url`
pub fn patch(url: &str, options: impl Into<Option<RequestOptions>>) -> RequestHandle {
    client().patch(url, options)
}

/// `HEAD url`
pub fn head(url: &str, options: impl Into<Option<RequestOptions>>) -> RequestHandle {
    client().head(url, options)
}

/// `GET url` with `data` as a JSON body.
pub fn json(url: &str, data: &Value, options: impl Into<Option<RequestOptions>>) -> RequestHandle {
    client().json(url, data, options)
}

/// `POST url` with `data` as a JSON body.
pub fn post_json(
    url: &str,
    data: &Value,
    options: impl Into<Option<RequestOptions>>,
) -> RequestHandle {
    client().post_json(url, data, options)
}

/// `PUT url` with `data` as a JSON body.
pub fn put_json(
    url: &str,
    data: &Value,
    options: impl Into<Option<RequestOptions>>,
) -> RequestHandle {
    client().put_json(url, data, options)
}

/// `PATCH url` with `data` as a JSON body.
pub fn patch_json(
    url: &str,
    data: &Value,
    options: impl Into<Option<RequestOptions>>,
) -> RequestHandle {
    client().patch_json(url, data, options)
}
