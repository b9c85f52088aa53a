use std::sync::Arc;

use http::Method;
use serde_json::Value;

use crate::{
    backend::Transport,
    options::RequestOptions,
    request::{self, RequestHandle},
};

/// The verb surface shared by transports, [`Service`](crate::Service)s and
/// user-defined API clients.
///
/// Only [`request`](Self::request) is required. Implement it, typically by
/// delegating to an embedded [`Service`](crate::Service), to give an API type
/// every verb helper.
///
/// The helpers force the HTTP method; every other option is taken from the
/// `options` argument (`None` means defaults).
pub trait Client {
    /// Start a request. Its events are delivered through the returned handle.
    fn request(&self, url: &str, options: RequestOptions) -> RequestHandle;

    /// Start a request with an explicit method.
    fn method(
        &self,
        method: Method,
        url: &str,
        options: impl Into<Option<RequestOptions>>,
    ) -> RequestHandle {
        let mut options = options.into().unwrap_or_default();
        options.method = Some(method);
        self.request(url, options)
    }

    /// `GET url`
    fn get(&self, url: &str, options: impl Into<Option<RequestOptions>>) -> RequestHandle {
        self.method(Method::GET, url, options)
    }

    /// `POST url`
    fn post(&self, url: &str, options: impl Into<Option<RequestOptions>>) -> RequestHandle {
        self.method(Method::POST, url, options)
    }

    /// `PUT url`
    fn put(&self, url: &str, options: impl Into<Option<RequestOptions>>) -> RequestHandle {
        self.method(Method::PUT, url, options)
    }

    /// `DELETE url`
    fn delete(&self, url: &str, options: impl Into<Option<RequestOptions>>) -> RequestHandle {
        self.method(Method::DELETE, url, options)
    }

    /// `PATCH url`
    fn patch(&self, url: &str, options: impl Into<Option<RequestOptions>>) -> RequestHandle {
        self.method(Method::PATCH, url, options)
    }

    /// `HEAD url`
    fn head(&self, url: &str, options: impl Into<Option<RequestOptions>>) -> RequestHandle {
        self.method(Method::HEAD, url, options)
    }

    /// `GET url` with `data` as a JSON body.
    fn json(
        &self,
        url: &str,
        data: &Value,
        options: impl Into<Option<RequestOptions>>,
    ) -> RequestHandle {
        self.method(Method::GET, url, with_json(options, data))
    }

    /// `POST url` with `data` as a JSON body.
    fn post_json(
        &self,
        url: &str,
        data: &Value,
        options: impl Into<Option<RequestOptions>>,
    ) -> RequestHandle {
        self.method(Method::POST, url, with_json(options, data))
    }

    /// `PUT url` with `data` as a JSON body.
    fn put_json(
        &self,
        url: &str,
        data: &Value,
        options: impl Into<Option<RequestOptions>>,
    ) -> RequestHandle {
        self.method(Method::PUT, url, with_json(options, data))
    }

    /// `PATCH url` with `data` as a JSON body.
    fn patch_json(
        &self,
        url: &str,
        data: &Value,
        options: impl Into<Option<RequestOptions>>,
    ) -> RequestHandle {
        self.method(Method::PATCH, url, with_json(options, data))
    }
}

fn with_json(options: impl Into<Option<RequestOptions>>, data: &Value) -> RequestOptions {
    options.into().unwrap_or_default().json_body(data)
}

/// Every cloneable transport is a client; each request runs on its own copy.
///
/// Requests are spawned on the current Tokio runtime, so calling any verb
/// outside of one panics.
impl<T: Transport + Clone> Client for T {
    fn request(&self, url: &str, options: RequestOptions) -> RequestHandle {
        request::spawn(Arc::new(self.clone()), url, options)
    }
}
