//! Per-request configuration.

use core::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, header};

use crate::{codec::Parser, multipart::Form};

/// Query string source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Pairs that will be URL-encoded.
    Pairs(Vec<(String, String)>),
    /// A literal, already encoded query string.
    Raw(String),
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Query {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::Pairs(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<String>, const N: usize> From<[(K, V); N]> for Query {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl From<&str> for Query {
    fn from(value: &str) -> Self {
        Self::Raw(value.to_owned())
    }
}

/// Request body source.
#[derive(Debug, Clone)]
pub enum Payload {
    /// Fields sent as `application/x-www-form-urlencoded`.
    Form(Vec<(String, String)>),
    /// Text sent as-is.
    Text(String),
    /// Bytes sent as-is.
    Bytes(Bytes),
    /// Fields sent as `multipart/form-data`.
    Multipart(Form),
}

/// Final representation of a response body.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Decoding {
    /// UTF-8 text handed to the parser.
    #[default]
    Utf8,
    /// Raw bytes; no text conversion and no parser.
    Buffer,
    /// Each byte mapped to the code point of the same value (ISO-8859-1).
    Binary,
    /// Text in the named charset (any WHATWG encoding label).
    Charset(String),
}

/// Options recognised by [`request`](crate::request) and the verb helpers.
///
/// Every field is optional so that option sets can be layered with
/// [`RequestOptions::merge`].
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub(crate) method: Option<Method>,
    pub(crate) query: Option<Query>,
    pub(crate) data: Option<Payload>,
    pub(crate) headers: HeaderMap,
    pub(crate) username: Option<String>,
    pub(crate) password: Option<String>,
    pub(crate) access_token: Option<String>,
    pub(crate) follow_redirects: Option<bool>,
    pub(crate) max_redirects: Option<u32>,
    pub(crate) forward_credentials: Option<bool>,
    pub(crate) decoding: Option<Decoding>,
    pub(crate) parser: Option<Parser>,
    pub(crate) timeout: Option<Duration>,
}

/// Redirect hops followed when `max_redirects` is not set.
pub const DEFAULT_MAX_REDIRECTS: u32 = 10;

impl RequestOptions {
    /// Empty option set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the HTTP method. Defaults to POST when a body is present, GET otherwise.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Set the query string, used only when the URL carries none.
    #[must_use]
    pub fn query(mut self, query: impl Into<Query>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Send URL-encoded form fields.
    #[must_use]
    pub fn form<K, V>(mut self, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.data = Some(Payload::Form(
            fields
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        ));
        self
    }

    /// Send a text body.
    #[must_use]
    pub fn body(mut self, text: impl Into<String>) -> Self {
        self.data = Some(Payload::Text(text.into()));
        self
    }

    /// Send a binary body.
    #[must_use]
    pub fn bytes(mut self, bytes: impl Into<Bytes>) -> Self {
        self.data = Some(Payload::Bytes(bytes.into()));
        self
    }

    /// Send a JSON body with `Content-Type: application/json`.
    #[must_use]
    pub fn json_body(mut self, value: &serde_json::Value) -> Self {
        self.data = Some(Payload::Text(value.to_string()));
        self.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self
    }

    /// Send a `multipart/form-data` body.
    #[must_use]
    pub fn multipart(mut self, form: Form) -> Self {
        self.data = Some(Payload::Multipart(form));
        self
    }

    /// Set a header, replacing earlier values with the same name.
    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Merge a header map, replacing earlier values with the same names.
    #[must_use]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        merge_headers(&mut self.headers, &headers);
        self
    }

    /// Override the default `User-Agent`.
    #[must_use]
    pub fn user_agent(self, value: HeaderValue) -> Self {
        self.header(header::USER_AGENT, value)
    }

    /// Basic authentication credentials.
    #[must_use]
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Username for basic authentication.
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Password for basic authentication.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Bearer token. Ignored when basic credentials with a password are set.
    #[must_use]
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    /// Follow 301/302/303/307 responses (default: true).
    #[must_use]
    pub const fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = Some(follow);
        self
    }

    /// Maximum redirect hops per attempt (default: [`DEFAULT_MAX_REDIRECTS`]).
    #[must_use]
    pub const fn max_redirects(mut self, max: u32) -> Self {
        self.max_redirects = Some(max);
        self
    }

    /// Send option credentials and a user-set `Authorization` header to
    /// redirect targets on another origin (default: true).
    ///
    /// Userinfo embedded in a redirect target is always honoured.
    #[must_use]
    pub const fn forward_credentials(mut self, forward: bool) -> Self {
        self.forward_credentials = Some(forward);
        self
    }

    /// Final body representation.
    #[must_use]
    pub fn decoding(mut self, decoding: Decoding) -> Self {
        self.decoding = Some(decoding);
        self
    }

    /// Parser used instead of content-type dispatch.
    #[must_use]
    pub fn parser(mut self, parser: Parser) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Abort the request if no response arrives within `timeout`.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Layer `overrides` on top of `self`.
    ///
    /// Fields set in `overrides` win; headers are merged name by name.
    #[must_use]
    pub fn merge(&self, overrides: &Self) -> Self {
        let mut headers = self.headers.clone();
        merge_headers(&mut headers, &overrides.headers);
        Self {
            method: overrides.method.clone().or_else(|| self.method.clone()),
            query: overrides.query.clone().or_else(|| self.query.clone()),
            data: overrides.data.clone().or_else(|| self.data.clone()),
            headers,
            username: overrides.username.clone().or_else(|| self.username.clone()),
            password: overrides.password.clone().or_else(|| self.password.clone()),
            access_token: overrides
                .access_token
                .clone()
                .or_else(|| self.access_token.clone()),
            follow_redirects: overrides.follow_redirects.or(self.follow_redirects),
            max_redirects: overrides.max_redirects.or(self.max_redirects),
            forward_credentials: overrides.forward_credentials.or(self.forward_credentials),
            decoding: overrides.decoding.clone().or_else(|| self.decoding.clone()),
            parser: overrides.parser.clone().or_else(|| self.parser.clone()),
            timeout: overrides.timeout.or(self.timeout),
        }
    }

    pub(crate) fn effective_method(&self) -> Method {
        self.method.clone().unwrap_or_else(|| {
            if self.data.is_some() {
                Method::POST
            } else {
                Method::GET
            }
        })
    }

    pub(crate) fn follows_redirects(&self) -> bool {
        self.follow_redirects.unwrap_or(true)
    }

    pub(crate) fn redirect_limit(&self) -> u32 {
        self.max_redirects.unwrap_or(DEFAULT_MAX_REDIRECTS)
    }

    pub(crate) fn forwards_credentials(&self) -> bool {
        self.forward_credentials.unwrap_or(true)
    }

    /// Copy without username, password, token or `Authorization` header.
    pub(crate) fn without_credentials(&self) -> Self {
        let mut stripped = self.clone();
        stripped.username = None;
        stripped.password = None;
        stripped.access_token = None;
        stripped.headers.remove(header::AUTHORIZATION);
        stripped
    }
}

pub(crate) fn merge_headers(target: &mut HeaderMap, overrides: &HeaderMap) {
    for name in overrides.keys() {
        target.remove(name);
        for value in overrides.get_all(name) {
            target.append(name.clone(), value.clone());
        }
    }
}
