//! Terminal responses as seen by event listeners.

use bytes::Bytes;
use http::{HeaderMap, StatusCode, header::CONTENT_TYPE};
use url::Url;

/// A fully received response, before body decoding.
///
/// The raw body is kept as it arrived on the wire so it stays available for
/// diagnostics when decoding fails.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    url: Url,
    raw: Bytes,
}

impl Response {
    pub(crate) const fn new(status: StatusCode, headers: HeaderMap, url: Url, raw: Bytes) -> Self {
        Self {
            status,
            headers,
            url,
            raw,
        }
    }

    /// Status code of the response.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// URL that produced this response, after any redirects.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// The `Content-Type` header, if present and valid text.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    /// Body bytes exactly as received, still content-encoded.
    #[must_use]
    pub const fn raw_body(&self) -> &Bytes {
        &self.raw
    }
}
