//! Unified error types for restwave.
//!
//! Every failure of a request is recovered inside the engine and delivered to
//! the caller as an [`Event::Error`](crate::Event::Error) payload. This module
//! defines that payload:
//! - Network transport errors (connection failures, DNS errors, etc.)
//! - Redirect-following failures
//! - Response decoding errors (decompression and body parsing)
//! - Synthetic abort and timeout errors

use core::time::Duration;
use std::borrow::Cow;
use std::error::Error as StdError;

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Unified error type for all restwave operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Network transport layer error (connection failed, DNS resolution failed, etc.).
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn StdError + Send + Sync>),

    /// URI parsing error.
    #[error("invalid URI: {0}")]
    InvalidUri(String),

    /// Request construction error (invalid headers, body, etc.).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Too many redirects were followed.
    #[error("failed to follow redirect: too many redirects (max {max})")]
    TooManyRedirects {
        /// Maximum number of redirects allowed
        max: u32,
    },

    /// A redirect response could not be followed (missing or malformed `Location`).
    #[error("failed to follow redirect: {0}")]
    Redirect(String),

    /// The `Content-Encoding` of the response could not be undone.
    #[error("Failed to decompress {encoding} body: {source}")]
    Decompress {
        /// Content coding named by the response (`gzip`, `deflate`).
        encoding: String,
        /// Underlying decoder failure.
        #[source]
        source: std::io::Error,
    },

    /// A body codec rejected the response body.
    #[error("Failed to parse {format} body: {source}")]
    Parse {
        /// Name of the codec that failed (`JSON`, `XML`, `YAML`, ...).
        format: Cow<'static, str>,
        /// Message produced by the codec.
        #[source]
        source: ParseError,
    },

    /// The request was aborted with an explicit reason.
    #[error("request aborted: {0}")]
    Aborted(String),

    /// The request did not receive a response within the configured deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error (file operations, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure reported by a body codec.
///
/// A codec returns this when the body is malformed; an empty body is not a
/// failure and decodes to a null value instead.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ParseError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl ParseError {
    /// Create a parse error from a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap the error of an underlying parser, keeping its message.
    pub fn wrap(source: impl StdError + Send + Sync + 'static) -> Self {
        Self {
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// The codec's message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Error {
    pub(crate) fn transport(error: impl StdError + Send + Sync + 'static) -> Self {
        Self::Transport(Box::new(error))
    }

    /// Check if this is a network transport error.
    pub const fn is_network_error(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Check if this is a timeout error.
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// Check if this error was produced by an explicit abort.
    pub const fn is_abort(&self) -> bool {
        matches!(self, Self::Aborted(_))
    }

    /// Check if this is a redirect-related error.
    pub const fn is_redirect_error(&self) -> bool {
        matches!(self, Self::TooManyRedirects { .. } | Self::Redirect(_))
    }

    /// Check if this error happened while decoding the response body.
    pub const fn is_decode_error(&self) -> bool {
        matches!(self, Self::Decompress { .. } | Self::Parse { .. })
    }

    /// Check if this is a request construction error.
    pub const fn is_request_error(&self) -> bool {
        matches!(self, Self::InvalidRequest(_) | Self::InvalidUri(_))
    }

    /// Get the error category/kind.
    ///
    /// Useful for logging and monitoring.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transport,
            Self::InvalidUri(_) | Self::InvalidRequest(_) => ErrorKind::Request,
            Self::TooManyRedirects { .. } | Self::Redirect(_) => ErrorKind::Redirect,
            Self::Decompress { .. } | Self::Parse { .. } => ErrorKind::Decode,
            Self::Aborted(_) => ErrorKind::Abort,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

/// Error category labels.
///
/// Used for classifying errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Transport/network error
    Transport,
    /// Request construction error
    Request,
    /// Redirect error
    Redirect,
    /// Decompression or body parsing error
    Decode,
    /// Explicit abort
    Abort,
    /// Timeout error
    Timeout,
    /// I/O error
    Io,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport => write!(f, "transport"),
            Self::Request => write!(f, "request"),
            Self::Redirect => write!(f, "redirect"),
            Self::Decode => write!(f, "decode"),
            Self::Abort => write!(f, "abort"),
            Self::Timeout => write!(f, "timeout"),
            Self::Io => write!(f, "io"),
        }
    }
}
