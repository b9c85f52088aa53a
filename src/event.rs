//! Lifecycle events delivered through a [`RequestHandle`](crate::RequestHandle).
//!
//! Every attempt that reaches an end produces exactly one terminal pair:
//! `success`, `fail` or `error`, followed by `complete`. A successful decode
//! also emits the status class (`2XX`) and exact status (`200`) events
//! between the two.

use core::time::Duration;
use std::{borrow::Cow, sync::Arc};

use http::StatusCode;

use crate::{codec::Body, error::Error, response::Response};

/// One lifecycle notification.
#[derive(Debug, Clone)]
pub enum Event {
    /// The terminal response of an attempt was received, before decoding.
    Response(Arc<Response>),
    /// The attempt failed.
    Error {
        /// What went wrong.
        error: Arc<Error>,
        /// The response, when the failure happened after one arrived.
        response: Option<Arc<Response>>,
    },
    /// Decoded response with a status below 400.
    Success {
        /// Decoded body.
        body: Arc<Body>,
        /// The response it came from.
        response: Arc<Response>,
    },
    /// Decoded response with a status of 400 or above.
    Fail {
        /// Decoded body.
        body: Arc<Body>,
        /// The response it came from.
        response: Arc<Response>,
    },
    /// Status family of a decoded response, named like `4XX`.
    StatusClass {
        /// Leading digit of the status code.
        class: u16,
        /// Decoded body.
        body: Arc<Body>,
        /// The response it came from.
        response: Arc<Response>,
    },
    /// Exact status of a decoded response, named like `404`.
    Status {
        /// The status code.
        code: StatusCode,
        /// Decoded body.
        body: Arc<Body>,
        /// The response it came from.
        response: Arc<Response>,
    },
    /// The attempt is over.
    Complete(Completion),
    /// The attempt was aborted; `error` is set for a hard abort.
    Abort {
        /// The synthetic abort or timeout error.
        error: Option<Arc<Error>>,
    },
    /// No response arrived within the configured timeout.
    Timeout {
        /// Time spent waiting.
        elapsed: Duration,
    },
}

impl Event {
    /// The event's name: `response`, `error`, `success`, `fail`, `2XX`,
    /// `200`, `complete`, `abort` or `timeout`.
    #[must_use]
    pub fn name(&self) -> Cow<'static, str> {
        match self {
            Self::Response(_) => Cow::Borrowed("response"),
            Self::Error { .. } => Cow::Borrowed("error"),
            Self::Success { .. } => Cow::Borrowed("success"),
            Self::Fail { .. } => Cow::Borrowed("fail"),
            Self::StatusClass { class, .. } => Cow::Owned(format!("{class}XX")),
            Self::Status { code, .. } => Cow::Owned(code.as_u16().to_string()),
            Self::Complete(_) => Cow::Borrowed("complete"),
            Self::Abort { .. } => Cow::Borrowed("abort"),
            Self::Timeout { .. } => Cow::Borrowed("timeout"),
        }
    }

    /// Whether this is the `complete` event.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }
}

/// Payload of the `complete` event.
#[derive(Debug, Clone)]
pub struct Completion {
    /// How the attempt ended.
    pub outcome: Outcome,
    /// The terminal response, if one was received.
    pub response: Option<Arc<Response>>,
}

/// How an attempt ended.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The body was decoded; the status may still be an error status.
    Body(Arc<Body>),
    /// The attempt failed or was hard-aborted.
    Error(Arc<Error>),
    /// The attempt was soft-aborted.
    Aborted,
}

impl Completion {
    /// The decoded body, if the attempt produced one.
    #[must_use]
    pub fn body(&self) -> Option<&Body> {
        match &self.outcome {
            Outcome::Body(body) => Some(body),
            _ => None,
        }
    }

    /// The error, if the attempt failed.
    #[must_use]
    pub fn error(&self) -> Option<&Error> {
        match &self.outcome {
            Outcome::Error(error) => Some(error),
            _ => None,
        }
    }

    /// Whether the attempt ended with a soft abort.
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        matches!(self.outcome, Outcome::Aborted)
    }

    /// Status of the terminal response.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        self.response.as_ref().map(|response| response.status())
    }
}
