//! HTTP transports.
//!
//! This module defines the [`Transport`] trait the request engine drives and
//! the default hyper-based implementation. Dropping the future returned by
//! [`Transport::send`], or the [`IncomingBody`] it produced, closes the
//! underlying connection; the engine relies on that for abort and timeout.

use core::fmt;
use std::{future::Future, io};

use bytes::{Bytes, BytesMut};
use futures_util::{Stream, StreamExt, TryStreamExt, stream::BoxStream};

use crate::error::Result;

#[cfg(feature = "hyper-backend")]
mod hyper;
#[cfg(feature = "hyper-backend")]
pub use hyper::HyperBackend;

/// Request body handed to a transport.
pub enum OutgoingBody {
    /// No body.
    Empty,
    /// Fully buffered body.
    Full(Bytes),
    /// Streamed body, used for multipart uploads.
    Stream(BoxStream<'static, io::Result<Bytes>>),
}

impl fmt::Debug for OutgoingBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Full(bytes) => f.debug_tuple("Full").field(&bytes.len()).finish(),
            Self::Stream(_) => f.write_str("Stream"),
        }
    }
}

impl OutgoingBody {
    /// Buffer the whole body.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by a streamed body.
    pub async fn collect(self) -> io::Result<Bytes> {
        match self {
            Self::Empty => Ok(Bytes::new()),
            Self::Full(bytes) => Ok(bytes),
            Self::Stream(stream) => {
                let chunks: Vec<Bytes> = stream.try_collect().await?;
                Ok(Bytes::from(chunks.concat()))
            }
        }
    }
}

/// Response body produced by a transport.
pub struct IncomingBody {
    stream: BoxStream<'static, Result<Bytes>>,
}

impl fmt::Debug for IncomingBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncomingBody").finish_non_exhaustive()
    }
}

impl IncomingBody {
    /// Wrap a byte stream.
    pub fn from_stream(stream: impl Stream<Item = Result<Bytes>> + Send + 'static) -> Self {
        Self {
            stream: stream.boxed(),
        }
    }

    /// A body that is already fully available.
    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        Self::from_stream(futures_util::stream::once(async move { Ok(bytes) }))
    }

    /// An empty body.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_stream(futures_util::stream::empty())
    }

    /// Read the body to the end.
    ///
    /// # Errors
    ///
    /// Returns the transport error that interrupted the body.
    pub async fn collect(mut self) -> Result<Bytes> {
        let mut buffer = BytesMut::new();
        while let Some(chunk) = self.stream.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(buffer.freeze())
    }
}

/// Something that can put a request on the wire.
pub trait Transport: Send + Sync + 'static {
    /// Send `request` and resolve once the response head has arrived.
    ///
    /// Connection, TLS and protocol failures are reported as
    /// [`Error::Transport`](crate::Error::Transport).
    fn send(
        &self,
        request: http::Request<OutgoingBody>,
    ) -> impl Future<Output = Result<http::Response<IncomingBody>>> + Send;
}

/// The default transport for the enabled features.
#[cfg(feature = "hyper-backend")]
pub type DefaultBackend = HyperBackend;

#[cfg(not(feature = "hyper-backend"))]
compile_error!("Enable the `hyper-backend` feature or provide a `Transport` of your own.");
