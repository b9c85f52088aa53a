use std::io;

use bytes::Bytes;
use futures_util::TryStreamExt;
use http_body_util::{BodyDataStream, BodyExt, Empty, Full, StreamBody, combinators::UnsyncBoxBody};
use hyper::body::Frame;
use hyper_tls::HttpsConnector;
use hyper_util::client::legacy::Client as HyperClient;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;

use super::{IncomingBody, OutgoingBody, Transport};
use crate::error::{Error, Result};

type HyperBody = UnsyncBoxBody<Bytes, io::Error>;

/// Transport backed by hyper's pooled client with native TLS.
#[derive(Debug, Clone)]
pub struct HyperBackend {
    client: HyperClient<HttpsConnector<HttpConnector>, HyperBody>,
}

impl Default for HyperBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HyperBackend {
    /// Create a backend with a fresh connection pool.
    #[must_use]
    pub fn new() -> Self {
        let client = HyperClient::builder(TokioExecutor::new()).build(HttpsConnector::new());

        Self { client }
    }
}

fn into_hyper_body(body: OutgoingBody) -> HyperBody {
    match body {
        OutgoingBody::Empty => Empty::<Bytes>::new()
            .map_err(|never| match never {})
            .boxed_unsync(),
        OutgoingBody::Full(bytes) => Full::new(bytes)
            .map_err(|never| match never {})
            .boxed_unsync(),
        OutgoingBody::Stream(stream) => StreamBody::new(stream.map_ok(Frame::data)).boxed_unsync(),
    }
}

impl Transport for HyperBackend {
    async fn send(
        &self,
        request: http::Request<OutgoingBody>,
    ) -> Result<http::Response<IncomingBody>> {
        let request = request.map(into_hyper_body);

        let response = self.client.request(request).await.map_err(Error::transport)?;

        Ok(response.map(|body| {
            IncomingBody::from_stream(BodyDataStream::new(body).map_err(Error::transport))
        }))
    }
}
