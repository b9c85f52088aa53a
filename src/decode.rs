//! Response decoding chain.
//!
//! A received body goes through three optional stages, in order:
//! content-encoding decompression, charset conversion to UTF-8, then a body
//! codec. Each stage is skipped when the response does not call for it.

use std::{borrow::Cow, io};

use bytes::Bytes;
use http::header::CONTENT_ENCODING;

use crate::{
    codec::{self, Body},
    error::{Error, Result},
    options::{Decoding, RequestOptions},
    response::Response,
};

/// Decoder stages compiled into this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    /// gzip and deflate content encodings.
    pub compression: bool,
    /// Conversion from non UTF-8 charsets.
    pub charset: bool,
    /// The XML body codec.
    pub xml: bool,
}

/// Report which optional decoder stages are available.
#[must_use]
pub const fn capabilities() -> Capabilities {
    Capabilities {
        compression: cfg!(feature = "compression"),
        charset: cfg!(feature = "charset"),
        xml: cfg!(feature = "xml"),
    }
}

/// Run the whole chain on a received response.
pub(crate) async fn decode(response: &Response, options: &RequestOptions) -> Result<Body> {
    let bytes = decompress(response).await?;
    let decoding = options.decoding.clone().unwrap_or_default();

    if decoding == Decoding::Buffer {
        return Ok(Body::Bytes(bytes));
    }

    let text = to_text(&bytes, response.content_type(), &decoding);

    let parser = options
        .parser
        .clone()
        .or_else(|| response.content_type().and_then(codec::resolve));

    match parser {
        Some(parser) => {
            tracing::trace!(parser = parser.name(), "parsing response body");
            parser.parse(&text).map_err(|source| Error::Parse {
                format: parser.format(),
                source,
            })
        }
        None => Ok(Body::Text(text.into_owned())),
    }
}

async fn decompress(response: &Response) -> Result<Bytes> {
    let raw = response.raw_body().clone();
    let Some(encoding) = response
        .headers()
        .get(CONTENT_ENCODING)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_ascii_lowercase())
    else {
        return Ok(raw);
    };

    if raw.is_empty() || !matches!(encoding.as_str(), "gzip" | "x-gzip" | "deflate") {
        return Ok(raw);
    }

    tracing::trace!(%encoding, len = raw.len(), "decompressing response body");
    inflate(&encoding, raw)
        .await
        .map_err(|source| Error::Decompress { encoding, source })
}

#[cfg(feature = "compression")]
async fn inflate(encoding: &str, raw: Bytes) -> io::Result<Bytes> {
    use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};
    use std::io::Read;

    fn read_all(mut reader: impl Read) -> io::Result<Bytes> {
        let mut out = Vec::new();
        reader.read_to_end(&mut out)?;
        Ok(Bytes::from(out))
    }

    let gzip = encoding != "deflate";
    blocking::unblock(move || {
        if gzip {
            read_all(GzDecoder::new(raw.as_ref()))
        } else {
            // Some servers send raw deflate streams without the zlib wrapper.
            read_all(ZlibDecoder::new(raw.as_ref()))
                .or_else(|_| read_all(DeflateDecoder::new(raw.as_ref())))
        }
    })
    .await
}

#[cfg(not(feature = "compression"))]
async fn inflate(_encoding: &str, _raw: Bytes) -> io::Result<Bytes> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "compression support is not enabled",
    ))
}

fn to_text<'a>(bytes: &'a [u8], content_type: Option<&str>, decoding: &Decoding) -> Cow<'a, str> {
    match decoding {
        Decoding::Binary => Cow::Owned(bytes.iter().map(|&byte| char::from(byte)).collect()),
        Decoding::Charset(label) => transcode(bytes, label),
        Decoding::Utf8 | Decoding::Buffer => match content_type.and_then(charset_of) {
            Some(label) if !is_utf8(&label) => transcode(bytes, &label),
            _ => String::from_utf8_lossy(bytes),
        },
    }
}

fn charset_of(content_type: &str) -> Option<String> {
    let mime: mime::Mime = content_type.parse().ok()?;
    mime.get_param(mime::CHARSET)
        .map(|charset| charset.as_str().to_owned())
}

fn is_utf8(label: &str) -> bool {
    label.eq_ignore_ascii_case("utf-8") || label.eq_ignore_ascii_case("utf8")
}

#[cfg(feature = "charset")]
fn transcode<'a>(bytes: &'a [u8], label: &str) -> Cow<'a, str> {
    match encoding_rs::Encoding::for_label(label.trim().as_bytes()) {
        Some(encoding) => {
            let (text, _, had_errors) = encoding.decode(bytes);
            if had_errors {
                tracing::debug!(charset = encoding.name(), "replaced unmappable characters");
            }
            text
        }
        None => {
            tracing::warn!(charset = label, "unknown charset, decoding as UTF-8");
            String::from_utf8_lossy(bytes)
        }
    }
}

#[cfg(not(feature = "charset"))]
fn transcode<'a>(bytes: &'a [u8], label: &str) -> Cow<'a, str> {
    tracing::warn!(
        charset = label,
        "charset conversion is not enabled, decoding as UTF-8"
    );
    String::from_utf8_lossy(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Parser;
    use crate::error::ParseError;
    use http::{HeaderMap, HeaderValue, StatusCode};
    use serde_json::json;
    use url::Url;

    fn response(headers: &[(&'static str, &str)], raw: impl Into<Bytes>) -> Response {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        Response::new(
            StatusCode::OK,
            map,
            Url::parse("http://localhost/").unwrap(),
            raw.into(),
        )
    }

    #[tokio::test]
    async fn json_content_type_is_dispatched() {
        let res = response(&[("content-type", "application/json")], r#"{"ok":true}"#);
        let body = decode(&res, &RequestOptions::new()).await.unwrap();
        assert_eq!(body.as_value(), Some(&json!({"ok": true})));
    }

    #[tokio::test]
    async fn unknown_content_type_passes_text_through() {
        let res = response(&[("content-type", "application/octet-stream")], "raw data");
        let body = decode(&res, &RequestOptions::new()).await.unwrap();
        assert_eq!(body.as_text(), Some("raw data"));
    }

    #[tokio::test]
    async fn malformed_json_keeps_raw_body() {
        let res = response(&[("content-type", "application/json")], "not json");
        let err = decode(&res, &RequestOptions::new()).await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to parse JSON body"));
        assert!(err.is_decode_error());
        assert_eq!(res.raw_body().as_ref(), b"not json");
    }

    #[tokio::test]
    async fn buffer_decoding_skips_the_parser() {
        let res = response(&[("content-type", "application/json")], "not json");
        let options = RequestOptions::new().decoding(Decoding::Buffer);
        let body = decode(&res, &options).await.unwrap();
        assert_eq!(body.as_bytes().map(|bytes| bytes.to_vec()), Some(b"not json".to_vec()));
    }

    #[tokio::test]
    async fn explicit_parser_overrides_content_type() {
        let upper = Parser::new("upper", |text| {
            if text.is_empty() {
                Err(ParseError::new("empty"))
            } else {
                Ok(Body::Text(text.to_uppercase()))
            }
        });
        let res = response(&[("content-type", "application/json")], "hello");
        let options = RequestOptions::new().parser(upper);
        let body = decode(&res, &options).await.unwrap();
        assert_eq!(body.as_text(), Some("HELLO"));

        let empty = response(&[], "");
        let err = decode(&empty, &options).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to parse upper body: empty");
    }

    #[tokio::test]
    async fn binary_decoding_maps_bytes_to_code_points() {
        let res = response(&[], vec![0x63, 0x61, 0x66, 0xe9]);
        let options = RequestOptions::new().decoding(Decoding::Binary);
        let body = decode(&res, &options).await.unwrap();
        assert_eq!(body.as_text(), Some("caf\u{e9}"));
    }

    #[cfg(feature = "charset")]
    #[tokio::test]
    async fn declared_charset_is_converted() {
        let res = response(
            &[("content-type", "text/plain; charset=ISO-8859-1")],
            vec![0x63, 0x61, 0x66, 0xe9],
        );
        let body = decode(&res, &RequestOptions::new()).await.unwrap();
        assert_eq!(body.as_text(), Some("caf\u{e9}"));
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced_not_rejected() {
        let res = response(&[("content-type", "text/plain")], vec![0x61, 0xff, 0x62]);
        let body = decode(&res, &RequestOptions::new()).await.unwrap();
        assert_eq!(body.as_text(), Some("a\u{fffd}b"));
    }

    #[cfg(feature = "compression")]
    #[tokio::test]
    async fn gzip_and_deflate_are_decompressed() {
        use flate2::{
            Compression,
            write::{DeflateEncoder, GzEncoder, ZlibEncoder},
        };
        use std::io::Write;

        let mut gz = GzEncoder::new(Vec::new(), Compression::default());
        gz.write_all(br#"{"zipped":1}"#).unwrap();
        let res = response(
            &[
                ("content-type", "application/json"),
                ("content-encoding", "gzip"),
            ],
            gz.finish().unwrap(),
        );
        let body = decode(&res, &RequestOptions::new()).await.unwrap();
        assert_eq!(body.as_value(), Some(&json!({"zipped": 1})));

        let mut zlib = ZlibEncoder::new(Vec::new(), Compression::default());
        zlib.write_all(b"zlib").unwrap();
        let res = response(&[("content-encoding", "deflate")], zlib.finish().unwrap());
        let body = decode(&res, &RequestOptions::new()).await.unwrap();
        assert_eq!(body.as_text(), Some("zlib"));

        let mut raw = DeflateEncoder::new(Vec::new(), Compression::default());
        raw.write_all(b"raw deflate").unwrap();
        let res = response(&[("content-encoding", "Deflate")], raw.finish().unwrap());
        let body = decode(&res, &RequestOptions::new()).await.unwrap();
        assert_eq!(body.as_text(), Some("raw deflate"));
    }

    #[tokio::test]
    async fn corrupt_gzip_is_a_decode_error() {
        let res = response(&[("content-encoding", "gzip")], "definitely not gzip");
        let err = decode(&res, &RequestOptions::new()).await.unwrap_err();
        assert!(err.is_decode_error());
        assert!(err.to_string().starts_with("Failed to decompress gzip body"));
    }

    #[tokio::test]
    async fn empty_encoded_body_is_left_alone() {
        let res = response(&[("content-encoding", "gzip")], Bytes::new());
        let body = decode(&res, &RequestOptions::new()).await.unwrap();
        assert_eq!(body.as_text(), Some(""));
    }

    #[test]
    fn capabilities_follow_features() {
        let caps = capabilities();
        assert_eq!(caps.compression, cfg!(feature = "compression"));
        assert_eq!(caps.xml, cfg!(feature = "xml"));
    }
}
