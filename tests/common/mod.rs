//! Shared test utilities for running against a local HTTP server.
//!
//! The server implements just the endpoints the test suite needs and handles
//! each request on its own thread so slow endpoints do not stall other tests.
//! Set `RESTWAVE_TEST_BASE_URL` to target another server.

#![allow(dead_code)]

use std::{
    io::{Cursor, Read, Write as _},
    thread,
    time::Duration,
};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use flate2::{Compression, write::GzEncoder, write::ZlibEncoder};
use futures_util::StreamExt;
use once_cell::sync::OnceCell;
use restwave::{Event, RequestHandle};
use serde_json::json;
use tiny_http::{Header, ListenAddr, Request, Response, Server, StatusCode};
use url::Url;

#[derive(Debug)]
pub struct TestServer {
    base: String,
    // Keep the thread alive for the duration of the tests.
    _thread: thread::JoinHandle<()>,
}

/// Return the base URL for the local test server, falling back to an env var
/// override so the tests can target another server if needed.
pub fn server_base() -> String {
    if let Ok(base) = std::env::var("RESTWAVE_TEST_BASE_URL") {
        return base.trim_end_matches('/').to_string();
    }
    test_server().base.clone()
}

/// Build a full URL against the local test server.
pub fn server_uri(path: &str) -> String {
    format!("{}/{}", server_base(), path.trim_start_matches('/'))
}

pub fn test_server() -> &'static TestServer {
    static INSTANCE: OnceCell<TestServer> = OnceCell::new();
    INSTANCE.get_or_init(TestServer::start)
}

/// Event names in arrival order.
pub fn names(events: &[Event]) -> Vec<String> {
    events.iter().map(|event| event.name().into_owned()).collect()
}

/// Read events until `complete`, failing the test if that takes too long.
pub async fn run(handle: &mut RequestHandle) -> Vec<Event> {
    tokio::time::timeout(Duration::from_secs(10), handle.until_complete())
        .await
        .expect("request did not complete in time")
}

/// Assert that no further event arrives within a short grace period.
pub async fn assert_quiet(handle: &mut RequestHandle) {
    let next = tokio::time::timeout(Duration::from_millis(100), handle.next()).await;
    assert!(
        !matches!(next, Ok(Some(_))),
        "unexpected event after completion: {next:?}"
    );
}

impl TestServer {
    fn start() -> Self {
        let server = Server::http("127.0.0.1:0").expect("start test server");
        let addr: ListenAddr = server.server_addr();
        let base = format!("http://{addr}");
        let thread = thread::spawn(move || run_server(&server));

        Self {
            base,
            _thread: thread,
        }
    }
}

fn run_server(server: &Server) {
    for mut request in server.incoming_requests() {
        thread::spawn(move || {
            let response = handle_request(&mut request);
            let _ = request.respond(response);
        });
    }
}

fn handle_request(request: &mut Request) -> Response<Cursor<Vec<u8>>> {
    // tiny_http only provides the path/query, so prefix with a dummy scheme/host.
    let url = Url::parse(&format!("http://localhost{}", request.url())).unwrap();
    let path = url.path().to_string();
    let query = url
        .query_pairs()
        .into_owned()
        .collect::<Vec<(String, String)>>();

    match path.as_str() {
        "/echo" => echo(request, &url),
        "/json" => typed_response(StatusCode(200), "application/json", r#"{"ok":true}"#),
        "/vendor-json" => typed_response(
            StatusCode(200),
            "application/vnd.restwave.v2+json; charset=utf-8",
            r#"{"vendor":"restwave"}"#,
        ),
        "/yaml" => typed_response(
            StatusCode(200),
            "application/yaml",
            "name: restwave\nfeatures:\n  - redirects\n  - retries\nstable: yes\n",
        ),
        "/xml" => typed_response(
            StatusCode(200),
            "application/xml",
            r#"<user id="7"><name>Ada</name></user>"#,
        ),
        "/malformed-json" => typed_response(StatusCode(200), "application/json", "{not json"),
        "/empty-json" => typed_response(StatusCode(200), "application/json", ""),
        "/gzip" => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(br#"{"compressed":"gzip"}"#).unwrap();
            typed_response(
                StatusCode(200),
                "application/json",
                encoder.finish().unwrap(),
            )
            .with_header(header("Content-Encoding", "gzip"))
        }
        "/deflate" => {
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(b"deflated text").unwrap();
            typed_response(StatusCode(200), "text/plain", encoder.finish().unwrap())
                .with_header(header("Content-Encoding", "deflate"))
        }
        "/corrupt-gzip" => typed_response(StatusCode(200), "text/plain", "not gzip at all")
            .with_header(header("Content-Encoding", "gzip")),
        "/latin1" => typed_response(
            StatusCode(200),
            "text/plain; charset=ISO-8859-1",
            vec![b'c', b'a', b'f', 0xe9],
        ),
        "/slow" => {
            thread::sleep(Duration::from_millis(500));
            text_response(StatusCode(200), "finally")
        }
        "/see-other" => redirect_response(303, "/echo"),
        "/temporary" => redirect_response(307, "/echo"),
        "/permanent" => redirect_response(301, "/json"),
        "/redirect-loop" => redirect_response(302, "/redirect-loop"),
        "/redirect-nowhere" => text_response(StatusCode(302), "no location"),
        "/redirect-to" => {
            let target = query
                .iter()
                .find(|(key, _)| key == "url")
                .map_or("/", |(_, value)| value.as_str());
            redirect_response(302, target)
        }
        "/bearer" => match header_value(request, "authorization") {
            Some(auth) if auth.to_ascii_lowercase().starts_with("bearer ") => {
                text_response(StatusCode(200), "authorized")
            }
            _ => text_response(StatusCode(401), "unauthorized"),
        },
        _ => {
            if let Some(stripped) = path.strip_prefix("/basic-auth/") {
                return handle_basic_auth(request, stripped);
            }
            if let Some(stripped) = path.strip_prefix("/status/") {
                return handle_status(stripped);
            }
            if let Some(stripped) = path.strip_prefix("/redirect/") {
                return handle_redirect(stripped);
            }
            text_response(StatusCode(404), format!("no route for {path}"))
        }
    }
}

fn echo(request: &mut Request, url: &Url) -> Response<Cursor<Vec<u8>>> {
    let mut body = Vec::new();
    request.as_reader().read_to_end(&mut body).unwrap();
    let headers: serde_json::Map<String, serde_json::Value> = request
        .headers()
        .iter()
        .map(|header| {
            (
                header.field.to_string().to_ascii_lowercase(),
                json!(String::from_utf8_lossy(header.value.as_ref())),
            )
        })
        .collect();
    let payload = json!({
        "method": request.method().to_string(),
        "path": url.path(),
        "query": url.query(),
        "headers": headers,
        "body": String::from_utf8_lossy(&body),
        "body_len": body.len(),
    });
    typed_response(StatusCode(200), "application/json", payload.to_string())
}

fn handle_basic_auth(request: &Request, path: &str) -> Response<Cursor<Vec<u8>>> {
    let mut parts = path.split('/');
    let user = parts.next().unwrap_or_default();
    let pass = parts.next().unwrap_or_default();
    let expected = format!("Basic {}", BASE64.encode(format!("{user}:{pass}")));

    if let Some(auth) = header_value(request, "authorization")
        && auth == expected
    {
        return text_response(StatusCode(200), "authenticated");
    }
    text_response(StatusCode(401), "unauthorized")
}

fn handle_status(code: &str) -> Response<Cursor<Vec<u8>>> {
    let status = code.parse::<u16>().unwrap_or(400);
    if status == 204 {
        return Response::new(
            StatusCode(status),
            vec![],
            Cursor::new(Vec::new()),
            None,
            None,
        );
    }
    text_response(StatusCode(status), format!("status {status}"))
}

fn handle_redirect(steps: &str) -> Response<Cursor<Vec<u8>>> {
    let steps = steps.parse::<i32>().unwrap_or(0);
    if steps <= 0 {
        return text_response(StatusCode(200), "redirect complete");
    }
    redirect_response(302, &format!("/redirect/{}", steps - 1))
}

fn redirect_response(status: u16, location: &str) -> Response<Cursor<Vec<u8>>> {
    Response::from_string("redirect")
        .with_status_code(StatusCode(status))
        .with_header(header("Location", location))
}

fn header(name: &str, value: &str) -> Header {
    Header::from_bytes(name, value).unwrap()
}

fn header_value(request: &Request, name: &str) -> Option<String> {
    request
        .headers()
        .iter()
        .find(|header| header.field.to_string().eq_ignore_ascii_case(name))
        .map(|header| String::from_utf8_lossy(header.value.as_ref()).into_owned())
}

fn typed_response(
    status: StatusCode,
    content_type: &str,
    body: impl Into<Vec<u8>>,
) -> Response<Cursor<Vec<u8>>> {
    Response::from_data(body.into())
        .with_status_code(status)
        .with_header(header("Content-Type", content_type))
}

fn text_response(status: StatusCode, body: impl Into<String>) -> Response<Cursor<Vec<u8>>> {
    Response::from_string(body.into()).with_status_code(status)
}
