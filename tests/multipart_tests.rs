//! Multipart uploads against the local test server.

mod common;

use std::io::Write;

use common::{run, server_uri};
use restwave::{
    Client, ErrorKind, Event, RequestOptions, Value, client,
    multipart::{Data, File, Form},
};

fn echo_of(events: &[Event]) -> Value {
    match events.last() {
        Some(Event::Complete(completion)) => completion
            .body()
            .and_then(|body| body.as_value())
            .cloned()
            .expect("echo body"),
        other => panic!("expected complete, got {other:?}"),
    }
}

#[tokio::test]
async fn test_multipart_upload_with_known_sizes() {
    let mut upload = tempfile::NamedTempFile::with_suffix(".txt").unwrap();
    upload.write_all(b"file contents").unwrap();

    let form = Form::new()
        .field("title", "report")
        .field("file", File::new(upload.path()).with_size(13))
        .field(
            "blob",
            Data::new("blob.bin", "application/octet-stream", vec![0_u8, 1, 2]),
        );
    let events = run(&mut client().post(&server_uri("/echo"), RequestOptions::new().multipart(form))).await;
    let echo = echo_of(&events);

    let content_type = echo["headers"]["content-type"].as_str().unwrap();
    assert!(content_type.starts_with("multipart/form-data; boundary="));
    assert_eq!(
        echo["headers"]["content-length"],
        echo["body_len"].to_string()
    );

    let body = echo["body"].as_str().unwrap();
    assert!(body.contains("Content-Disposition: form-data; name=\"title\"\r\n\r\nreport\r\n"));
    assert!(body.contains("Content-Type: text/plain\r\n\r\nfile contents\r\n"));
    assert!(body.contains("filename=\"blob.bin\""));
    assert!(body.trim_end().ends_with("--"));
}

#[tokio::test]
async fn test_multipart_upload_without_declared_size() {
    let mut upload = tempfile::NamedTempFile::new().unwrap();
    upload.write_all(b"unsized").unwrap();

    let form = Form::new().field("file", File::new(upload.path()));
    let events = run(&mut client().post(&server_uri("/echo"), RequestOptions::new().multipart(form))).await;
    let echo = echo_of(&events);

    assert!(echo["headers"].get("content-length").is_none());
    assert!(echo["body"].as_str().unwrap().contains("\r\n\r\nunsized\r\n"));
}

#[tokio::test]
async fn test_multipart_unreadable_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let form = Form::new()
        .field("title", "report")
        .field("file", File::new(dir.path().join("missing.txt")));
    let events = run(&mut client().post(&server_uri("/echo"), RequestOptions::new().multipart(form))).await;

    let names = common::names(&events);
    assert_eq!(names, ["error", "complete"]);
    let Some(Event::Error { error, .. }) = events.first() else {
        panic!("expected error event");
    };
    assert_eq!(error.kind(), ErrorKind::Io);
}
