//! Error bodies must not disclose server-side details.
//!
//! `Error::into_response` forwards the `Display` output of client errors
//! but replaces server errors with a generic message.

use std::io;

use hyper::StatusCode;
use waypoint::{Error, Fault};

fn body_of(response: waypoint::response::HttpResponse) -> String {
    let bytes = tokio_test::block_on(http_body_util::BodyExt::collect(response.into_body()))
        .unwrap()
        .to_bytes();
    String::from_utf8_lossy(&bytes).into_owned()
}

#[test]
fn internal_error_hides_details() {
    let err = Error::Internal("Failed to query SELECT * FROM users WHERE id = 'x'".into());
    let resp = err.into_response();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_of(resp);
    assert!(!body.contains("SELECT"), "SQL fragment leaked to client: {body}");
    assert!(body.contains("Internal server error"));
}

#[test]
fn io_error_hides_paths() {
    let err = Error::Io(io::Error::new(
        io::ErrorKind::NotFound,
        "No such file: /etc/secret/config.toml",
    ));
    let body = body_of(err.into_response());
    assert!(!body.contains("/etc/secret"), "Filesystem path leaked: {body}");
}

#[test]
fn client_errors_keep_their_message() {
    let resp = Error::BadRequest("Missing parameter: id".into()).into_response();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_of(resp),
        r#"{"error":"Bad request: Missing parameter: id"}"#
    );

    let resp = Error::NotFound("user 7".into()).into_response();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[test]
fn panic_fault_hides_message() {
    let fault = Fault::Panic("index out of bounds at src/db.rs:12".into());
    assert_eq!(fault.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_of(fault.into_response());
    assert!(!body.contains("src/db.rs"), "Panic location leaked: {body}");
}
