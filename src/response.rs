//! HTTP response builders.
//!
//! Provides convenient functions for building JSON responses, including the
//! router's default fallback bodies.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{CONTENT_TYPE, HeaderValue, LOCATION};
use hyper::{Response, StatusCode};
use serde::Serialize;

/// Response body type used throughout waypoint.
pub type Body = Full<Bytes>;

/// Full response type used throughout waypoint.
pub type HttpResponse = Response<Body>;

/// Machine-readable code in the default 404 body.
pub const NOT_FOUND_CODE: &str = "NOT_FOUND";

/// Machine-readable code in the default 500 body.
pub const SERVER_EXCEPTION_CODE: &str = "SERVER_EXCEPTION";

fn build(status: StatusCode, content_type: Option<&'static str>, body: Bytes) -> HttpResponse {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    if let Some(content_type) = content_type {
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    }
    response
}

/// Build a JSON response with the given status code and body.
pub fn json<T: Serialize>(status: StatusCode, body: &T) -> crate::Result<HttpResponse> {
    let json = serde_json::to_vec(body)?;
    Ok(build(status, Some("application/json"), Bytes::from(json)))
}

/// Build a 200 OK JSON response.
pub fn ok<T: Serialize>(body: &T) -> crate::Result<HttpResponse> {
    json(StatusCode::OK, body)
}

/// Build a 201 Created JSON response.
pub fn created<T: Serialize>(body: &T) -> crate::Result<HttpResponse> {
    json(StatusCode::CREATED, body)
}

/// Build a 204 No Content response.
pub fn no_content() -> HttpResponse {
    build(StatusCode::NO_CONTENT, None, Bytes::new())
}

/// Build a plain-text response.
pub fn text(status: StatusCode, body: impl Into<Bytes>) -> HttpResponse {
    build(status, Some("text/plain; charset=utf-8"), body.into())
}

/// Build a `{"code": ...}` JSON response.
pub fn code(status: StatusCode, code: &str) -> HttpResponse {
    let body = serde_json::json!({ "code": code });
    build(status, Some("application/json"), Bytes::from(body.to_string()))
}

/// The router's default not-found response: 404 `{"code":"NOT_FOUND"}`.
pub fn not_found() -> HttpResponse {
    code(StatusCode::NOT_FOUND, NOT_FOUND_CODE)
}

/// The router's default fault response: 500 `{"code":"SERVER_EXCEPTION"}`.
pub fn server_exception() -> HttpResponse {
    code(StatusCode::INTERNAL_SERVER_ERROR, SERVER_EXCEPTION_CODE)
}

/// Build an `{"error": message}` JSON response.
pub fn error_body(status: StatusCode, message: &str) -> HttpResponse {
    let body = serde_json::json!({ "error": message });
    build(status, Some("application/json"), Bytes::from(body.to_string()))
}

/// Build a 307 Temporary Redirect response.
pub fn redirect(location: &str) -> crate::Result<HttpResponse> {
    let value = HeaderValue::from_str(location)
        .map_err(|_| crate::Error::BadRequest(format!("Invalid redirect location: {location}")))?;
    let mut response = build(StatusCode::TEMPORARY_REDIRECT, None, Bytes::new());
    response.headers_mut().insert(LOCATION, value);
    Ok(response)
}
