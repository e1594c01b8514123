//! Server integration tests.
//!
//! These tests start a real server hosting a router, send raw TCP traffic,
//! and assert on observable behavior.

use std::net::SocketAddr;

use hyper::StatusCode;
use hyper::header::{HeaderValue, X_FRAME_OPTIONS};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use waypoint::config::{Config, Routing, Server as ServerConfig};
use waypoint::response;
use waypoint::{Error, Meta, Route, Router, RouterOptions, json, server};

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// Start a test server on a random port with `/echo` (POST), `/ping` (GET),
/// `/users/:id` (any method), `/panic` (GET) and `/framed` (GET) routes.
async fn start_test_server() -> server::Server {
    start_test_server_with_config(ServerConfig::default()).await
}

async fn start_test_server_with_config(server_cfg: ServerConfig) -> server::Server {
    let config = Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..server_cfg
        },
        routing: Routing::default(),
    };

    let routes = vec![
        Route::new(Meta::post("/echo"), |req| async move {
            let input: serde_json::Value = req.json()?;
            response::ok(&json!({ "echoed": input }))
        }),
        Route::new(Meta::get("/ping"), |_req| async move {
            response::ok(&json!({ "pong": true }))
        }),
        Route::new(Meta::any("/users/:id"), |req| async move {
            Ok::<_, Error>(response::text(
                StatusCode::OK,
                format!("{} {}", req.method, req.require_param("id")?),
            ))
        }),
        Route::new(Meta::get("/panic"), |_req| async move {
            if true {
                panic!("test panic");
            }
            Ok(response::no_content())
        }),
        Route::new(Meta::get("/framed"), |_req| async move {
            let mut resp = response::no_content();
            resp.headers_mut()
                .insert(X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN"));
            Ok(resp)
        }),
    ];

    let router = Router::new(routes, RouterOptions::from(&config.routing))
        .expect("failed to build router");

    server::start(config, router.into_handle())
        .await
        .expect("failed to start test server")
}

/// Send a raw HTTP/1.1 request with `Connection: close` and read the full response.
async fn raw_request(addr: SocketAddr, payload: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.expect("failed to connect");
    stream.write_all(payload).await.expect("failed to write");

    let mut buf = Vec::new();
    let _ = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        stream.read_to_end(&mut buf),
    )
    .await;
    String::from_utf8_lossy(&buf).into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn server_dispatches_matched_route() {
    let server = start_test_server().await;

    let response = raw_request(
        server.addr(),
        b"GET /ping HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;

    server.shutdown().await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200"), "got:\n{response}");
    assert!(response.contains(r#"{"pong":true}"#), "got:\n{response}");
}

#[tokio::test]
async fn server_binds_params_for_any_method() {
    let server = start_test_server().await;

    let response = raw_request(
        server.addr(),
        b"PURGE /users/42/ HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;

    server.shutdown().await.unwrap();

    assert!(response.contains("PURGE 42"), "got:\n{response}");
}

#[tokio::test]
async fn server_returns_not_found_body() {
    let server = start_test_server().await;

    let response = raw_request(
        server.addr(),
        b"DELETE /ping HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;

    server.shutdown().await.unwrap();

    assert!(response.starts_with("HTTP/1.1 404"), "got:\n{response}");
    assert!(response.contains(r#"{"code":"NOT_FOUND"}"#), "got:\n{response}");
}

/// A handler that panics returns 500, not a connection reset.
#[tokio::test]
async fn server_returns_500_on_handler_panic() {
    let server = start_test_server().await;

    let response = raw_request(
        server.addr(),
        b"GET /panic HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;

    server.shutdown().await.unwrap();

    assert!(response.starts_with("HTTP/1.1 500"), "got:\n{response}");
    assert!(
        response.contains(r#"{"code":"SERVER_EXCEPTION"}"#),
        "got:\n{response}"
    );
}

#[tokio::test]
async fn server_passes_body_to_handler() {
    let server = start_test_server().await;

    let response = raw_request(
        server.addr(),
        b"POST /echo HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: 7\r\nConnection: close\r\n\r\n{\"n\":1}",
    )
    .await;

    server.shutdown().await.unwrap();

    assert!(response.contains(r#"{"echoed":{"n":1}}"#), "got:\n{response}");
}

/// Headers declaring a body above the configured limit are rejected
/// before the body is read.
#[tokio::test]
async fn server_rejects_oversized_body() {
    let server = start_test_server_with_config(ServerConfig {
        max_body_size: 16,
        ..Default::default()
    })
    .await;

    let response = raw_request(
        server.addr(),
        b"POST /echo HTTP/1.1\r\nHost: localhost\r\nContent-Length: 1024\r\nConnection: close\r\n\r\n",
    )
    .await;

    server.shutdown().await.unwrap();

    assert!(response.contains("413"), "Expected 413, got:\n{response}");
}

#[tokio::test]
async fn server_adds_standard_headers() {
    let server = start_test_server().await;

    let response = raw_request(
        server.addr(),
        b"GET /missing HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;

    server.shutdown().await.unwrap();

    let lower = response.to_ascii_lowercase();
    assert!(lower.contains("x-content-type-options: nosniff"), "got:\n{response}");
    assert!(lower.contains("x-frame-options: deny"), "got:\n{response}");
}

/// Security headers a handler sets itself are left untouched.
#[tokio::test]
async fn server_keeps_handler_security_headers() {
    let server = start_test_server().await;

    let response = raw_request(
        server.addr(),
        b"GET /framed HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    )
    .await;

    server.shutdown().await.unwrap();

    let lower = response.to_ascii_lowercase();
    assert!(lower.contains("x-frame-options: sameorigin"), "got:\n{response}");
    assert!(!lower.contains("x-frame-options: deny"), "got:\n{response}");
    assert!(lower.contains("x-content-type-options: nosniff"), "got:\n{response}");
}
