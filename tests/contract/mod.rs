mod error_disclosure;
mod registration;
mod server;

use bytes::Bytes;
use http_body_util::BodyExt;
use waypoint::response::HttpResponse;
use waypoint::{Method, Request};

/// Build a body-less request.
pub fn request(method: Method, uri: &str) -> Request {
    hyper::Request::builder()
        .method(method)
        .uri(uri)
        .body(Bytes::new())
        .unwrap()
        .into()
}

/// Collect a response body into a string.
pub async fn body_string(response: HttpResponse) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
