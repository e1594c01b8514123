//! Error types with HTTP status code mapping.

use std::any::Any;
use std::fmt;

use hyper::StatusCode;

use crate::pattern::PatternError;
use crate::response::{self, HttpResponse};

/// Error type for waypoint operations.
///
/// Construction-time variants (`Pattern`, `MissingPath`, `Config`) abort
/// building a router. The request-time variants are what handlers return;
/// the dispatcher hands them to `on_error` as a [`Fault`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Registration errors
    #[error("Invalid route pattern: {0}")]
    Pattern(#[from] PatternError),

    #[error("Route #{index} has no path")]
    MissingPath { index: usize },

    // Request errors
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    // System errors
    #[error("Invalid address: {0}")]
    AddrParse(#[from] std::net::AddrParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::http::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map error to HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::Conflict(_) => StatusCode::CONFLICT,

            // Construction errors never reach a client in practice
            Error::Pattern(_) | Error::MissingPath { .. } | Error::Config(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }

            Error::AddrParse(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::Http(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert error into an HTTP response.
    ///
    /// Server errors are logged and replaced with a generic message so
    /// internals never reach the client.
    pub fn into_response(self) -> HttpResponse {
        let status = self.status_code();
        let message = if status.is_server_error() {
            tracing::error!("Internal error: {self}");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };
        response::error_body(status, &message)
    }
}

/// Result type alias using waypoint's Error.
pub type Result<T> = std::result::Result<T, Error>;

/// A fault raised while a handler was running.
///
/// The dispatcher never lets one of these escape; it is passed to the
/// router's `on_error` callback instead.
#[derive(Debug)]
pub enum Fault {
    /// The handler returned an error.
    Error(Error),
    /// The handler panicked. Holds the panic message when it was a string.
    Panic(String),
}

impl Fault {
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Fault::Panic(message)
    }

    /// Status code the fault maps to. Panics are always 500.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Fault::Error(e) => e.status_code(),
            Fault::Panic(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Convert into a response using [`Error::into_response`] semantics.
    pub fn into_response(self) -> HttpResponse {
        match self {
            Fault::Error(e) => e.into_response(),
            Fault::Panic(message) => {
                tracing::error!("Handler panicked: {message}");
                response::error_body(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::Error(e) => write!(f, "{e}"),
            Fault::Panic(message) => write!(f, "handler panicked: {message}"),
        }
    }
}

impl From<Error> for Fault {
    fn from(error: Error) -> Self {
        Fault::Error(error)
    }
}
