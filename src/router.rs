//! Request dispatch.
//!
//! [`Router`] owns the route table and the fallback configuration. For every
//! request it normalizes the path, looks up the best route, runs the handler
//! and turns whatever happens into a response: the handler's own response,
//! the not-found fallback when nothing matched or the handler declined, or
//! the error fallback when the handler failed or panicked.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use bytes::Bytes;
use futures::FutureExt;
use hyper::http::HeaderMap;
use hyper::{Method, Uri};
use serde::de::DeserializeOwned;
use tracing::{debug, error};

use crate::config::Routing;
use crate::error::{Error, Fault, Result};
use crate::pattern::trim_trailing_slashes;
use crate::response::{self, HttpResponse};
use crate::route::{Route, Routes, normalize};
use crate::table::{Matcher, Params, Table};

/// Request passed to route handlers and to the not-found fallback.
#[derive(Debug, Clone)]
pub struct Request {
    /// The HTTP method.
    pub method: Method,
    /// The request URI.
    pub uri: Uri,
    /// The request headers.
    pub headers: HeaderMap,
    /// The request body, pre-read as bytes.
    pub body: Bytes,
    /// Route parameters bound by the match. Empty until a route matched.
    pub params: Params,
}

impl Request {
    pub fn from_parts(parts: hyper::http::request::Parts, body: Bytes) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            params: Params::new(),
        }
    }

    /// The request path, without the query string.
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Parse the request body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        if self.body.is_empty() {
            serde_json::from_value(serde_json::Value::Null)
                .map_err(|e| Error::BadRequest(format!("Invalid request body: {e}")))
        } else {
            serde_json::from_slice(&self.body)
                .map_err(|e| Error::BadRequest(format!("Invalid request body: {e}")))
        }
    }

    /// Get a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Get a route parameter by name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Get a required route parameter, returning BadRequest if missing.
    pub fn require_param(&self, name: &str) -> Result<&str> {
        self.param(name)
            .ok_or_else(|| Error::BadRequest(format!("Missing parameter: {name}")))
    }
}

impl From<hyper::Request<Bytes>> for Request {
    fn from(req: hyper::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self::from_parts(parts, body)
    }
}

/// Builds the response for unmatched or declined requests.
pub type NotFoundFn = Arc<dyn Fn(&Request) -> HttpResponse + Send + Sync>;

/// Builds the response for a handler fault.
pub type ErrorFn = Arc<dyn Fn(Fault) -> HttpResponse + Send + Sync>;

/// Router configuration, fixed at construction.
#[derive(Clone)]
pub struct RouterOptions {
    /// Defaults to 404 `{"code":"NOT_FOUND"}`.
    pub on_not_found: NotFoundFn,
    /// Defaults to 500 `{"code":"SERVER_EXCEPTION"}`.
    pub on_error: ErrorFn,
    /// When false (the default), `/a/b/` and `/a/b` are the same route.
    pub keep_trailing_slashes: bool,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            on_not_found: Arc::new(|_req| response::not_found()),
            on_error: Arc::new(|_fault| response::server_exception()),
            keep_trailing_slashes: false,
        }
    }
}

impl RouterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_not_found<F>(mut self, f: F) -> Self
    where
        F: Fn(&Request) -> HttpResponse + Send + Sync + 'static,
    {
        self.on_not_found = Arc::new(f);
        self
    }

    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(Fault) -> HttpResponse + Send + Sync + 'static,
    {
        self.on_error = Arc::new(f);
        self
    }

    pub fn keep_trailing_slashes(mut self, keep: bool) -> Self {
        self.keep_trailing_slashes = keep;
        self
    }
}

impl From<&Routing> for RouterOptions {
    fn from(routing: &Routing) -> Self {
        Self::default().keep_trailing_slashes(routing.keep_trailing_slashes)
    }
}

impl fmt::Debug for RouterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterOptions")
            .field("keep_trailing_slashes", &self.keep_trailing_slashes)
            .finish_non_exhaustive()
    }
}

/// HTTP router. Immutable once built; share it with [`Router::into_handle`].
///
/// Lookups go through a [`Matcher`]; the default is the trie-based [`Table`].
pub struct Router<M = Table<Route>> {
    matcher: M,
    options: RouterOptions,
}

impl Router {
    /// Normalize and compile `routes` into the default route table.
    ///
    /// Fails on a route without a path or with a malformed pattern.
    ///
    /// # Example
    /// ```ignore
    /// let router = Router::new(
    ///     vec![Route::new(Meta::get("/users/:id"), |req| async move {
    ///         response::ok(&serde_json::json!({ "id": req.require_param("id")? }))
    ///     })],
    ///     RouterOptions::default(),
    /// )?;
    /// let response = router.dispatch(request).await;
    /// ```
    pub fn new(routes: impl Into<Routes>, options: RouterOptions) -> Result<Self> {
        Self::with_matcher(routes, options)
    }
}

impl<M: Matcher<Route>> Router<M> {
    /// Normalize `routes` and build them into the matcher `M`.
    pub fn with_matcher(routes: impl Into<Routes>, options: RouterOptions) -> Result<Self> {
        let inputs = normalize(routes, options.keep_trailing_slashes)?;
        let matcher = M::build(inputs)?;
        debug!(routes = matcher.len(), "Route table built");
        Ok(Self { matcher, options })
    }

    /// Convert to a shared handle for use in request handling.
    pub fn into_handle(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn options(&self) -> &RouterOptions {
        &self.options
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.matcher.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matcher.is_empty()
    }

    /// Dispatch a request. Always produces a response.
    ///
    /// Dropping the returned future drops the handler's future with it.
    pub async fn dispatch(&self, mut req: Request) -> HttpResponse {
        let path = if self.options.keep_trailing_slashes {
            req.uri.path()
        } else {
            trim_trailing_slashes(req.uri.path())
        };

        let Some(matched) = self.matcher.at(&req.method, path) else {
            debug!(method = %req.method, path = %req.uri.path(), "No route matched");
            return self.not_found(&req);
        };

        let route = matched.payload;
        req.params = matched.params;
        let fallback = req.clone();

        let outcome = AssertUnwindSafe(async move { route.call(req).await })
            .catch_unwind()
            .await;

        let fault = match outcome {
            Ok(Ok(Some(response))) => return response,
            Ok(Ok(None)) => {
                debug!(
                    method = %fallback.method,
                    route = %matched.pattern,
                    "Handler declined the request"
                );
                return self.not_found(&fallback);
            }
            Ok(Err(e)) => Fault::Error(e),
            Err(panic) => Fault::from_panic(panic),
        };

        error!(
            method = %fallback.method,
            path = %fallback.uri.path(),
            route = %matched.pattern,
            "Handler failed: {fault}"
        );
        self.error(fault)
    }

    fn not_found(&self, req: &Request) -> HttpResponse {
        match catch_unwind(AssertUnwindSafe(|| (self.options.on_not_found)(req))) {
            Ok(response) => response,
            Err(panic) => {
                let fault = Fault::from_panic(panic);
                error!("Not-found fallback failed: {fault}");
                self.error(fault)
            }
        }
    }

    fn error(&self, fault: Fault) -> HttpResponse {
        catch_unwind(AssertUnwindSafe(|| (self.options.on_error)(fault))).unwrap_or_else(|_| {
            error!("Error fallback panicked");
            response::server_exception()
        })
    }
}

impl<M: fmt::Debug> fmt::Debug for Router<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("matcher", &self.matcher)
            .field("options", &self.options)
            .finish()
    }
}

/// Build a router and wrap it in a shared handle.
pub fn create_router(routes: impl Into<Routes>, options: RouterOptions) -> Result<Arc<Router>> {
    Router::new(routes, options).map(Router::into_handle)
}
