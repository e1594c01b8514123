//! Route registration.
//!
//! A [`Route`] pairs a handler with its [`Meta`] (methods, path and any typed
//! extensions a collaborator such as a validator wants to attach).
//! [`normalize`] turns a route list into the inputs the route table is built
//! from.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use hyper::http::Extensions;

use crate::error::{Error, Result};
use crate::pattern::{Pattern, PatternError, trim_trailing_slashes};
use crate::response::HttpResponse;
use crate::router::Request;
use crate::table::{Method, RouteInput};

/// Type-erased handler. Resolves to `Ok(None)` when it declines the request.
pub type Handler =
    Arc<dyn Fn(Request) -> BoxFuture<'static, Result<Option<HttpResponse>>> + Send + Sync>;

/// What a handler may produce: a response, or nothing.
pub trait IntoReply {
    fn into_reply(self) -> Option<HttpResponse>;
}

impl IntoReply for HttpResponse {
    fn into_reply(self) -> Option<HttpResponse> {
        Some(self)
    }
}

impl IntoReply for Option<HttpResponse> {
    fn into_reply(self) -> Option<HttpResponse> {
        self
    }
}

/// Routing metadata attached to a handler.
#[derive(Debug, Clone, Default)]
pub struct Meta {
    /// Methods the route answers. `None` (or an empty list) means any method.
    pub method: Option<Vec<hyper::Method>>,
    /// Path pattern. Required; a route without one fails normalization.
    pub path: Option<String>,
    /// Arbitrary typed metadata for collaborators.
    pub extensions: Extensions,
}

impl Meta {
    /// Metadata with no method and no path.
    pub fn new() -> Self {
        Self::default()
    }

    /// A route answering every method.
    pub fn any(path: impl Into<String>) -> Self {
        Self::new().path(path)
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::any(path).method(hyper::Method::GET)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::any(path).method(hyper::Method::POST)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::any(path).method(hyper::Method::PUT)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::any(path).method(hyper::Method::DELETE)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::any(path).method(hyper::Method::PATCH)
    }

    /// Add a method to the route's method set.
    pub fn method(mut self, method: hyper::Method) -> Self {
        self.method.get_or_insert_with(Vec::new).push(method);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attach a typed extension.
    pub fn with<T: Clone + Send + Sync + 'static>(mut self, value: T) -> Self {
        self.extensions.insert(value);
        self
    }

    /// Names of the path parameters the pattern declares, in order.
    ///
    /// Empty when no path is set.
    pub fn params(&self) -> std::result::Result<Vec<String>, PatternError> {
        match &self.path {
            Some(path) => Ok(Pattern::parse(path)?
                .param_names()
                .map(str::to_string)
                .collect()),
            None => Ok(Vec::new()),
        }
    }
}

/// Prefix a route configuration's path.
///
/// A configuration without a path gets the prefix as its path.
pub fn prefixed(prefix: &str, mut meta: Meta) -> Meta {
    let path = meta.path.take().unwrap_or_default();
    meta.path = Some(format!("{prefix}{path}"));
    meta
}

/// A handler decorated with routing metadata.
#[derive(Clone)]
pub struct Route {
    meta: Meta,
    handler: Handler,
}

impl Route {
    /// Wrap an async handler.
    ///
    /// # Example
    /// ```ignore
    /// let route = Route::new(Meta::get("/users/:id"), |req| async move {
    ///     let id = req.require_param("id")?;
    ///     waypoint::response::ok(&serde_json::json!({ "id": id }))
    /// });
    /// ```
    pub fn new<F, Fut, R>(meta: Meta, handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
        R: IntoReply,
    {
        let handler: Handler = Arc::new(move |req: Request| {
            handler(req)
                .map(|result| result.map(IntoReply::into_reply))
                .boxed()
        });
        Self { meta, handler }
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// Return the same route mounted under `prefix`.
    pub fn prefixed(mut self, prefix: &str) -> Self {
        self.meta = prefixed(prefix, self.meta);
        self
    }

    /// Invoke the handler.
    pub fn call(&self, req: Request) -> BoxFuture<'static, Result<Option<HttpResponse>>> {
        (self.handler)(req)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route").field("meta", &self.meta).finish()
    }
}

/// Routes sharing a path prefix. Groups nest.
#[derive(Debug, Clone, Default)]
pub struct Group {
    prefix: String,
}

impl Group {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// A nested group below this one.
    pub fn group(&self, prefix: &str) -> Self {
        Self::new(format!("{}{prefix}", self.prefix))
    }

    pub fn meta(&self, meta: Meta) -> Meta {
        prefixed(&self.prefix, meta)
    }

    /// Build a route whose path is prefixed by this group.
    pub fn route<F, Fut, R>(&self, meta: Meta, handler: F) -> Route
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
        R: IntoReply,
    {
        Route::new(self.meta(meta), handler)
    }

    /// Prefix already-built routes.
    pub fn mount(&self, routes: impl IntoIterator<Item = Route>) -> Vec<Route> {
        routes
            .into_iter()
            .map(|route| route.prefixed(&self.prefix))
            .collect()
    }
}

/// An ordered collection of routes.
///
/// Registration order decides which of two identical patterns wins, so only
/// ordered sources convert into `Routes`. Keyed sources drop their keys and
/// keep their iteration order: a `BTreeMap` contributes its routes in key
/// order, an iterator of pairs in the order it yields them.
#[derive(Debug, Clone, Default)]
pub struct Routes(Vec<Route>);

impl Routes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, route: Route) {
        self.0.push(route);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Route>> for Routes {
    fn from(routes: Vec<Route>) -> Self {
        Self(routes)
    }
}

impl<K> From<BTreeMap<K, Route>> for Routes {
    fn from(routes: BTreeMap<K, Route>) -> Self {
        Self(routes.into_values().collect())
    }
}

impl FromIterator<Route> for Routes {
    fn from_iter<I: IntoIterator<Item = Route>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<K> FromIterator<(K, Route)> for Routes {
    fn from_iter<I: IntoIterator<Item = (K, Route)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(_, route)| route).collect())
    }
}

impl Extend<Route> for Routes {
    fn extend<I: IntoIterator<Item = Route>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl IntoIterator for Routes {
    type Item = Route;
    type IntoIter = std::vec::IntoIter<Route>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Convert routes into route table inputs.
///
/// - A missing path is an error ([`Error::MissingPath`]).
/// - No declared method (or an empty list) registers the ANY token.
/// - Trailing slashes are stripped unless `keep_trailing_slashes` is set.
pub fn normalize(
    routes: impl Into<Routes>,
    keep_trailing_slashes: bool,
) -> Result<Vec<RouteInput<Route>>> {
    routes
        .into()
        .into_iter()
        .enumerate()
        .map(|(index, route)| {
            let path = route
                .meta
                .path
                .as_deref()
                .ok_or(Error::MissingPath { index })?;
            let path = if keep_trailing_slashes {
                path.to_string()
            } else {
                match trim_trailing_slashes(path) {
                    "" => "/".to_string(),
                    trimmed => trimmed.to_string(),
                }
            };

            let methods = match &route.meta.method {
                Some(methods) if !methods.is_empty() => {
                    methods.iter().cloned().map(Method::Exact).collect()
                }
                _ => vec![Method::Any],
            };

            Ok(RouteInput {
                methods,
                path,
                payload: route,
            })
        })
        .collect()
}
