//! Route table: per-method tries over compiled patterns.
//!
//! Every method group (one per exact method, plus the ANY group) owns a trie.
//! A node holds literal children keyed by exact text, at most one parameter
//! child and at most one wildcard leaf. Lookups prefer literal, then
//! parameter, then wildcard at each depth, and fall back to a lower-priority
//! branch only when the preferred one cannot complete the path.

use std::collections::HashMap;
use std::fmt;

use tracing::warn;

use crate::pattern::{Pattern, PatternError, Segment, split_path};

pub use crate::pattern::Params;

/// Method token a route is registered under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    /// Matches every incoming method.
    Any,
    /// Matches one method exactly, including extension methods like `PURGE`.
    Exact(hyper::Method),
}

impl From<hyper::Method> for Method {
    fn from(method: hyper::Method) -> Self {
        Method::Exact(method)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Any => f.write_str("*"),
            Method::Exact(method) => f.write_str(method.as_str()),
        }
    }
}

/// A route ready to be inserted into a [`Table`].
#[derive(Debug, Clone)]
pub struct RouteInput<T> {
    pub methods: Vec<Method>,
    pub path: String,
    pub payload: T,
}

/// Result of a successful lookup.
#[derive(Debug)]
pub struct Match<'a, T> {
    pub payload: &'a T,
    pub pattern: &'a Pattern,
    pub params: Params,
}

/// A route lookup structure the router can dispatch through.
///
/// [`Table`] is the default. An implementation receives the normalized
/// routes once, in registration order, and is never mutated afterwards.
pub trait Matcher<T>: Sized + Send + Sync {
    /// Build the matcher. Malformed patterns must fail the build.
    fn build(routes: Vec<RouteInput<T>>) -> Result<Self, PatternError>;

    /// Find the route for `method` and an already-normalized `path`.
    fn at(&self, method: &hyper::Method, path: &str) -> Option<Match<'_, T>>;

    /// Number of routes the matcher holds.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
struct Node {
    literals: HashMap<String, Node>,
    param: Option<Box<Node>>,
    wildcard: Option<usize>,
    route: Option<usize>,
}

impl Node {
    /// Insert `id` at the end of `segments`. Returns the id already occupying
    /// that position if the pattern is a duplicate.
    fn insert(&mut self, segments: &[Segment], id: usize) -> Option<usize> {
        let Some((first, rest)) = segments.split_first() else {
            return match self.route {
                Some(existing) => Some(existing),
                None => {
                    self.route = Some(id);
                    None
                }
            };
        };

        match first {
            Segment::Literal(text) => self
                .literals
                .entry(text.clone())
                .or_default()
                .insert(rest, id),
            Segment::Param(_) => self
                .param
                .get_or_insert_with(Default::default)
                .insert(rest, id),
            Segment::Wildcard(_) => match self.wildcard {
                Some(existing) => Some(existing),
                None => {
                    self.wildcard = Some(id);
                    None
                }
            },
        }
    }

    fn find(&self, segments: &[&str], depth: usize) -> Option<usize> {
        let Some(segment) = segments.get(depth) else {
            return self.route;
        };

        if let Some(child) = self.literals.get(*segment)
            && let Some(id) = child.find(segments, depth + 1)
        {
            return Some(id);
        }

        if !segment.is_empty()
            && let Some(child) = &self.param
            && let Some(id) = child.find(segments, depth + 1)
        {
            return Some(id);
        }

        if let Some(id) = self.wildcard
            && segments[depth..].iter().any(|s| !s.is_empty())
        {
            return Some(id);
        }

        None
    }
}

struct Entry<T> {
    pattern: Pattern,
    payload: T,
}

/// Immutable route table.
pub struct Table<T> {
    entries: Vec<Entry<T>>,
    methods: HashMap<hyper::Method, Node>,
    any: Node,
}

impl<T> Table<T> {
    /// Compile every route and build the method tries.
    ///
    /// Fails on the first malformed pattern. A route whose pattern duplicates
    /// an earlier one in the same method group is kept in the table but can
    /// never be matched; a warning is logged for it.
    pub fn build(routes: Vec<RouteInput<T>>) -> Result<Self, PatternError> {
        let mut table = Self {
            entries: Vec::with_capacity(routes.len()),
            methods: HashMap::new(),
            any: Node::default(),
        };

        for route in routes {
            let pattern = Pattern::parse(&route.path)?;
            let id = table.entries.len();

            for method in &route.methods {
                let node = match method {
                    Method::Any => &mut table.any,
                    Method::Exact(m) => table.methods.entry(m.clone()).or_default(),
                };
                if let Some(existing) = node.insert(pattern.segments(), id) {
                    warn!(
                        method = %method,
                        path = %pattern,
                        shadowed_by = %table.entries[existing].pattern,
                        "Route is unreachable: an earlier route has the same pattern"
                    );
                }
            }

            table.entries.push(Entry {
                pattern,
                payload: route.payload,
            });
        }

        Ok(table)
    }

    /// Find the best route for `method` and an already-normalized `path`.
    ///
    /// The exact-method group is searched first, then the ANY group.
    pub fn at(&self, method: &hyper::Method, path: &str) -> Option<Match<'_, T>> {
        let segments: Vec<&str> = split_path(path).collect();

        let id = self
            .methods
            .get(method)
            .and_then(|node| node.find(&segments, 0))
            .or_else(|| self.any.find(&segments, 0))?;

        let entry = &self.entries[id];
        Some(Match {
            payload: &entry.payload,
            pattern: &entry.pattern,
            params: entry.pattern.match_segments(&segments)?,
        })
    }

    /// Number of registered routes, including shadowed ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Send + Sync> Matcher<T> for Table<T> {
    fn build(routes: Vec<RouteInput<T>>) -> Result<Self, PatternError> {
        Table::build(routes)
    }

    fn at(&self, method: &hyper::Method, path: &str) -> Option<Match<'_, T>> {
        Table::at(self, method, path)
    }

    fn len(&self) -> usize {
        Table::len(self)
    }
}

impl<T> fmt::Debug for Table<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field(
                "patterns",
                &self.entries.iter().map(|e| e.pattern.source()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
