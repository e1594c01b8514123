//! Route path patterns.
//!
//! A pattern such as `/users/:id/files/*rest` compiles into an ordered list of
//! [`Segment`]s. `:name` binds exactly one non-empty path segment and `*name`
//! binds everything that remains.

use std::collections::HashMap;
use std::fmt;

use percent_encoding::percent_decode_str;

/// Sigil that starts a named parameter segment.
pub const PARAM_SIGIL: char = ':';

/// Sigil that starts a wildcard (catch-all) segment.
pub const WILDCARD_SIGIL: char = '*';

/// Errors raised while compiling a route pattern.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("wildcard `{name}` in `{path}` must be the last segment")]
    MisplacedWildcard { path: String, name: String },

    #[error("pattern `{path}` declares more than one wildcard")]
    MultipleWildcards { path: String },

    #[error("parameter `{name}` is declared twice in `{path}`")]
    DuplicateParam { path: String, name: String },

    #[error("segment {index} of `{path}` has a sigil but no name")]
    EmptyName { path: String, index: usize },
}

/// One compiled path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Matches the exact text (case-sensitive).
    Literal(String),
    /// Matches one non-empty segment and binds it.
    Param(String),
    /// Matches one or more trailing segments and binds them joined by `/`.
    Wildcard(String),
}

/// A compiled route pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
    source: String,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Compile a path string into a pattern.
    ///
    /// # Example
    /// ```
    /// use waypoint::pattern::{Pattern, Segment};
    ///
    /// let pattern = Pattern::parse("/files/:owner/*rest").unwrap();
    /// assert_eq!(pattern.segments()[0], Segment::Literal("files".into()));
    /// assert_eq!(pattern.param_names().collect::<Vec<_>>(), ["owner", "rest"]);
    /// ```
    pub fn parse(path: &str) -> Result<Self, PatternError> {
        let raw: Vec<&str> = split_path(path).collect();
        let mut segments = Vec::with_capacity(raw.len());
        let mut wildcard: Option<(usize, &str)> = None;

        for (index, text) in raw.iter().enumerate() {
            let segment = if let Some(name) = text.strip_prefix(PARAM_SIGIL) {
                if name.is_empty() {
                    return Err(PatternError::EmptyName {
                        path: path.to_string(),
                        index,
                    });
                }
                Segment::Param(name.to_string())
            } else if let Some(name) = text.strip_prefix(WILDCARD_SIGIL) {
                if name.is_empty() {
                    return Err(PatternError::EmptyName {
                        path: path.to_string(),
                        index,
                    });
                }
                if wildcard.is_some() {
                    return Err(PatternError::MultipleWildcards {
                        path: path.to_string(),
                    });
                }
                wildcard = Some((index, name));
                Segment::Wildcard(name.to_string())
            } else {
                Segment::Literal(text.to_string())
            };
            segments.push(segment);
        }

        if let Some((index, name)) = wildcard
            && index + 1 != segments.len()
        {
            return Err(PatternError::MisplacedWildcard {
                path: path.to_string(),
                name: name.to_string(),
            });
        }

        let pattern = Self {
            source: path.to_string(),
            segments,
        };

        let mut seen: Vec<&str> = Vec::new();
        for name in pattern.param_names() {
            if seen.contains(&name) {
                return Err(PatternError::DuplicateParam {
                    path: path.to_string(),
                    name: name.to_string(),
                });
            }
            seen.push(name);
        }

        Ok(pattern)
    }

    /// The path string this pattern was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Names of the `Param` and `Wildcard` segments, in declaration order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Param(name) | Segment::Wildcard(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// The wildcard name, if the pattern ends in one.
    pub fn wildcard(&self) -> Option<&str> {
        match self.segments.last() {
            Some(Segment::Wildcard(name)) => Some(name),
            _ => None,
        }
    }

    /// Match an already-normalized path against this pattern alone.
    pub fn match_path(&self, path: &str) -> Option<Params> {
        let segments: Vec<&str> = split_path(path).collect();
        self.match_segments(&segments)
    }

    /// Match split path segments and bind the parameter values.
    ///
    /// Literals compare exactly, a parameter needs a non-empty segment and a
    /// wildcard needs at least one non-empty remaining segment. Bound values
    /// are percent-decoded.
    pub fn match_segments(&self, segments: &[&str]) -> Option<Params> {
        if self.wildcard().is_none() && segments.len() != self.segments.len() {
            return None;
        }

        let mut params = Params::new();
        for (index, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Literal(text) => {
                    if segments.get(index) != Some(&text.as_str()) {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = segments.get(index).filter(|s| !s.is_empty())?;
                    params.push(name, decode(value));
                }
                Segment::Wildcard(name) => {
                    let rest = segments.get(index..)?;
                    if rest.iter().all(|s| s.is_empty()) {
                        return None;
                    }
                    let rest: Vec<String> = rest.iter().map(|s| decode(s)).collect();
                    params.push(name, rest.join("/"));
                }
            }
        }
        Some(params)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Path parameters bound by a match, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    pairs: Vec<(String, String)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value bound to `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    fn push(&mut self, name: &str, value: String) {
        self.pairs.push((name.to_string(), value));
    }
}

impl FromIterator<(String, String)> for Params {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().collect(),
        }
    }
}

impl From<Params> for HashMap<String, String> {
    fn from(params: Params) -> Self {
        params.pairs.into_iter().collect()
    }
}

fn decode(segment: &str) -> String {
    match percent_decode_str(segment).decode_utf8() {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => segment.to_string(),
    }
}

/// Split a path into segments.
///
/// The empty segment produced by a leading `/` is dropped, and `/` on its own
/// (or the empty string) has no segments. Any other empty segment is kept, so
/// `/a/b/` yields `["a", "b", ""]`.
pub fn split_path(path: &str) -> impl Iterator<Item = &str> {
    let rest = path.strip_prefix('/').unwrap_or(path);
    let mut parts = rest.split('/');
    if rest.is_empty() {
        parts.next();
    }
    parts
}

/// Strip trailing `/` characters. A path made only of slashes becomes `/`.
pub fn trim_trailing_slashes(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/"
    } else {
        trimmed
    }
}
