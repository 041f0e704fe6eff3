//! Path prefix matching.
//!
//! # Responsibilities
//! - Decide whether a request path falls under a mount prefix
//! - Strip the prefix to produce the path the plugin sees
//!
//! # Design Decisions
//! - Matching is segment-aware, not a plain character prefix: `/app` covers
//!   `/app` and `/app/...`, never `/apple`. This is the same rule the nested
//!   HTTP routers apply, so an upgrade and a plain request for one path
//!   always land on the same mount
//! - Path matching is case-sensitive
//! - `/` matches everything and is never stripped
//! - No regex: a match is one `starts_with` plus a boundary check

/// Matches the request path against a mount prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Length used to rank competing matches.
    pub fn len(&self) -> usize {
        self.prefix.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prefix.is_empty()
    }

    /// True if `path` equals the prefix or continues it at a `/` boundary.
    pub fn matches(&self, path: &str) -> bool {
        if self.prefix == "/" {
            return true;
        }
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// The path with the prefix removed, or `None` if it does not match.
    /// Stripping everything yields `/`.
    pub fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        if !self.matches(path) {
            return None;
        }
        if self.prefix == "/" {
            return Some(path);
        }
        match &path[self.prefix.len()..] {
            "" => Some("/"),
            rest => Some(rest),
        }
    }
}
