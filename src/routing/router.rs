//! Upgrade route lookup.
//!
//! # Responsibilities
//! - Find the mount owning an upgrade request's path
//! - Produce the path the plugin sees (prefix stripped, query kept)
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) prefix scan (acceptable for typical mount counts)
//! - Longest prefix wins; among equal lengths the first registered wins
//! - Explicit `None` rather than a default route

use std::sync::Arc;

use axum::http::Uri;

use crate::registry::{MountedApplication, Registry};
use crate::routing::matcher::PathPrefixMatcher;

/// Result of a successful lookup.
#[derive(Debug)]
pub struct UpgradeRoute<'a> {
    pub mount: &'a MountedApplication,
    /// Request path relative to the mount.
    pub path: String,
}

/// Longest-prefix lookup over a frozen registry.
#[derive(Debug, Clone)]
pub struct UpgradeRouter {
    registry: Arc<Registry>,
    matchers: Vec<PathPrefixMatcher>,
}

impl UpgradeRouter {
    pub fn new(registry: Arc<Registry>) -> Self {
        let matchers = registry
            .iter()
            .map(|mount| PathPrefixMatcher::new(mount.web_path()))
            .collect();
        Self { registry, matchers }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Pick the mount for `path`. The caller decides what to do when the
    /// mount has no upgrade handler.
    pub fn resolve(&self, path: &str) -> Option<UpgradeRoute<'_>> {
        let mut best: Option<(&PathPrefixMatcher, &MountedApplication)> = None;

        for (matcher, mount) in self.matchers.iter().zip(self.registry.iter()) {
            if !matcher.matches(path) {
                continue;
            }
            let longer = match best {
                Some((current, _)) => matcher.len() > current.len(),
                None => true,
            };
            if longer {
                best = Some((matcher, mount));
            }
        }

        let (matcher, mount) = best?;
        let stripped = matcher.strip(path)?;
        Some(UpgradeRoute {
            mount,
            path: stripped.to_string(),
        })
    }
}

/// Replace the path of `uri`, keeping its query string.
pub fn rewrite_uri(uri: &Uri, path: &str) -> Result<Uri, axum::http::Error> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };

    let mut builder = Uri::builder();
    if let Some(scheme) = uri.scheme() {
        builder = builder.scheme(scheme.clone());
    }
    if let Some(authority) = uri.authority() {
        builder = builder.authority(authority.clone());
    }
    builder.path_and_query(path_and_query).build()
}
