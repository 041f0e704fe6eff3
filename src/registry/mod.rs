//! Mount registry.
//!
//! # Data Flow
//! ```text
//! Discovery (discovery.rs):
//!     ServerConfig
//!     → candidates (standalone | app directory + user folders)
//!     → mount each candidate (plugin manifest | static folder)
//!     → RegistryBuilder
//!     → freeze: Registry (read-only) + ShutdownActions (ordered)
//! ```
//!
//! # Design Decisions
//! - Built once, then immutable: request-time reads need no locking
//! - Keys are unique and kept in discovery order
//! - Shutdown actions are split off at freeze time so the registry itself
//!   holds nothing that must be consumed

pub mod discovery;

use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::Router;
use thiserror::Error;

use crate::lifecycle::shutdown::ShutdownActions;
use crate::plugin::{PluginError, ShutdownAction, UpgradeHandler};

pub use discovery::Discovery;

/// Why a single candidate could not be mounted.
#[derive(Debug, Error)]
pub enum MountError {
    #[error("invalid web path {path:?}: {reason}")]
    InvalidWebPath { path: String, reason: &'static str },

    #[error("{0} is already mounted")]
    Duplicate(String),

    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error("could not find {}", .0.display())]
    NothingToServe(PathBuf),

    #[error("cannot resolve {}: {source}", path.display())]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("initializer did not finish within {0:?}")]
    TimedOut(Duration),
}

/// What kind of content a mount serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountKind {
    Plugin,
    Static,
}

/// A path prefix bound to a routing capability.
#[derive(Clone)]
pub struct MountedApplication {
    web_path: String,
    local_path: PathBuf,
    kind: MountKind,
    router: Router,
    upgrade: Option<UpgradeHandler>,
}

impl MountedApplication {
    pub fn new(
        web_path: impl Into<String>,
        local_path: impl Into<PathBuf>,
        kind: MountKind,
        router: Router,
        upgrade: Option<UpgradeHandler>,
    ) -> Self {
        Self {
            web_path: web_path.into(),
            local_path: local_path.into(),
            kind,
            router,
            upgrade,
        }
    }

    pub fn web_path(&self) -> &str {
        &self.web_path
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    pub fn kind(&self) -> MountKind {
        self.kind
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn upgrade_handler(&self) -> Option<&UpgradeHandler> {
        self.upgrade.as_ref()
    }
}

impl std::fmt::Debug for MountedApplication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountedApplication")
            .field("web_path", &self.web_path)
            .field("local_path", &self.local_path)
            .field("kind", &self.kind)
            .field("upgrade", &self.upgrade.is_some())
            .finish_non_exhaustive()
    }
}

/// Check that `path` is `/` or `/segment[/segment...]` and safe to nest.
pub fn validate_web_path(path: &str) -> Result<(), MountError> {
    let invalid = |reason| {
        Err(MountError::InvalidWebPath {
            path: path.to_string(),
            reason,
        })
    };

    if path == "/" {
        return Ok(());
    }
    let Some(rest) = path.strip_prefix('/') else {
        return invalid("must start with `/`");
    };
    for segment in rest.split('/') {
        if segment.is_empty() {
            return invalid("empty segment or trailing `/`");
        }
        if segment.starts_with(':') || segment.starts_with('*') {
            return invalid("segment may not start with `:` or `*`");
        }
        if segment.contains(['{', '}']) {
            return invalid("braces are not allowed");
        }
    }
    Ok(())
}

/// Mutable registry, used only while discovery runs.
#[derive(Default)]
pub struct RegistryBuilder {
    mounts: Vec<MountedApplication>,
    shutdown: ShutdownActions,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, web_path: &str) -> bool {
        self.mounts.iter().any(|m| m.web_path == web_path)
    }

    /// Check a web path before anything is done to mount it.
    pub fn check_available(&self, web_path: &str) -> Result<(), MountError> {
        validate_web_path(web_path)?;
        if self.contains(web_path) {
            return Err(MountError::Duplicate(web_path.to_string()));
        }
        Ok(())
    }

    /// Register a mount and, if present, queue its shutdown action.
    pub fn insert(&mut self, mount: MountedApplication, shutdown: Option<ShutdownAction>) -> Result<(), MountError> {
        self.check_available(&mount.web_path)?;
        if let Some(action) = shutdown {
            self.shutdown.push(mount.web_path.clone(), action);
        }
        self.mounts.push(mount);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    pub fn freeze(self) -> (Registry, ShutdownActions) {
        (Registry { mounts: self.mounts }, self.shutdown)
    }
}

/// Frozen set of mounts, in discovery order.
#[derive(Debug, Clone)]
pub struct Registry {
    mounts: Vec<MountedApplication>,
}

impl Registry {
    pub fn iter(&self) -> impl Iterator<Item = &MountedApplication> {
        self.mounts.iter()
    }

    pub fn get(&self, web_path: &str) -> Option<&MountedApplication> {
        self.mounts.iter().find(|m| m.web_path == web_path)
    }

    pub fn web_paths(&self) -> Vec<&str> {
        self.mounts.iter().map(|m| m.web_path.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;

    fn mount(web_path: &str) -> MountedApplication {
        MountedApplication::new(web_path, "/srv", MountKind::Static, Router::new(), None)
    }

    #[test]
    fn test_validate_web_path() {
        assert!(validate_web_path("/").is_ok());
        assert!(validate_web_path("/app").is_ok());
        assert!(validate_web_path("/~bob").is_ok());
        assert!(validate_web_path("/a/b").is_ok());

        assert!(validate_web_path("").is_err());
        assert!(validate_web_path("app").is_err());
        assert!(validate_web_path("/app/").is_err());
        assert!(validate_web_path("//app").is_err());
        assert!(validate_web_path("/:id").is_err());
        assert!(validate_web_path("/*rest").is_err());
        assert!(validate_web_path("/{x}").is_err());
    }

    #[test]
    fn test_builder_rejects_duplicates() {
        let mut builder = RegistryBuilder::new();
        builder.insert(mount("/a"), None).unwrap();
        assert!(matches!(builder.insert(mount("/a"), None), Err(MountError::Duplicate(_))));
        assert_eq!(builder.len(), 1);
    }

    #[test]
    fn test_freeze_keeps_order_and_shutdowns() {
        let mut builder = RegistryBuilder::new();
        builder.insert(mount("/b"), Some(Box::new(|| async {}.boxed()))).unwrap();
        builder.insert(mount("/"), None).unwrap();
        builder.insert(mount("/a"), Some(Box::new(|| async {}.boxed()))).unwrap();

        let (registry, shutdown) = builder.freeze();
        assert_eq!(registry.web_paths(), vec!["/b", "/", "/a"]);
        assert_eq!(shutdown.web_paths(), vec!["/b", "/a"]);
        assert_eq!(registry.get("/").map(|m| m.kind()), Some(MountKind::Static));
        assert!(registry.get("/c").is_none());
    }
}
