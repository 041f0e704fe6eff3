//! Resolving manifests to plugin factories.
//!
//! # Responsibilities
//! - Abstract how an entry name becomes an initializer
//! - Provide a compile-time registry keyed by entry name
//!
//! # Design Decisions
//! - The discovery code depends only on the `PluginLoader` trait, so other
//!   loading strategies can be swapped in without touching it
//! - Unknown entries are a per-mount failure, not a fatal error

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;

use crate::plugin::{factory, MountContext, PluginError, PluginFactory, PluginInstance, PluginManifest};

/// Turns a manifest into something that can build a plugin instance.
pub trait PluginLoader: Send + Sync {
    fn load(&self, manifest: &PluginManifest, manifest_path: &Path) -> Result<PluginFactory, PluginError>;
}

/// Factories registered by name at build time.
#[derive(Default, Clone)]
pub struct StaticPluginLoader {
    factories: HashMap<String, PluginFactory>,
}

impl StaticPluginLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a ready-made factory. A later registration replaces an earlier one.
    pub fn register_factory(&mut self, entry: impl Into<String>, factory: PluginFactory) -> &mut Self {
        let entry = entry.into();
        if self.factories.insert(entry.clone(), factory).is_some() {
            tracing::warn!(entry = %entry, "Plugin entry registered twice; keeping the latest");
        }
        self
    }

    /// Register an async initializer.
    pub fn register<F, Fut>(&mut self, entry: impl Into<String>, init: F) -> &mut Self
    where
        F: Fn(MountContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<PluginInstance, PluginError>> + Send + 'static,
    {
        self.register_factory(entry, factory(init))
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl PluginLoader for StaticPluginLoader {
    fn load(&self, manifest: &PluginManifest, manifest_path: &Path) -> Result<PluginFactory, PluginError> {
        tracing::debug!(entry = %manifest.entry, manifest = %manifest_path.display(), "Resolving plugin entry");
        self.factories
            .get(&manifest.entry)
            .cloned()
            .ok_or_else(|| PluginError::UnknownEntry(manifest.entry.clone()))
    }
}

impl std::fmt::Debug for StaticPluginLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut entries: Vec<_> = self.entries().collect();
        entries.sort_unstable();
        f.debug_struct("StaticPluginLoader").field("entries", &entries).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;

    fn manifest(entry: &str) -> PluginManifest {
        PluginManifest {
            entry: entry.to_string(),
            disabled: None,
        }
    }

    #[tokio::test]
    async fn test_load_registered_entry() {
        let mut loader = StaticPluginLoader::new();
        loader.register("hello", |_ctx| async { Ok(PluginInstance::new(Router::new())) });

        let factory = loader.load(&manifest("hello"), Path::new("plugin.toml")).unwrap();
        let instance = factory(MountContext {
            web_path: "/hello".into(),
            local_path: "/srv/hello".into(),
        })
        .await
        .unwrap();
        assert!(!instance.has_shutdown());
        assert!(!instance.has_upgrade_handler());
    }

    #[test]
    fn test_unknown_entry() {
        let loader = StaticPluginLoader::new();
        assert!(matches!(
            loader.load(&manifest("missing"), Path::new("plugin.toml")),
            Err(PluginError::UnknownEntry(name)) if name == "missing"
        ));
    }
}
