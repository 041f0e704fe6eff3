//! Plugin contract.
//!
//! # Data Flow
//! ```text
//! <local_path>/plugin.toml
//!     → manifest.rs (entry name, disabled flag)
//!     → loader.rs (entry name → PluginFactory)
//!     → factory(MountContext) → PluginInstance
//!     → registry (router, upgrade handler) + shutdown list
//! ```
//!
//! # Design Decisions
//! - The host never links plugins dynamically; loaders resolve an entry name
//!   to a factory registered at compile time
//! - A plugin instance is a routing capability plus two optional hooks
//! - Plugins run with full host privilege; nothing here sandboxes them

pub mod builtin;
pub mod loader;
pub mod manifest;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::ws::WebSocket;
use axum::http::Request;
use axum::Router;
use futures_util::future::{BoxFuture, FutureExt};
use thiserror::Error;

pub use loader::{PluginLoader, StaticPluginLoader};
pub use manifest::{PluginManifest, MANIFEST_FILE};

/// The request that opened an upgraded connection, with the mount prefix
/// already stripped from its path.
pub type UpgradeRequest = Request<()>;

/// Takes over an upgraded connection.
pub type UpgradeHandler = Arc<dyn Fn(WebSocket, UpgradeRequest) -> BoxFuture<'static, ()> + Send + Sync>;

/// Releases a plugin's resources during process teardown.
pub type ShutdownAction = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send + Sync>;

/// Builds a plugin instance for a mount point.
pub type PluginFactory =
    Arc<dyn Fn(MountContext) -> BoxFuture<'static, Result<PluginInstance, PluginError>> + Send + Sync>;

/// Arguments handed to a plugin initializer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountContext {
    pub web_path: String,
    pub local_path: PathBuf,
}

/// Errors raised while loading or initializing a plugin.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("malformed manifest {}: {reason}", path.display())]
    Manifest { path: PathBuf, reason: String },

    #[error("no plugin registered for entry `{0}`")]
    UnknownEntry(String),

    #[error("initializer failed: {0}")]
    Init(String),
}

/// What a plugin initializer hands back to the host.
pub struct PluginInstance {
    router: Router,
    shutdown: Option<ShutdownAction>,
    upgrade: Option<UpgradeHandler>,
}

impl PluginInstance {
    pub fn new(router: Router) -> Self {
        Self {
            router,
            shutdown: None,
            upgrade: None,
        }
    }

    /// Attach an action awaited once during host shutdown.
    pub fn with_shutdown<F, Fut>(mut self, action: F) -> Self
    where
        F: FnOnce() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.shutdown = Some(Box::new(move || action().boxed()));
        self
    }

    /// Attach a handler for WebSocket upgrades under this mount.
    pub fn with_upgrade_handler<F, Fut>(mut self, handler: F) -> Self
    where
        F: Fn(WebSocket, UpgradeRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.upgrade = Some(Arc::new(move |socket, request| handler(socket, request).boxed()));
        self
    }

    pub fn has_shutdown(&self) -> bool {
        self.shutdown.is_some()
    }

    pub fn has_upgrade_handler(&self) -> bool {
        self.upgrade.is_some()
    }

    pub fn into_parts(self) -> (Router, Option<ShutdownAction>, Option<UpgradeHandler>) {
        (self.router, self.shutdown, self.upgrade)
    }
}

impl std::fmt::Debug for PluginInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginInstance")
            .field("shutdown", &self.shutdown.is_some())
            .field("upgrade", &self.upgrade.is_some())
            .finish_non_exhaustive()
    }
}

/// Wrap an async initializer function as a [`PluginFactory`].
pub fn factory<F, Fut>(init: F) -> PluginFactory
where
    F: Fn(MountContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<PluginInstance, PluginError>> + Send + 'static,
{
    Arc::new(move |ctx| init(ctx).boxed())
}
