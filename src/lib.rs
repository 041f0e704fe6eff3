//! appmux: hosts independently developed web applications behind one
//! HTTP(S) listener, each under its own path prefix.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod plugin;
pub mod registry;
pub mod routing;

pub use config::ServerConfig;
pub use error::ServerError;
pub use lifecycle::{AppServer, RunningServer, Shutdown};
pub use plugin::{PluginInstance, PluginLoader, StaticPluginLoader};
pub use registry::Registry;
