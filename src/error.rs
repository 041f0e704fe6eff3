//! Fatal startup errors.
//!
//! Everything here aborts the run before (or instead of) serving. Per-mount
//! failures live in [`crate::registry::MountError`] and never reach this type.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("no configuration file found")]
    ConfigNotFound,

    #[error("invalid configuration: {0}")]
    ConfigInvalid(ConfigError),

    #[error("no applications could be mounted")]
    NoApplicationsMounted,

    #[error("cannot listen on {addr}: {source}")]
    ListenerBind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("TLS material {}: {reason}", path.display())]
    TlsMaterial { path: PathBuf, reason: String },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

impl From<ConfigError> for ServerError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NotFound => ServerError::ConfigNotFound,
            other => ServerError::ConfigInvalid(other),
        }
    }
}
