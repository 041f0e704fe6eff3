//! Configuration schema definitions.
//!
//! This module defines the typed configuration structure for the host.
//! All types derive Serde traits for deserialization from the JSON document
//! once it has passed schema validation.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the application host.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Port to listen for HTTP requests on.
    pub port: u16,

    /// Address the listeners bind to.
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,

    /// Folder scanned for applications (one application per subdirectory).
    #[serde(default)]
    pub app_directory: Option<PathBuf>,

    /// A single application served in standalone mode.
    #[serde(default)]
    pub standalone: Option<AppMountSpec>,

    /// Forward WebSocket upgrades to mounted applications.
    #[serde(default)]
    pub web_sockets: bool,

    /// Serve folders without a plugin manifest as static content.
    #[serde(default)]
    pub allow_static: bool,

    /// Render directory listings for static mounts.
    #[serde(default)]
    pub static_folder_list: bool,

    /// Optional per-user mounts at `/~username`.
    #[serde(default)]
    pub user_folders: Option<UserFolders>,

    /// Optional HTTPS listener.
    #[serde(default)]
    pub ssl: Option<SslConfig>,

    /// Upper bound for a single plugin initializer, in seconds.
    #[serde(default)]
    pub mount_timeout_secs: Option<u64>,

    /// Upper bound for a single plugin shutdown action, in seconds.
    #[serde(default)]
    pub shutdown_timeout_secs: Option<u64>,
}

fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

/// A web path bound to a local folder.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AppMountSpec {
    /// The mount point for the application (always starts with `/`).
    pub web_path: String,

    /// The folder holding the application.
    pub local_path: PathBuf,
}

/// User folder configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserFolders {
    /// Directory containing user home directories.
    pub user_root: PathBuf,

    /// Folder inside each home directory that gets served.
    pub public_folder: String,
}

/// HTTPS listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SslConfig {
    /// Port to listen for HTTPS requests on.
    pub port: u16,

    /// Redirect every plain HTTP request to HTTPS.
    #[serde(default)]
    pub redirect: bool,

    /// Private key (PEM).
    #[serde(rename = "keyFile")]
    pub key_file: PathBuf,

    /// Certificate chain (PEM).
    #[serde(rename = "certFile")]
    pub cert_file: PathBuf,
}

/// How applications are found for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryMode {
    /// Exactly one application.
    Standalone(AppMountSpec),
    /// Every immediate subdirectory of the given folder.
    Directory(PathBuf),
}

impl ServerConfig {
    /// Minimal configuration scanning `app_directory` on `port`.
    pub fn with_app_directory(port: u16, app_directory: impl Into<PathBuf>) -> Self {
        Self {
            port,
            bind_address: default_bind_address(),
            app_directory: Some(app_directory.into()),
            standalone: None,
            web_sockets: false,
            allow_static: false,
            static_folder_list: false,
            user_folders: None,
            ssl: None,
            mount_timeout_secs: None,
            shutdown_timeout_secs: None,
        }
    }

    /// The active discovery mode. Standalone takes precedence over a scan.
    pub fn discovery_mode(&self) -> Option<DiscoveryMode> {
        match (&self.standalone, &self.app_directory) {
            (Some(spec), _) => Some(DiscoveryMode::Standalone(spec.clone())),
            (None, Some(dir)) => Some(DiscoveryMode::Directory(dir.clone())),
            (None, None) => None,
        }
    }

    pub fn mount_timeout(&self) -> Option<Duration> {
        self.mount_timeout_secs.map(Duration::from_secs)
    }

    pub fn shutdown_timeout(&self) -> Option<Duration> {
        self.shutdown_timeout_secs.map(Duration::from_secs)
    }

    /// HTTPS port to redirect to, when redirection is enabled.
    pub fn redirect_port(&self) -> Option<u16> {
        self.ssl.as_ref().filter(|ssl| ssl.redirect).map(|ssl| ssl.port)
    }
}
