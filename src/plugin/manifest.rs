//! Plugin manifest (`plugin.toml`).

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::plugin::PluginError;

/// File name looked up in every candidate folder.
pub const MANIFEST_FILE: &str = "plugin.toml";

/// Declares which registered initializer serves a folder.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PluginManifest {
    /// Name the initializer was registered under.
    pub entry: String,

    /// Collaborator-defined flag; recorded but not acted upon by the host.
    #[serde(default)]
    pub disabled: Option<bool>,
}

impl PluginManifest {
    pub fn parse(text: &str, path: &Path) -> Result<Self, PluginError> {
        let manifest: PluginManifest = toml::from_str(text).map_err(|e| PluginError::Manifest {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if manifest.entry.trim().is_empty() {
            return Err(PluginError::Manifest {
                path: path.to_path_buf(),
                reason: "`entry` must not be empty".to_string(),
            });
        }
        Ok(manifest)
    }

    /// Read the manifest inside `folder`. `None` when it is absent or unreadable.
    pub async fn read(folder: &Path) -> Option<(String, PathBuf)> {
        let path = folder.join(MANIFEST_FILE);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Some((text, path)),
            Err(_) => None,
        }
    }
}
