//! Application discovery.
//!
//! # Responsibilities
//! - Enumerate candidate mounts (standalone, or app directory + user folders)
//!   User folders only apply to a directory scan
//! - Mount each candidate as a plugin or a static folder
//! - Tolerate per-candidate failures; fail only on an empty registry
//!
//! # Design Decisions
//! - Candidates are mounted one at a time, in enumeration order: app
//!   directory entries first, then user folders, each sorted by name
//! - The web path is checked before the manifest is read, so a duplicate
//!   never initializes its plugin
//! - Names that are not valid UTF-8 cannot form a web path and are skipped

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{DiscoveryMode, ServerConfig, UserFolders};
use crate::error::ServerError;
use crate::http::static_files::static_router;
use crate::lifecycle::shutdown::ShutdownActions;
use crate::plugin::{MountContext, PluginLoader, PluginManifest, ShutdownAction};
use crate::registry::{MountError, MountKind, MountedApplication, Registry, RegistryBuilder};

/// Folder name mounted at `/` during a directory scan.
pub const ROOT_FOLDER: &str = "ROOT";

/// A web path paired with the folder that should serve it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub web_path: String,
    pub local_path: PathBuf,
}

impl Candidate {
    fn new(web_path: impl Into<String>, local_path: impl Into<PathBuf>) -> Self {
        Self {
            web_path: web_path.into(),
            local_path: local_path.into(),
        }
    }
}

/// Turns a configuration into a frozen registry.
pub struct Discovery {
    mode: Option<DiscoveryMode>,
    user_folders: Option<UserFolders>,
    allow_static: bool,
    static_folder_list: bool,
    mount_timeout: Option<Duration>,
    loader: Arc<dyn PluginLoader>,
}

impl Discovery {
    pub fn new(config: &ServerConfig, loader: Arc<dyn PluginLoader>) -> Self {
        Self {
            mode: config.discovery_mode(),
            user_folders: config.user_folders.clone(),
            allow_static: config.allow_static,
            static_folder_list: config.static_folder_list,
            mount_timeout: config.mount_timeout(),
            loader,
        }
    }

    /// Mount every candidate and freeze the result.
    pub async fn discover(&self) -> Result<(Registry, ShutdownActions), ServerError> {
        let mut builder = RegistryBuilder::new();

        for candidate in self.candidates().await {
            let mounted = self
                .mount(&builder, &candidate)
                .await
                .and_then(|(mount, shutdown)| {
                    let kind = mount.kind();
                    builder.insert(mount, shutdown).map(|()| kind)
                });
            match mounted {
                Ok(kind) => tracing::info!(
                    web_path = %candidate.web_path,
                    local_path = %candidate.local_path.display(),
                    kind = ?kind,
                    "Mounted application"
                ),
                Err(error) => tracing::error!(
                    web_path = %candidate.web_path,
                    local_path = %candidate.local_path.display(),
                    error = %error,
                    "While mounting"
                ),
            }
        }

        if builder.is_empty() {
            return Err(ServerError::NoApplicationsMounted);
        }
        tracing::info!(count = builder.len(), "Discovery complete");
        Ok(builder.freeze())
    }

    /// Candidates in mount order.
    pub async fn candidates(&self) -> Vec<Candidate> {
        let mut candidates = Vec::new();

        match &self.mode {
            Some(DiscoveryMode::Standalone(spec)) => match tokio::fs::canonicalize(&spec.local_path).await {
                Ok(local_path) => candidates.push(Candidate::new(spec.web_path.clone(), local_path)),
                Err(source) => {
                    let error = MountError::Resolve {
                        path: spec.local_path.clone(),
                        source,
                    };
                    tracing::error!(web_path = %spec.web_path, error = %error, "While mounting");
                }
            },
            Some(DiscoveryMode::Directory(dir)) => {
                for (name, path) in subdirectories(dir).await {
                    let web_path = if name == ROOT_FOLDER {
                        "/".to_string()
                    } else {
                        format!("/{name}")
                    };
                    candidates.push(Candidate::new(web_path, path));
                }
                if let Some(users) = &self.user_folders {
                    candidates.extend(user_candidates(users).await);
                }
            }
            None => {}
        }

        candidates
    }

    /// Build the mount for one candidate without registering it.
    pub async fn mount(
        &self,
        builder: &RegistryBuilder,
        candidate: &Candidate,
    ) -> Result<(MountedApplication, Option<ShutdownAction>), MountError> {
        builder.check_available(&candidate.web_path)?;

        if let Some((text, manifest_path)) = PluginManifest::read(&candidate.local_path).await {
            return self.mount_plugin(candidate, &text, &manifest_path).await;
        }

        if self.allow_static && is_readable_dir(&candidate.local_path).await {
            let router = static_router(&candidate.web_path, &candidate.local_path, self.static_folder_list);
            let mount = MountedApplication::new(
                candidate.web_path.clone(),
                candidate.local_path.clone(),
                MountKind::Static,
                router,
                None,
            );
            return Ok((mount, None));
        }

        Err(MountError::NothingToServe(candidate.local_path.clone()))
    }

    async fn mount_plugin(
        &self,
        candidate: &Candidate,
        text: &str,
        manifest_path: &Path,
    ) -> Result<(MountedApplication, Option<ShutdownAction>), MountError> {
        let manifest = PluginManifest::parse(text, manifest_path)?;
        if manifest.disabled == Some(true) {
            tracing::info!(
                web_path = %candidate.web_path,
                entry = %manifest.entry,
                "Manifest is marked disabled"
            );
        }

        let factory = self.loader.load(&manifest, manifest_path)?;
        let init = factory(MountContext {
            web_path: candidate.web_path.clone(),
            local_path: candidate.local_path.clone(),
        });
        let instance = match self.mount_timeout {
            Some(limit) => tokio::time::timeout(limit, init)
                .await
                .map_err(|_| MountError::TimedOut(limit))??,
            None => init.await?,
        };

        let (router, shutdown, upgrade) = instance.into_parts();
        let mount = MountedApplication::new(
            candidate.web_path.clone(),
            candidate.local_path.clone(),
            MountKind::Plugin,
            router,
            upgrade,
        );
        Ok((mount, shutdown))
    }
}

/// `/~name` for every user whose public folder can be read.
async fn user_candidates(users: &UserFolders) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    for (name, home) in subdirectories(&users.user_root).await {
        let public = home.join(&users.public_folder);
        if is_readable_dir(&public).await {
            candidates.push(Candidate::new(format!("/~{name}"), public));
        } else {
            tracing::debug!(user = %name, path = %public.display(), "No readable public folder");
        }
    }
    candidates
}

/// Immediate subdirectories of `dir`, sorted by name.
async fn subdirectories(dir: &Path) -> Vec<(String, PathBuf)> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(error) => {
            tracing::error!(path = %dir.display(), error = %error, "Cannot read directory");
            return Vec::new();
        }
    };

    let mut found = Vec::new();
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(error) => {
                tracing::warn!(path = %dir.display(), error = %error, "Directory listing interrupted");
                break;
            }
        };
        let path = entry.path();
        // Follows symlinks, unlike DirEntry::file_type.
        let is_dir = tokio::fs::metadata(&path).await.map(|m| m.is_dir()).unwrap_or(false);
        if !is_dir {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => found.push((name, path)),
            Err(raw) => tracing::warn!(name = ?raw, "Skipping folder with a non UTF-8 name"),
        }
    }

    found.sort_by(|a, b| a.0.cmp(&b.0));
    found
}

async fn is_readable_dir(path: &Path) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => tokio::fs::read_dir(path).await.is_ok(),
        _ => false,
    }
}
