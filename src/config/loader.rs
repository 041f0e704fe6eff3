//! Configuration loading from disk.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::ServerConfig;
use crate::config::search::config_search;
use crate::config::validation::{validate, ValidatedConfig, Violation};
use crate::registry::validate_web_path;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no configuration file found")]
    NotFound,

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("schema unavailable: {0}")]
    SchemaFetch(String),

    #[error("schema is not valid JSON: {0}")]
    SchemaParse(String),

    #[error("schema cannot be compiled: {0}")]
    SchemaCompile(String),

    #[error("{} schema violation(s): {}", .0.len(), join(.0))]
    Violations(Vec<Violation>),

    #[error("{0}")]
    Semantic(String),
}

fn join(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A configuration that was found, validated and deserialized.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub validated: ValidatedConfig,
    pub server: ServerConfig,
}

impl LoadedConfig {
    pub fn path(&self) -> &Path {
        &self.validated.path
    }
}

/// Search `candidates`, then validate and deserialize the first hit.
pub async fn load_config<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedConfig, ConfigError> {
    let path = config_search(candidates).await.ok_or(ConfigError::NotFound)?;
    load_config_file(&path).await
}

/// Validate and deserialize a known configuration file.
pub async fn load_config_file(path: &Path) -> Result<LoadedConfig, ConfigError> {
    let validated = validate(path).await?;
    let server: ServerConfig =
        serde_json::from_value(validated.document.clone()).map_err(ConfigError::Parse)?;

    if server.discovery_mode().is_none() {
        return Err(ConfigError::Semantic(
            "either `standalone` or `app_directory` must be set".to_string(),
        ));
    }
    if let Some(standalone) = &server.standalone {
        validate_web_path(&standalone.web_path)
            .map_err(|e| ConfigError::Semantic(format!("standalone.web_path: {}", e)))?;
    }
    if server.standalone.is_some() && server.app_directory.is_some() {
        tracing::warn!("Both `standalone` and `app_directory` are set; running standalone");
    }

    Ok(LoadedConfig { validated, server })
}
