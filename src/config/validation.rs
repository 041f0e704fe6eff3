//! Configuration validation against a JSON schema.
//!
//! # Responsibilities
//! - Resolve the document's `$schema` reference (path or URL)
//! - Fetch the schema (local read for `file:` references, HTTP otherwise)
//! - Fall back to the schema compiled into the binary when none is declared
//! - Validate the document and report every violation
//!
//! # Design Decisions
//! - Fail closed: any read, parse, fetch or schema violation rejects the
//!   whole document; no partially-populated config is ever returned
//! - Returns all validation errors, not just the first
//! - Violation paths are dotted and rooted at `config`

use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::Value;
use url::Url;

use crate::config::loader::ConfigError;

/// Schema used when the document does not declare `$schema`.
pub const BUILTIN_SCHEMA: &str = include_str!("../../schema/server-config.schema.json");

/// Label used for the document root in violation paths.
pub const ROOT_LABEL: &str = "config";

/// Where a schema lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaRef {
    Builtin,
    File(PathBuf),
    Remote(Url),
}

impl fmt::Display for SchemaRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaRef::Builtin => f.write_str("builtin"),
            SchemaRef::File(path) => write!(f, "{}", path.display()),
            SchemaRef::Remote(url) => write!(f, "{}", url),
        }
    }
}

/// A single schema violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Dotted path to the offending value, e.g. `config.ssl.port`.
    pub path: String,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.path, self.message)
    }
}

/// A parsed document that passed schema validation. Read-only from here on.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub path: PathBuf,
    pub schema: SchemaRef,
    pub document: Value,
}

/// Resolve a `$schema` declaration relative to the configuration file.
pub fn resolve_schema_ref(config_path: &Path, declared: Option<&str>) -> Result<SchemaRef, ConfigError> {
    let Some(declared) = declared else {
        return Ok(SchemaRef::Builtin);
    };

    match Url::parse(declared) {
        // Single-letter schemes are Windows drive letters, not URLs.
        Ok(url) if url.scheme().len() > 1 => {
            if url.scheme() == "file" {
                url.to_file_path()
                    .map(SchemaRef::File)
                    .map_err(|_| ConfigError::SchemaFetch(format!("{}: not a local path", declared)))
            } else {
                Ok(SchemaRef::Remote(url))
            }
        }
        _ => {
            let base = config_path.parent().unwrap_or_else(|| Path::new("."));
            Ok(SchemaRef::File(base.join(declared)))
        }
    }
}

/// Load and parse the schema document.
pub async fn fetch_schema(schema: &SchemaRef) -> Result<Value, ConfigError> {
    let text = match schema {
        SchemaRef::Builtin => BUILTIN_SCHEMA.to_string(),
        SchemaRef::File(path) => tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ConfigError::SchemaFetch(format!("{}: {}", path.display(), e)))?,
        SchemaRef::Remote(url) => {
            tracing::debug!(url = %url, "Fetching configuration schema");
            reqwest::get(url.clone())
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| ConfigError::SchemaFetch(format!("{}: {}", url, e)))?
                .text()
                .await
                .map_err(|e| ConfigError::SchemaFetch(format!("{}: {}", url, e)))?
        }
    };

    serde_json::from_str(&text).map_err(|e| ConfigError::SchemaParse(format!("{}: {}", schema, e)))
}

/// Validate `document` against `schema`, collecting every violation.
pub fn validate_document(document: &Value, schema: &Value) -> Result<(), ConfigError> {
    let validator =
        jsonschema::validator_for(schema).map_err(|e| ConfigError::SchemaCompile(e.to_string()))?;

    let violations: Vec<Violation> = validator
        .iter_errors(document)
        .map(|error| Violation {
            path: dotted_path(&error.instance_path.to_string()),
            message: error.to_string(),
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Violations(violations))
    }
}

/// Convert a JSON pointer (`/ssl/port`) into `config.ssl.port`.
fn dotted_path(pointer: &str) -> String {
    let mut path = String::from(ROOT_LABEL);
    for token in pointer.split('/').skip(1) {
        path.push('.');
        path.push_str(&token.replace("~1", "/").replace("~0", "~"));
    }
    path
}

/// Read, parse and schema-validate the configuration file at `config_path`.
pub async fn validate(config_path: &Path) -> Result<ValidatedConfig, ConfigError> {
    let text = tokio::fs::read_to_string(config_path)
        .await
        .map_err(|e| ConfigError::Read {
            path: config_path.to_path_buf(),
            source: e,
        })?;
    let document: Value = serde_json::from_str(&text).map_err(ConfigError::Parse)?;

    let declared = document.get("$schema").and_then(Value::as_str);
    let schema_ref = resolve_schema_ref(config_path, declared)?;
    let schema = fetch_schema(&schema_ref).await?;

    if let Err(e) = validate_document(&document, &schema) {
        if let ConfigError::Violations(violations) = &e {
            for violation in violations {
                tracing::error!(
                    path = %violation.path,
                    message = %violation.message,
                    "Configuration violation"
                );
            }
        }
        return Err(e);
    }

    tracing::debug!(schema = %schema_ref, "Configuration matches schema");
    Ok(ValidatedConfig {
        path: config_path.to_path_buf(),
        schema: schema_ref,
        document,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn schema() -> Value {
        json!({
            "type": "object",
            "required": ["port"],
            "properties": {
                "port": { "type": "integer", "minimum": 1, "maximum": 65535 },
                "ssl": {
                    "type": "object",
                    "properties": { "port": { "type": "integer" } }
                }
            }
        })
    }

    #[test]
    fn test_schema_fallback_when_absent() {
        let resolved = resolve_schema_ref(Path::new("/etc/appmux/conf.json"), None).unwrap();
        assert_eq!(resolved, SchemaRef::Builtin);
    }

    #[test]
    fn test_relative_schema_resolves_next_to_config() {
        let resolved =
            resolve_schema_ref(Path::new("/etc/appmux/conf.json"), Some("schema/conf.schema.json")).unwrap();
        assert_eq!(
            resolved,
            SchemaRef::File(PathBuf::from("/etc/appmux/schema/conf.schema.json"))
        );
    }

    #[test]
    fn test_url_schema_is_remote() {
        let resolved =
            resolve_schema_ref(Path::new("/etc/appmux/conf.json"), Some("https://example.com/s.json")).unwrap();
        assert!(matches!(resolved, SchemaRef::Remote(url) if url.host_str() == Some("example.com")));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_url_is_local() {
        let resolved =
            resolve_schema_ref(Path::new("/etc/appmux/conf.json"), Some("file:///opt/schema.json")).unwrap();
        assert_eq!(resolved, SchemaRef::File(PathBuf::from("/opt/schema.json")));
    }

    #[tokio::test]
    async fn test_builtin_schema_compiles() {
        let schema = fetch_schema(&SchemaRef::Builtin).await.unwrap();
        let doc = json!({ "port": 8080, "app_directory": "apps", "web_sockets": true });
        assert!(validate_document(&doc, &schema).is_ok());
    }

    #[test]
    fn test_dotted_path() {
        assert_eq!(dotted_path(""), "config");
        assert_eq!(dotted_path("/ssl/port"), "config.ssl.port");
        assert_eq!(dotted_path("/a~1b/c~0d"), "config.a/b.c~d");
    }

    #[test]
    fn test_validate_document_collects_all_violations() {
        let doc = json!({ "port": 0, "ssl": { "port": "443" } });
        match validate_document(&doc, &schema()) {
            Err(ConfigError::Violations(violations)) => {
                assert_eq!(violations.len(), 2);
                let paths: Vec<_> = violations.iter().map(|v| v.path.as_str()).collect();
                assert!(paths.contains(&"config.port"));
                assert!(paths.contains(&"config.ssl.port"));
            }
            other => panic!("expected violations, got {:?}", other),
        }
    }

    #[test]
    fn test_root_violation_uses_sentinel() {
        let doc = json!({});
        match validate_document(&doc, &schema()) {
            Err(ConfigError::Violations(violations)) => assert_eq!(violations[0].path, "config"),
            other => panic!("expected violations, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_validate_with_local_schema() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("schema.json"), schema().to_string()).unwrap();
        let config_path = dir.path().join("conf.json");
        std::fs::write(&config_path, r#"{ "$schema": "schema.json", "port": 8080 }"#).unwrap();

        let validated = validate(&config_path).await.unwrap();
        assert_eq!(validated.document["port"], 8080);
        assert_eq!(validated.schema, SchemaRef::File(dir.path().join("schema.json")));
    }

    #[tokio::test]
    async fn test_validate_fails_closed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("schema.json"), "{ not json").unwrap();
        let config_path = dir.path().join("conf.json");

        std::fs::write(&config_path, r#"{ "$schema": "schema.json", "port": 8080 }"#).unwrap();
        assert!(matches!(validate(&config_path).await, Err(ConfigError::SchemaParse(_))));

        std::fs::write(&config_path, r#"{ "$schema": "missing.json", "port": 8080 }"#).unwrap();
        assert!(matches!(validate(&config_path).await, Err(ConfigError::SchemaFetch(_))));

        std::fs::write(&config_path, "port = 8080").unwrap();
        assert!(matches!(validate(&config_path).await, Err(ConfigError::Parse(_))));
    }
}
