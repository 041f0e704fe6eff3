//! Remote `$schema` references, served by a local backend.

use appmux::config::{load_config_file, ConfigError, SchemaRef};
use axum::routing::get;
use axum::Router;

mod common;

use common::start_backend;

const SCHEMA: &str = include_str!("../schema/server-config.schema.json");

async fn schema_backend() -> String {
    let router = Router::new().route("/schema.json", get(|| async { SCHEMA }));
    format!("http://{}", start_backend(router).await)
}

fn write_config(dir: &std::path::Path, schema_url: &str, body: &str) -> std::path::PathBuf {
    let path = dir.join("conf.json");
    std::fs::write(&path, format!(r#"{{ "$schema": "{schema_url}", {body} }}"#)).unwrap();
    path
}

#[tokio::test]
async fn test_remote_schema_is_fetched() {
    let base = schema_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let url = format!("{base}/schema.json");
    let path = write_config(dir.path(), &url, r#""port": 8080, "app_directory": "apps""#);

    let loaded = load_config_file(&path).await.unwrap();
    assert!(matches!(&loaded.validated.schema, SchemaRef::Remote(remote) if remote.as_str() == url));
    assert_eq!(loaded.server.port, 8080);
}

#[tokio::test]
async fn test_remote_schema_violations_are_reported() {
    let base = schema_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        &format!("{base}/schema.json"),
        r#""port": "eighty", "app_directory": "apps""#,
    );

    match load_config_file(&path).await {
        Err(ConfigError::Violations(violations)) => {
            assert!(violations.iter().any(|v| v.path == "config.port"));
        }
        other => panic!("expected violations, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_remote_schema_is_fatal() {
    let base = schema_backend().await;
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        &format!("{base}/missing.json"),
        r#""port": 8080, "app_directory": "apps""#,
    );

    assert!(matches!(load_config_file(&path).await, Err(ConfigError::SchemaFetch(_))));
}
