//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use appmux::config::ServerConfig;
use appmux::plugin::builtin::register_builtins;
use appmux::plugin::{MountContext, PluginError, PluginInstance, StaticPluginLoader};
use axum::routing::get;
use axum::Router;

/// Records shutdown actions as they start and finish.
pub type EventLog = Arc<Mutex<Vec<String>>>;

/// Config scanning `apps` on an ephemeral localhost port.
pub fn config(apps: &Path) -> ServerConfig {
    let mut config = ServerConfig::with_app_directory(0, apps);
    config.bind_address = IpAddr::V4(Ipv4Addr::LOCALHOST);
    config
}

/// `<root>/<name>/plugin.toml` naming `entry`.
pub fn plugin_app(root: &Path, name: &str, entry: &str) -> PathBuf {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("plugin.toml"), format!("entry = \"{entry}\"\n")).unwrap();
    dir
}

/// `<root>/<name>/` holding the given files.
pub fn static_app(root: &Path, name: &str, files: &[(&str, &str)]) -> PathBuf {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    for (file, contents) in files {
        std::fs::write(dir.join(file), contents).unwrap();
    }
    dir
}

fn hello_router(web_path: &str) -> Router {
    let greeting = format!("hello from {web_path}");
    Router::new().route(
        "/",
        get(move || {
            let greeting = greeting.clone();
            async move { greeting }
        }),
    )
}

/// Loader with the built-ins plus `hello`, `broken` and `recorder`.
pub fn test_loader(log: &EventLog) -> StaticPluginLoader {
    let mut loader = StaticPluginLoader::new();
    register_builtins(&mut loader);

    loader.register("hello", |ctx: MountContext| async move {
        Ok(PluginInstance::new(hello_router(&ctx.web_path)))
    });
    loader.register("broken", |_ctx: MountContext| async {
        Err(PluginError::Init("refusing to start".into()))
    });

    let log = log.clone();
    loader.register("recorder", move |ctx: MountContext| {
        let log = log.clone();
        async move {
            let web_path = ctx.web_path.clone();
            Ok(PluginInstance::new(hello_router(&ctx.web_path)).with_shutdown(move || async move {
                log.lock().unwrap().push(format!("start {web_path}"));
                tokio::time::sleep(Duration::from_millis(20)).await;
                log.lock().unwrap().push(format!("end {web_path}"));
            }))
        }
    });

    loader
}

/// Client that reports redirects instead of following them.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .no_proxy()
        .build()
        .unwrap()
}

/// GET `url`, returning status and body.
pub async fn get_text(client: &reqwest::Client, url: &str) -> (u16, String) {
    let response = client.get(url).send().await.expect("host unreachable");
    let status = response.status().as_u16();
    (status, response.text().await.unwrap())
}

/// Serve `router` on an ephemeral localhost port until the runtime ends.
pub async fn start_backend(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}
