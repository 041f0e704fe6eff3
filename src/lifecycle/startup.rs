//! Startup orchestration.
//!
//! # Responsibilities
//! - Run discovery and freeze the registry
//! - Load TLS material, bind listeners and begin accepting traffic
//! - Tear everything down in order when asked to
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal and nothing keeps running
//! - TLS material is checked before the first bind, so a bad key never
//!   leaves a half-started host behind
//! - Listeners start last (traffic only when the registry is frozen)
//! - Plugin shutdown actions run after listeners stop accepting, and
//!   connections still open after the drain period are dropped

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum_server::tls_rustls::RustlsConfig;
use futures_util::future::join_all;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::http::websocket::forward_nested_upgrade;
use crate::http::{build_app, compose_mounts, ListenerScheme};
use crate::lifecycle::shutdown::{Shutdown, ShutdownActions};
use crate::lifecycle::state::{LifecycleState, StateTracker};
use crate::net::{listener, tls};
use crate::plugin::{PluginInstance, PluginLoader};
use crate::registry::{Discovery, Registry};
use crate::routing::UpgradeRouter;

/// How long listener tasks may take to finish after shutdown begins.
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

type ListenerTask = JoinHandle<std::io::Result<()>>;

/// A host that has been configured but not started.
pub struct AppServer {
    config: ServerConfig,
    loader: Arc<dyn PluginLoader>,
    state: StateTracker,
}

impl AppServer {
    pub fn new(config: ServerConfig, loader: Arc<dyn PluginLoader>) -> Self {
        Self {
            config,
            loader,
            state: StateTracker::new(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state.current()
    }

    /// Start, wait for `termination`, then shut down.
    pub async fn run<F>(self, termination: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        let running = self.start().await?;
        termination.await;
        running.shutdown().await
    }

    /// Discover applications and bind every listener.
    pub async fn start(self) -> Result<RunningServer, ServerError> {
        let AppServer {
            mut config,
            loader,
            state,
        } = self;
        state.advance(LifecycleState::Discovering);

        let (registry, actions) = Discovery::new(&config, loader).discover().await?;
        let registry = Arc::new(registry);

        let tls_config = match &config.ssl {
            Some(ssl) => Some((ssl.port, tls::load_tls_config(&ssl.cert_file, &ssl.key_file).await?)),
            None => None,
        };

        let http_listener = listener::bind(SocketAddr::new(config.bind_address, config.port)).await?;
        let http_addr = http_listener.local_addr()?;
        let https_listener = match tls_config {
            Some((port, rustls)) => {
                let listener = listener::bind(SocketAddr::new(config.bind_address, port)).await?;
                let addr = listener.local_addr()?;
                Some((listener, addr, rustls))
            }
            None => None,
        };

        // Redirects must name the port actually bound, which differs from
        // the configured one when that is 0.
        if let (Some(ssl), Some((_, addr, _))) = (config.ssl.as_mut(), &https_listener) {
            ssl.port = addr.port();
        }

        let shutdown = Shutdown::new();
        let mut tasks = vec![serve_http(
            http_listener,
            build_app(registry.clone(), &config, ListenerScheme::Http),
            &shutdown,
        )];

        let https_addr = match https_listener {
            Some((listener, addr, rustls)) => {
                let app = build_app(registry.clone(), &config, ListenerScheme::Https);
                tasks.push(serve_https(listener, rustls, app, &shutdown)?);
                Some(addr)
            }
            None => None,
        };

        state.advance(LifecycleState::Serving);
        tracing::info!(
            http = %http_addr,
            https = ?https_addr,
            mounts = ?registry.web_paths(),
            web_sockets = config.web_sockets,
            redirect = config.redirect_port().is_some(),
            "Serving"
        );

        Ok(RunningServer {
            state,
            registry,
            actions,
            shutdown,
            tasks,
            http_addr,
            https_addr,
            shutdown_timeout: config.shutdown_timeout(),
        })
    }

    /// Discover applications without binding any listener and package the
    /// result as a plugin, so this host can be mounted inside another one.
    ///
    /// Ordinary requests go to the nested mounts. When `web_sockets` is set,
    /// upgrades are forwarded by longest prefix among the nested mounts. The
    /// shutdown action runs the nested shutdown actions in order.
    pub async fn into_plugin_instance(self) -> Result<PluginInstance, ServerError> {
        let AppServer { config, loader, .. } = self;

        let (registry, actions) = Discovery::new(&config, loader).discover().await?;
        let registry = Arc::new(registry);
        tracing::info!(mounts = ?registry.web_paths(), "Prepared nested host");

        let mut instance = PluginInstance::new(compose_mounts(&registry));
        if config.web_sockets {
            let router = UpgradeRouter::new(registry);
            instance = instance.with_upgrade_handler(move |socket, request| {
                forward_nested_upgrade(router.clone(), socket, request)
            });
        }

        let timeout = config.shutdown_timeout();
        Ok(instance.with_shutdown(move || actions.run_all(timeout)))
    }
}

fn serve_http(listener: TcpListener, app: axum::Router, shutdown: &Shutdown) -> ListenerTask {
    let mut stop = shutdown.subscribe();
    tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
            })
            .await;
        tracing::info!("HTTP listener stopped");
        result
    })
}

fn serve_https(
    listener: TcpListener,
    rustls: RustlsConfig,
    app: axum::Router,
    shutdown: &Shutdown,
) -> Result<ListenerTask, ServerError> {
    let listener = listener.into_std()?;

    let handle = axum_server::Handle::new();
    let mut stop = shutdown.subscribe();
    let bridge = handle.clone();
    tokio::spawn(async move {
        let _ = stop.recv().await;
        bridge.graceful_shutdown(Some(DRAIN_TIMEOUT));
    });

    let server = axum_server::from_tcp_rustls(listener, rustls).handle(handle);
    let task = tokio::spawn(async move {
        let result = server.serve(app.into_make_service()).await;
        tracing::info!("HTTPS listener stopped");
        result
    });
    Ok(task)
}

/// A host that is accepting traffic.
pub struct RunningServer {
    state: StateTracker,
    registry: Arc<Registry>,
    actions: ShutdownActions,
    shutdown: Shutdown,
    tasks: Vec<ListenerTask>,
    http_addr: SocketAddr,
    https_addr: Option<SocketAddr>,
    shutdown_timeout: Option<Duration>,
}

impl RunningServer {
    pub fn http_addr(&self) -> SocketAddr {
        self.http_addr
    }

    pub fn https_addr(&self) -> Option<SocketAddr> {
        self.https_addr
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn state(&self) -> LifecycleState {
        self.state.current()
    }

    /// Stop accepting, run plugin shutdown actions in order, drain listeners.
    pub async fn shutdown(self) -> Result<(), ServerError> {
        let RunningServer {
            state,
            actions,
            shutdown,
            tasks,
            shutdown_timeout,
            ..
        } = self;

        state.advance(LifecycleState::ShuttingDown);
        tracing::info!(actions = actions.len(), "Shutting down");
        shutdown.trigger();

        actions.run_all(shutdown_timeout).await;

        let aborts: Vec<_> = tasks.iter().map(JoinHandle::abort_handle).collect();
        let mut result = Ok(());
        match tokio::time::timeout(DRAIN_TIMEOUT, join_all(tasks)).await {
            Ok(finished) => {
                for outcome in finished {
                    match outcome {
                        Ok(Ok(())) => {}
                        Ok(Err(error)) => {
                            tracing::error!(error = %error, "Listener failed");
                            result = Err(ServerError::Serve(error));
                        }
                        Err(error) => tracing::warn!(error = %error, "Listener task did not finish cleanly"),
                    }
                }
            }
            Err(_) => {
                tracing::warn!(timeout = ?DRAIN_TIMEOUT, "Connections still open; closing them");
                for abort in aborts {
                    abort.abort();
                }
            }
        }

        state.advance(LifecycleState::Terminated);
        tracing::info!("Shutdown complete");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::StaticPluginLoader;
    use axum::Router;
    use std::fs;
    use std::net::{IpAddr, Ipv4Addr};

    fn loader() -> Arc<dyn PluginLoader> {
        let mut loader = StaticPluginLoader::new();
        loader.register("hello", |_ctx| async { Ok(PluginInstance::new(Router::new())) });
        Arc::new(loader)
    }

    fn config(apps: &std::path::Path) -> ServerConfig {
        let mut config = ServerConfig::with_app_directory(0, apps);
        config.bind_address = IpAddr::V4(Ipv4Addr::LOCALHOST);
        config
    }

    #[tokio::test]
    async fn test_start_and_shutdown_walk_every_state() {
        let apps = tempfile::tempdir().unwrap();
        fs::create_dir(apps.path().join("hello")).unwrap();
        fs::write(apps.path().join("hello/plugin.toml"), "entry = \"hello\"").unwrap();

        let server = AppServer::new(config(apps.path()), loader());
        assert_eq!(server.state(), LifecycleState::Booting);

        let running = server.start().await.unwrap();
        assert_eq!(running.state(), LifecycleState::Serving);
        assert_ne!(running.http_addr().port(), 0);
        assert!(running.https_addr().is_none());
        assert_eq!(running.registry().web_paths(), vec!["/hello"]);

        running.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_nested_host_plugin_contract() {
        let apps = tempfile::tempdir().unwrap();
        fs::create_dir(apps.path().join("hello")).unwrap();
        fs::write(apps.path().join("hello/plugin.toml"), "entry = \"hello\"").unwrap();

        let instance = AppServer::new(config(apps.path()), loader())
            .into_plugin_instance()
            .await
            .unwrap();
        assert!(instance.has_shutdown());
        assert!(!instance.has_upgrade_handler());

        let mut with_sockets = config(apps.path());
        with_sockets.web_sockets = true;
        let instance = AppServer::new(with_sockets, loader())
            .into_plugin_instance()
            .await
            .unwrap();
        assert!(instance.has_upgrade_handler());

        let empty = tempfile::tempdir().unwrap();
        let result = AppServer::new(config(empty.path()), loader()).into_plugin_instance().await;
        assert!(matches!(result, Err(ServerError::NoApplicationsMounted)));
    }

    #[tokio::test]
    async fn test_empty_registry_binds_nothing() {
        let apps = tempfile::tempdir().unwrap();
        let server = AppServer::new(config(apps.path()), loader());
        assert!(matches!(server.start().await, Err(ServerError::NoApplicationsMounted)));
    }
}
