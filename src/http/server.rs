//! HTTP application assembly.
//!
//! # Responsibilities
//! - Compose every mount into one axum Router
//! - Wire up middleware (tracing, request ID, scheme tag, upgrades, redirect)
//!
//! # Design Decisions
//! - Non-root mounts are nested as services; the root mount is the fallback,
//!   so every more specific prefix wins over it
//! - The composed mounts sit behind a router that only has a fallback, which
//!   lets the middleware see the request before any prefix is stripped
//! - One app per listener, differing only in the scheme tag

use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::{Extension, Router};
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::http::redirect::{redirect_to_https, ListenerScheme};
use crate::http::websocket::dispatch_upgrade;
use crate::registry::Registry;
use crate::routing::UpgradeRouter;

/// Every mount's router under its web path.
pub fn compose_mounts(registry: &Registry) -> Router {
    registry.iter().fold(Router::new(), |router, mount| {
        if mount.web_path() == "/" {
            router.fallback_service(mount.router().clone())
        } else {
            router.nest_service(mount.web_path(), mount.router().clone())
        }
    })
}

/// The complete app served by one listener.
pub fn build_app(registry: Arc<Registry>, config: &ServerConfig, scheme: ListenerScheme) -> Router {
    let mut app = Router::new().fallback_service(compose_mounts(&registry));

    if let Some(https_port) = config.redirect_port() {
        app = app.layer(from_fn_with_state(https_port, redirect_to_https));
    }
    if config.web_sockets {
        app = app.layer(from_fn_with_state(UpgradeRouter::new(registry), dispatch_upgrade));
    }

    app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(Extension(scheme)),
    )
}
