//! WebSocket upgrade dispatch.
//!
//! # Responsibilities
//! - Detect WebSocket upgrade requests
//! - Pick the owning mount by longest prefix
//! - Complete the handshake and hand the socket to the mount's handler
//!
//! # Data Flow
//! ```text
//! Upgrade request (/app/socket?x=1)
//!     → UpgradeRouter::resolve → mount /app, path /socket
//!     → handshake (101 Switching Protocols)
//!     → handler(socket, request with uri /socket?x=1)
//! ```
//!
//! # Design Decisions
//! - Runs ahead of the nested mounts, so it sees the unstripped path
//! - Unmatched upgrades, and mounts without a handler, fall through to
//!   ordinary request handling

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::{FromRequestParts, Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::plugin::UpgradeRequest;
use crate::routing::{rewrite_uri, UpgradeRouter};

/// True for `Upgrade: websocket` with a `Connection` header listing `upgrade`.
pub fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    let upgrade = headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("websocket"));
    let connection = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"));
    upgrade && connection
}

/// Middleware: route WebSocket upgrades to plugin upgrade handlers.
pub async fn dispatch_upgrade(State(router): State<UpgradeRouter>, request: Request, next: Next) -> Response {
    if !is_websocket_upgrade(request.headers()) {
        return next.run(request).await;
    }

    let path = request.uri().path().to_string();
    let Some(route) = router.resolve(&path) else {
        tracing::debug!(path = %path, "No mount for upgrade request");
        return next.run(request).await;
    };
    let Some(handler) = route.mount.upgrade_handler().cloned() else {
        tracing::debug!(path = %path, web_path = %route.mount.web_path(), "Mount has no upgrade handler");
        return next.run(request).await;
    };

    let uri = match rewrite_uri(request.uri(), &route.path) {
        Ok(uri) => uri,
        Err(error) => {
            tracing::warn!(path = %path, error = %error, "Cannot rewrite upgrade path");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let (mut parts, _body) = request.into_parts();
    let upgrade = match <WebSocketUpgrade as FromRequestParts<()>>::from_request_parts(&mut parts, &()).await {
        Ok(upgrade) => upgrade,
        Err(rejection) => return rejection.into_response(),
    };

    let mut forwarded = axum::http::Request::new(());
    *forwarded.method_mut() = parts.method;
    *forwarded.uri_mut() = uri;
    *forwarded.version_mut() = parts.version;
    *forwarded.headers_mut() = parts.headers;

    tracing::debug!(
        web_path = %route.mount.web_path(),
        path = %route.path,
        "Dispatching upgrade"
    );
    upgrade.on_upgrade(move |socket| handler(socket, forwarded))
}

/// Hand an already upgraded connection to a mount of a nested host.
///
/// The outer host has completed the handshake, so a path no nested mount
/// accepts can only be answered by closing the socket.
pub async fn forward_nested_upgrade(router: UpgradeRouter, socket: WebSocket, mut request: UpgradeRequest) {
    let path = request.uri().path().to_string();
    let target = router.resolve(&path).and_then(|route| {
        let handler = route.mount.upgrade_handler().cloned()?;
        Some((handler, route.path))
    });
    let Some((handler, inner_path)) = target else {
        tracing::debug!(path = %path, "No nested mount accepts this upgrade");
        return;
    };

    match rewrite_uri(request.uri(), &inner_path) {
        Ok(uri) => *request.uri_mut() = uri,
        Err(error) => {
            tracing::warn!(path = %path, error = %error, "Cannot rewrite upgrade path");
            return;
        }
    }
    handler(socket, request).await;
}
