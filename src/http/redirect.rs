//! HTTP → HTTPS redirection.
//!
//! # Design Decisions
//! - Each listener tags its requests with a [`ListenerScheme`]; a request
//!   without the tag is treated as insecure
//! - Insecure requests get `302 Found` to the same host and path on the
//!   HTTPS port; secure requests pass through untouched

use axum::extract::{Request, State};
use axum::http::uri::Authority;
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// Which listener accepted the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerScheme {
    Http,
    Https,
}

/// Middleware: redirect insecure requests to `https_port`.
pub async fn redirect_to_https(State(https_port): State<u16>, request: Request, next: Next) -> Response {
    let scheme = request
        .extensions()
        .get::<ListenerScheme>()
        .copied()
        .unwrap_or(ListenerScheme::Http);
    if scheme == ListenerScheme::Https {
        return next.run(request).await;
    }

    let Some(location) = https_location(&request, https_port) else {
        return (StatusCode::BAD_REQUEST, "Missing or invalid Host header").into_response();
    };
    tracing::debug!(location = ?location, "Redirecting to HTTPS");
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

fn https_location(request: &Request, https_port: u16) -> Option<HeaderValue> {
    let authority = match request.headers().get(header::HOST) {
        Some(host) => host.to_str().ok()?.parse::<Authority>().ok()?,
        None => request.uri().authority()?.clone(),
    };
    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    // `Authority::host` keeps IPv6 brackets.
    let location = format!("https://{}:{}{}", authority.host(), https_port, path_and_query);
    HeaderValue::from_str(&location).ok()
}
