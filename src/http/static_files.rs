//! Static folder mounts.
//!
//! # Responsibilities
//! - Serve a folder with `ServeDir`
//! - Optionally render an HTML index for folders without `index.html`
//! - Keep redirect targets inside the mount
//!
//! # Design Decisions
//! - The listing is a `ServeDir` fallback: it only runs when no file matched
//! - Dotfiles are hidden from listings; `..` segments are refused
//! - `ServeDir` builds its trailing-slash redirect from the path it sees,
//!   which is already stripped of the mount prefix; the prefix is put back
//!   on the way out

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, StatusCode, Uri};
use axum::middleware::{from_fn_with_state, Next};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tower_http::services::ServeDir;

#[derive(Debug)]
struct Listing {
    root: PathBuf,
    web_path: String,
}

/// Router serving `root`, to be mounted at `web_path`.
pub fn static_router(web_path: &str, root: &Path, listing: bool) -> Router {
    let serve_dir = ServeDir::new(root);
    let router = if listing {
        let state = Arc::new(Listing {
            root: root.to_path_buf(),
            web_path: web_path.to_string(),
        });
        Router::new().fallback_service(serve_dir.fallback(get(list_directory).with_state(state)))
    } else {
        Router::new().fallback_service(serve_dir)
    };

    if web_path == "/" {
        router
    } else {
        router.layer(from_fn_with_state(web_path.to_string(), restore_prefix))
    }
}

async fn restore_prefix(State(web_path): State<String>, request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    if !response.status().is_redirection() {
        return response;
    }

    let prefixed = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .filter(|location| location.starts_with('/'))
        .and_then(|location| HeaderValue::from_str(&format!("{web_path}{location}")).ok());
    if let Some(location) = prefixed {
        response.headers_mut().insert(header::LOCATION, location);
    }
    response
}

async fn list_directory(State(listing): State<Arc<Listing>>, uri: Uri) -> Response {
    let mut dir = listing.root.clone();
    for segment in uri.path().split('/').filter(|s| !s.is_empty()) {
        let Ok(segment) = urlencoding::decode(segment) else {
            return StatusCode::BAD_REQUEST.into_response();
        };
        if segment == ".." || segment.contains(['/', '\\']) {
            return StatusCode::NOT_FOUND.into_response();
        }
        dir.push(segment.as_ref());
    }

    let mut entries = match tokio::fs::read_dir(&dir).await {
        Ok(entries) => entries,
        Err(_) => return StatusCode::NOT_FOUND.into_response(),
    };
    let mut names = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if name.starts_with('.') {
            continue;
        }
        let is_dir = tokio::fs::metadata(entry.path()).await.is_ok_and(|m| m.is_dir());
        names.push((name, is_dir));
    }
    names.sort();

    let shown = if listing.web_path == "/" {
        uri.path().to_string()
    } else {
        format!("{}{}", listing.web_path, uri.path())
    };
    Html(render_listing(&shown, uri.path() != "/", &names)).into_response()
}

fn render_listing(title: &str, has_parent: bool, names: &[(String, bool)]) -> String {
    let title = escape_html(title);
    let mut html = format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Index of {title}</title></head>\n\
         <body>\n<h1>Index of {title}</h1>\n<ul>\n"
    );
    if has_parent {
        html.push_str("<li><a href=\"../\">../</a></li>\n");
    }
    for (name, is_dir) in names {
        let slash = if *is_dir { "/" } else { "" };
        html.push_str(&format!(
            "<li><a href=\"{}{slash}\">{}{slash}</a></li>\n",
            urlencoding::encode(name),
            escape_html(name)
        ));
    }
    html.push_str("</ul>\n</body>\n</html>\n");
    html
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
