//! Plugins compiled into the host binary.

use axum::extract::ws::{Message, WebSocket};
use axum::routing::get;
use axum::Router;

use crate::plugin::{MountContext, PluginError, PluginInstance, StaticPluginLoader, UpgradeRequest};

/// Entry name of the echo plugin.
pub const ECHO_ENTRY: &str = "builtin:echo";

/// Register every built-in plugin.
pub fn register_builtins(loader: &mut StaticPluginLoader) {
    loader.register(ECHO_ENTRY, echo);
}

/// Greets plain requests and echoes WebSocket frames.
async fn echo(ctx: MountContext) -> Result<PluginInstance, PluginError> {
    let greeting = format!("appmux echo at {}\n", ctx.web_path);
    let router = Router::new().route(
        "/",
        get(move || {
            let greeting = greeting.clone();
            async move { greeting }
        }),
    );

    let web_path = ctx.web_path;
    Ok(PluginInstance::new(router)
        .with_upgrade_handler(echo_socket)
        .with_shutdown(move || async move {
            tracing::info!(web_path = %web_path, "Echo plugin stopped");
        }))
}

async fn echo_socket(mut socket: WebSocket, request: UpgradeRequest) {
    let hello = format!("connected {}", request.uri().path());
    if socket.send(Message::Text(hello.into())).await.is_err() {
        return;
    }

    while let Some(Ok(message)) = socket.recv().await {
        match message {
            Message::Text(_) | Message::Binary(_) => {
                if socket.send(message).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }
}
