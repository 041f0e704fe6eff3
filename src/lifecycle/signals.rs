//! OS signal handling.
//!
//! # Responsibilities
//! - Collapse SIGINT, SIGTERM and Ctrl-Break into one termination future
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - A handler that cannot be installed is logged and never fires; the
//!   remaining signals still work

use std::future::pending;

/// Resolves once the process is asked to terminate.
pub async fn termination_requested() {
    let interrupt = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %error, "Cannot listen for Ctrl+C");
            pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(error) => {
                tracing::error!(error = %error, "Cannot listen for SIGTERM");
                pending::<()>().await;
            }
        }
    };

    #[cfg(windows)]
    let terminate = async {
        match tokio::signal::windows::ctrl_break() {
            Ok(mut ctrl_break) => {
                ctrl_break.recv().await;
            }
            Err(error) => {
                tracing::error!(error = %error, "Cannot listen for Ctrl+Break");
                pending::<()>().await;
            }
        }
    };

    #[cfg(not(any(unix, windows)))]
    let terminate = pending::<()>();

    tokio::select! {
        _ = interrupt => tracing::info!("Received interrupt signal"),
        _ = terminate => tracing::info!("Received terminate signal"),
    }
}
