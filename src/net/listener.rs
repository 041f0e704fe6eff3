//! TCP listener binding.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Report the bound address (port 0 resolves to an ephemeral port)
//! - Turn bind failures into the fatal `ListenerBind` error

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::error::ServerError;

/// Bind `addr` and log the resulting local address.
pub async fn bind(addr: SocketAddr) -> Result<TcpListener, ServerError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::ListenerBind { addr, source })?;

    let local_addr = listener
        .local_addr()
        .map_err(|source| ServerError::ListenerBind { addr, source })?;

    tracing::info!(address = %local_addr, "Listener bound");
    Ok(listener)
}
