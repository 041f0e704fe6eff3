//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! ServerConfig (bind_address, port, ssl)
//!     → tls.rs (PEM key/cert checked and loaded, before any bind)
//!     → listener.rs (bind HTTP, then HTTPS)
//!     → Hand off to the HTTP layer (axum::serve / axum-server)
//! ```
//!
//! # Design Decisions
//! - Bind and TLS failures are fatal and carry the offending address or file
//! - TLS is optional and terminated by axum-server with rustls

pub mod listener;
pub mod tls;
