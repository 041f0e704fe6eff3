//! HTTP composition subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection (per listener)
//!     → server.rs (TraceLayer, request ID, scheme tag)
//!     → websocket.rs (upgrade? longest-prefix mount with a handler)
//!     → redirect.rs (insecure? 302 to the HTTPS port)
//!     → nested mount routers (plugin routers, static_files.rs)
//! ```

pub mod redirect;
pub mod server;
pub mod static_files;
pub mod websocket;

pub use redirect::ListenerScheme;
pub use server::{build_app, compose_mounts};
