//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events with structured fields (web_path, address, error)
//!     → request spans from tower-http's TraceLayer, tagged with x-request-id
//!
//! Consumers:
//!     → logging.rs (fmt layer on stdout, filtered by RUST_LOG)
//! ```

pub mod logging;
