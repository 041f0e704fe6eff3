//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Booting → Discovering (registry built and frozen)
//!             → Serving (TLS loaded, listeners bound, apps installed)
//!
//! Shutdown (shutdown.rs):
//!     termination → ShuttingDown (stop accepting, run plugin shutdown
//!     actions in order, drain listeners) → Terminated
//!
//! Signals (signals.rs):
//!     SIGINT / SIGTERM / Ctrl-Break → one termination future
//! ```
//!
//! # Design Decisions
//! - Ordered startup: discovery first, then TLS, then listeners
//! - Ordered shutdown: stop accept, plugin actions, drain
//! - Drain has a deadline: open connections are dropped after it

pub mod shutdown;
pub mod signals;
pub mod startup;
pub mod state;

pub use shutdown::{Shutdown, ShutdownActions};
pub use signals::termination_requested;
pub use startup::{AppServer, RunningServer};
pub use state::LifecycleState;
