//! Upgrade routing subsystem.
//!
//! # Data Flow
//! ```text
//! Upgrade request (path)
//!     → router.rs (scan mounts, keep the longest matching prefix)
//!     → matcher.rs (segment-aware prefix test, prefix stripping)
//!     → Return: (mount, rewritten path) or no match
//!
//! Route compilation (at startup):
//!     frozen Registry
//!     → one PathPrefixMatcher per mount, in registration order
//! ```
//!
//! # Design Decisions
//! - Only upgrade traffic is routed here; plain requests go through the
//!   axum router that nests each mount
//! - Deterministic: same input always matches same mount

pub mod matcher;
pub mod router;

pub use matcher::PathPrefixMatcher;
pub use router::{rewrite_uri, UpgradeRoute, UpgradeRouter};
