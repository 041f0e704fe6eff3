//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! candidate paths (CLI flag or ${VAR} templates)
//!     → search.rs (first readable file, canonicalized)
//!     → validation.rs ($schema resolution, fetch, JSON-schema check)
//!     → loader.rs (typed ServerConfig + semantic checks)
//!     → ServerConfig (immutable for the rest of the process)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - Validation separates structural (JSON schema) from semantic checks
//! - Every failure collapses into a single "invalid configuration" outcome

pub mod loader;
pub mod schema;
pub mod search;
pub mod validation;

pub use loader::{load_config, load_config_file, ConfigError, LoadedConfig};
pub use schema::{AppMountSpec, DiscoveryMode, ServerConfig, SslConfig, UserFolders};
pub use search::{config_search, default_search_paths, EnvTemplate};
pub use validation::{SchemaRef, ValidatedConfig, Violation};
