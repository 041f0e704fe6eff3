//! appmux
//!
//! Hosts independently developed web applications behind one HTTP(S)
//! listener.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────┐
//!                     │                      APPMUX                      │
//!                     │                                                  │
//!   conf.json ────────┼─▶ config ──▶ registry::discovery ──▶ Registry    │
//!   (search paths,    │   (schema)    (plugin.toml | static)   (frozen)   │
//!    $schema)         │                                          │        │
//!                     │                                          ▼        │
//!   Client ───────────┼─▶ net ──▶ http (trace, request id, upgrade,       │
//!   (HTTP / HTTPS)    │          redirect) ──▶ nested mount routers      │
//!                     │                                                  │
//!   SIGINT/SIGTERM ───┼─▶ lifecycle ──▶ plugin shutdown actions, in order│
//!                     └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{ArgAction, CommandFactory, Parser};

use appmux::config::{default_search_paths, load_config};
use appmux::lifecycle::{termination_requested, AppServer};
use appmux::observability::logging;
use appmux::plugin::builtin::register_builtins;
use appmux::plugin::StaticPluginLoader;

/// Exit status after printing usage.
const HELP_EXIT_CODE: u8 = 255;

#[derive(Parser, Debug)]
#[command(name = "appmux", version, about, disable_help_flag = true)]
struct Cli {
    /// Configuration file to use instead of the search path
    #[arg(short = 'f', long = "config", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print usage
    #[arg(short = 'h', long = "help", action = ArgAction::SetTrue)]
    help: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if cli.help {
        eprintln!("{}", Cli::command().render_help());
        return ExitCode::from(HELP_EXIT_CODE);
    }

    logging::init();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "appmux starting");

    let candidates = match cli.config {
        Some(path) => vec![path],
        None => default_search_paths(),
    };

    let loaded = match load_config(&candidates).await {
        Ok(loaded) => loaded,
        Err(error) => {
            tracing::error!(error = %error, "Cannot load configuration");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        path = %loaded.path().display(),
        schema = %loaded.validated.schema,
        port = loaded.server.port,
        "Configuration loaded"
    );

    let mut loader = StaticPluginLoader::new();
    register_builtins(&mut loader);

    let server = AppServer::new(loaded.server, Arc::new(loader));
    match server.run(termination_requested()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(error = %error, "Fatal");
            ExitCode::FAILURE
        }
    }
}
