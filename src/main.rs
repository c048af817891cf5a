//! Nixaweb page server.
//!
//! Serves pages from a template directory inside a shared layout and
//! hardens every HTML response before it leaves the process.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌────────────────────────────────────────────────────┐
//!                        │                     NIXAWEB                        │
//!                        │                                                    │
//!   Client Request       │  ┌──────────┐   ┌──────────┐   ┌──────────────┐    │
//!   ─────────────────────┼─▶│ security │──▶│   http   │──▶│   routing    │    │
//!                        │  │  layers  │   │  server  │   │ (negotiate)  │    │
//!                        │  └──────────┘   └──────────┘   └──────┬───────┘    │
//!                        │                                       │            │
//!                        │                                       ▼            │
//!                        │                               ┌──────────────┐     │
//!                        │                               │    render    │     │
//!                        │                               │   (layout)   │     │
//!                        │                               └──────┬───────┘     │
//!                        │                                       │            │
//!   Client Response      │  ┌──────────┐                 ┌──────▼───────┐     │
//!   ◀────────────────────┼──│ compress │◀────────────────│  hardening   │     │
//!                        │  └──────────┘                 │ obfuscate +  │     │
//!                        │                               │   minify     │     │
//!                        │                               └──────────────┘     │
//!                        │                                                    │
//!                        │   config · observability · lifecycle              │
//!                        └────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use nixaweb::config::ObservabilityConfig;
use nixaweb::lifecycle;
use nixaweb::observability::init_logging;

const DEFAULT_CONFIG_PATH: &str = "nixaweb.toml";

#[derive(Parser)]
#[command(name = "nixaweb", version, about = "Nixaweb page server")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let explicit = args.config.is_some();
    let path = args.config.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let config = match lifecycle::load_configuration(&path, explicit) {
        Ok(config) => config,
        Err(e) => {
            let _ = init_logging(&ObservabilityConfig::default());
            tracing::error!(path = %path.display(), error = %e, "Server start error");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(&config.observability) {
        eprintln!("failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    std::panic::set_hook(Box::new(|info| {
        tracing::error!(panic = %info, "Uncaught panic, exiting");
        std::process::exit(1);
    }));

    tracing::info!("nixaweb v{} starting", env!("CARGO_PKG_VERSION"));

    match lifecycle::run(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Server start error");
            ExitCode::FAILURE
        }
    }
}
