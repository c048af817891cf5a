//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Build the route table before anything listens
//! - Start the metrics exporter when enabled
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - Listeners start last (traffic only when ready)

use std::net::SocketAddr;
use std::path::Path;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::{load_or_default, ConfigError, HardeningConfig, SiteConfig};
use crate::http::HttpServer;
use crate::lifecycle::signals::spawn_signal_listener;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::routing::{PageRegistry, PageRouter, RegistryError};

/// Error type for startup failures.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("template error: {0}")]
    Registry(#[from] RegistryError),

    #[error("failed to start metrics exporter: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// A server accepting connections in the background.
#[derive(Debug)]
pub struct RunningServer {
    pub local_addr: SocketAddr,
    pub task: JoinHandle<Result<(), std::io::Error>>,
}

/// Load the configuration from `path`.
///
/// `explicit` marks a path given on the command line; only then is a
/// missing file an error.
pub fn load_configuration(path: &Path, explicit: bool) -> Result<SiteConfig, StartupError> {
    let config = load_or_default(path, explicit)?;
    tracing::info!(
        site_title = %config.site_title,
        bind_address = %config.listener.bind_address,
        hardening = config.hardening.enabled,
        "Configuration loaded"
    );
    Ok(config)
}

/// Build the page router from the template directory.
pub fn build_pages(config: &SiteConfig) -> Result<PageRouter, StartupError> {
    tracing::info!(views_dir = %config.templates.views_dir, "Setting up templates");
    let table = PageRegistry::build(&config.templates)?;
    metrics::record_pages_loaded(table.len());
    tracing::info!(routes = table.len(), "Routes are ready");
    Ok(PageRouter::new(table, config.site_title.clone()))
}

/// Warn when HTML responses will leave unhardened. Returns whether the
/// hook is off.
pub fn warn_if_unhardened(config: &HardeningConfig) -> bool {
    if !config.enabled {
        tracing::warn!("Response hardening is disabled; HTML is served without obfuscation or minification");
    }
    !config.enabled
}

/// Build every subsystem, bind the listener and serve in the background
/// until `shutdown` fires.
pub async fn launch(config: SiteConfig, shutdown: &Shutdown) -> Result<RunningServer, StartupError> {
    let pages = build_pages(&config)?;
    warn_if_unhardened(&config.hardening);

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr)?;
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let address = config.listener.bind_address.clone();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })?;
    let local_addr = listener.local_addr()?;

    let server = HttpServer::new(config, pages);
    let task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tracing::info!(address = %local_addr, "Server is running");
    Ok(RunningServer { local_addr, task })
}

/// Run the server until SIGTERM/SIGINT.
pub async fn run(config: SiteConfig) -> Result<(), StartupError> {
    let shutdown = Shutdown::new();
    let running = launch(config, &shutdown).await?;
    let signals = spawn_signal_listener(shutdown);
    tracing::info!("Nixaweb is ready to serve");

    let served = running
        .task
        .await
        .map_err(std::io::Error::other)?;
    signals.abort();
    served?;
    Ok(())
}
