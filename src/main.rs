//! neuron-monitor-exporter
//!
//! Polls the neuron-monitor JSON report and serves it as Prometheus metrics.
//! This is the main entry point that wires configuration, the poll loop and
//! the HTTP(S) server together.

mod cli;
mod config;
mod handlers;
mod state;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use clap::Parser;
use neuron_monitor_exporter::{
    CertWatch, Dispatcher, ExporterMetrics, FileSnapshotSource, MetricRegistry, Poller, TlsMode,
};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::signal;
use tracing::{error, info, warn};

use cli::Args;
use config::{resolve_config, show_config, validate_effective_config, Config};
use handlers::{health_handler, metrics_handler, root_handler};
use state::{AppState, SharedState};

/// Time given to open connections to finish after shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(config: &Config) -> Result<()> {
    let level = config.log_filter()?;

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    info!("Logging initialized with level: {}", level);
    Ok(())
}

/// Installs the SIGINT and SIGTERM handlers right away and returns a future
/// that resolves on the first of them.
#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    use signal::unix::{signal, SignalKind};

    let mut interrupt =
        signal(SignalKind::interrupt()).context("Failed to install SIGINT handler")?;
    let mut terminate =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;

    Ok(async move {
        tokio::select! {
            _ = interrupt.recv() => {
                info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
            }
            _ = terminate.recv() => {
                info!("Received SIGTERM, shutting down gracefully...");
            }
        }
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    Ok(async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down gracefully...");
    })
}

/// Serves the router until the handle is told to shut down.
async fn serve(
    addr: SocketAddr,
    app: Router,
    handle: Handle,
    tls: Option<RustlsConfig>,
) -> std::io::Result<()> {
    match tls {
        Some(tls) => {
            axum_server::bind_rustls(addr, tls)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
        None => {
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
    }
}

/// Main application entry point.
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = resolve_config(&args)?;

        if args.check_config {
            if let Err(e) = validate_effective_config(&config) {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format);
    }

    let config = resolve_config(&args)?;
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }

    setup_logging(&config)?;
    info!("Starting neuron-monitor-exporter");

    // Handlers must exist before the first poll so a signal never lands
    // mid-update under the default disposition.
    let shutdown = shutdown_signal()?;

    let addr = config.listen_addr()?;
    let interval = config.poll_interval();
    let source = FileSnapshotSource::new(config.snapshot_path(), config.snapshot_key());
    info!(
        "Reading snapshots from {} every {:?}",
        source.path().display(),
        interval
    );

    let registry = Arc::new(MetricRegistry::new());
    let telemetry = ExporterMetrics::new(registry.prometheus())?;

    let state: SharedState = Arc::new(AppState {
        registry: registry.clone(),
        telemetry: telemetry.clone(),
        config: Arc::new(config.clone()),
        start_time: Instant::now(),
    });

    let app = Router::new()
        .route("/", get(root_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(state);

    let dispatcher = Dispatcher::new(registry);
    let handle = Handle::new();

    let (mut poller, server) = match config.tls_mode() {
        TlsMode::Enabled { cert, key } => {
            info!("Loading TLS certificate from: {}", cert.display());
            info!("Loading TLS private key from: {}", key.display());

            let tls = RustlsConfig::from_pem_file(&cert, &key)
                .await
                .with_context(|| format!("Failed to load TLS configuration from {}", cert.display()))?;

            info!("neuron-monitor-exporter listening on https://{}", addr);
            let server = tokio::spawn(serve(addr, app, handle.clone(), Some(tls.clone())));
            let poller = Poller::new(source, dispatcher, telemetry, interval)
                .with_cert_watch(CertWatch::new(cert, key, tls));
            (poller, server)
        }
        TlsMode::Disabled => {
            info!("neuron-monitor-exporter listening on http://{}", addr);
            let server = tokio::spawn(serve(addr, app, handle.clone(), None));
            let poller: Poller<_, RustlsConfig> = Poller::new(source, dispatcher, telemetry, interval);
            (poller, server)
        }
        TlsMode::Misconfigured => {
            // Rejected by validate_effective_config above.
            anyhow::bail!("both --cert-file and --key-file must be provided to enable HTTPS");
        }
    };

    let mut server = server;
    let mut server_exited = false;

    poller
        .run(async {
            tokio::select! {
                _ = shutdown => {}
                result = &mut server => {
                    server_exited = true;
                    match result {
                        Ok(Ok(())) => warn!("HTTP server stopped unexpectedly"),
                        Ok(Err(e)) => error!("Server error: {}", e),
                        Err(e) => error!("Server task failed: {}", e),
                    }
                }
            }
        })
        .await;

    if !server_exited {
        handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
        match server.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Server error during shutdown: {}", e),
            Err(e) => error!("Server task failed: {}", e),
        }
    }

    info!("neuron-monitor-exporter stopped gracefully");
    Ok(())
}
