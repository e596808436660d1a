#![doc = include_str!("../README.md")]

mod server;

use clap::Parser;
use keyforge::store::sqlite::SqliteStore;
use keyforge::{Orchestrator, RandomKeyGenerator};
use server::config::{CliArgs, Database, ServerConfig};
use server::http::router;
use server::telemetry::{TelemetryMetrics, init_telemetry};
use tokio::net::TcpListener;
use tokio::signal;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    let providers = init_telemetry(config.log_json)?;
    let result = run(&config).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "server exited with an error");
    }
    providers.shutdown();
    result
}

async fn run(config: &ServerConfig) -> anyhow::Result<()> {
    let store = match &config.database {
        Database::File(path) => SqliteStore::open(path).await?,
        Database::InMemory => SqliteStore::in_memory().await?,
    };

    let orchestrator = Orchestrator::with_parts(store, RandomKeyGenerator, TelemetryMetrics)
        .with_key_interval(config.key_interval);

    let listener = TcpListener::bind(config.server_addr).await?;
    log_startup_info(config);

    axum::serve(listener, router(orchestrator.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!(
        in_flight = orchestrator.in_flight(),
        "HTTP server stopped, draining processing tasks"
    );
    orchestrator.drain(config.shutdown_timeout).await;
    orchestrator.store().close().await;

    tracing::info!("Service shut down successfully");
    Ok(())
}

fn log_startup_info(config: &ServerConfig) {
    if cfg!(debug_assertions) {
        tracing::info!(
            "Starting validator service on {} with full config: {:#?}",
            config.server_addr,
            config
        );
    } else {
        tracing::info!(
            addr = %config.server_addr,
            database = ?config.database,
            key_interval_ms = config.key_interval.as_millis() as u64,
            "Starting validator service"
        );
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                core::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = core::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            core::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        () = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }

    tracing::info!("Shutdown signal received, terminating gracefully...");
}
