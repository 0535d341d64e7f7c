mod cli;
mod telemetry;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use peephole_core::{LinkRecord, SystemClock, TrackingRecord};
use peephole_gateway::{App, AppState};
use peephole_storage::{InMemoryStore, SqliteStore};
use tokio::net::TcpListener;
use tracing::info;

use crate::cli::{StorageBackendArg, CLI};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();
    let telemetry = telemetry::init(config.log_format, config.otlp_endpoint.as_deref())?;

    info!(
        listen_addr = %config.listen_addr,
        storage_backend = %config.storage,
        otlp = config.otlp_endpoint.is_some(),
        "starting tracking gateway"
    );

    let state = match config.storage {
        StorageBackendArg::InMemory => AppState::new(
            Arc::new(InMemoryStore::<TrackingRecord>::new()),
            Arc::new(InMemoryStore::<LinkRecord>::new()),
            Arc::new(SystemClock),
        ),
        StorageBackendArg::Sqlite => {
            let pool = peephole_storage::connect(&config.sqlite_url).await?;
            info!(sqlite_url = %config.sqlite_url, "sqlite store opened");
            AppState::new(
                Arc::new(SqliteStore::<TrackingRecord>::new(pool.clone())),
                Arc::new(SqliteStore::<LinkRecord>::new(pool)),
                Arc::new(SystemClock),
            )
        }
    };

    let listener = TcpListener::bind(config.listen_addr).await?;
    info!(listen_addr = %listener.local_addr()?, "listening");

    axum::serve(
        listener,
        App::router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("gateway stopped");
    telemetry.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
