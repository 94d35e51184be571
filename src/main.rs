//! FHIR session gateway — binary entry point.

use anyhow::Context;
use gateway::{api::create_router, config::Config, logging, session::spawn_sweeper, state::AppState};
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    let _telemetry_guard =
        logging::init_logging(&config.logging).context("failed to initialize logging")?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting fhir-session-gateway");

    let addr = config.socket_addr().context("failed to determine socket address")?;
    let sweep_interval = Duration::from_secs(config.session.sweep_interval_seconds);

    let state = AppState::new(config);
    let _sweeper = spawn_sweeper(state.session_store.clone(), sweep_interval);

    let app = create_router(state);

    tracing::info!(listen_addr = %addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind TCP listener on {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server terminated unexpectedly")?;

    tracing::info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
