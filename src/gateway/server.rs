//! Usage: Bind the listener and run the axum server until Ctrl-C.

use super::listen::{format_host_port, local_base_url};
use super::routes::build_router;
use crate::app_state::{open_token_store, AppState};
use crate::settings::AppSettings;
use crate::shared::error::AppResult;

fn bind_host_port(bind_host: &str, port: u16) -> AppResult<std::net::TcpListener> {
    let bind_addr = format_host_port(bind_host, port);
    let std_listener = std::net::TcpListener::bind((bind_host, port))
        .map_err(|e| format!("SYSTEM_ERROR: failed to bind {bind_addr}: {e}"))?;
    std_listener
        .set_nonblocking(true)
        .map_err(|e| format!("SYSTEM_ERROR: failed to configure listener {bind_addr}: {e}"))?;
    Ok(std_listener)
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(err) => tracing::error!("failed to listen for shutdown signal: {}", err),
    }
}

pub(crate) async fn serve(settings: AppSettings) -> AppResult<()> {
    settings.ensure_server_ready()?;

    let token_store = open_token_store(&settings).await?;
    let bind_host = settings.listen_host.clone();
    let port = settings.port;
    let bind_addr = format_host_port(&bind_host, port);
    let refresh_token_source = settings.refresh_token_source;

    let state = AppState::new(settings, token_store)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::from_std(bind_host_port(&bind_host, port)?)
        .map_err(|e| format!("SYSTEM_ERROR: listener init failed for {bind_addr}: {e}"))?;

    tracing::info!(
        bind_addr = %bind_addr,
        base_url = %local_base_url(&bind_host, port),
        refresh_token_source = refresh_token_source.as_str(),
        "spotify auth server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("SYSTEM_ERROR: server error on {bind_addr}: {e}"))?;

    tracing::info!(bind_addr = %bind_addr, "spotify auth server stopped");
    Ok(())
}
