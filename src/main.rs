use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use vantage_ride::api;
use vantage_ride::config::Config;
use vantage_ride::error::AppError;
use vantage_ride::screens::auth;
use vantage_ride::state::AppContext;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let http_port = config.http_port;
    let ctx = Arc::new(AppContext::from_config(config)?);
    let app = api::rest::router(ctx.clone());
    let session_keeper = auth::keep_session_fresh(ctx.clone());

    let bind_addr = format!("0.0.0.0:{http_port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port, origin = %ctx.config.app_origin, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    session_keeper.abort();
    tracing::info!("http server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
