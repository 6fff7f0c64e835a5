use std::sync::Arc;

use instantly_mcp::{
    config::AppConfig,
    errors::Error,
    mcp::{build_router, AppState},
    observability::init_logging,
    tools,
    upstream::InstantlyClient,
    Result, APP_NAME, VERSION,
};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present; config is read from the environment below.
    if let Err(e) = dotenvy::dotenv() {
        if !e.to_string().contains("not found") {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }

    let config = AppConfig::from_env()?;
    init_logging(config.log_format);

    info!(
        app_name = APP_NAME,
        version = VERSION,
        production = config.production,
        tool_count = tools::catalog().len(),
        "Starting Instantly MCP server"
    );

    if config.upstream.fallback_api_key.is_some() {
        info!("Fallback API key configured from environment");
    }

    let upstream = Arc::new(InstantlyClient::new(&config.upstream)?);
    let bind_address = config.server.bind_address();
    let sweep_interval = config.session.sweep_interval();
    let state = AppState::new(config, upstream);

    // Periodic sweep: the only mechanism reclaiming abandoned sessions and
    // elapsed rate-limit windows.
    {
        let sessions = state.sessions.clone();
        let rate_limiter = state.rate_limiter.clone();
        let sse_sessions = state.sse_sessions.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(sweep_interval);
            interval.tick().await; // first tick fires immediately
            loop {
                interval.tick().await;
                let removed_sessions = sessions.cleanup_expired();
                let removed_windows = rate_limiter.cleanup_expired().await;
                let removed_streams = sse_sessions.cleanup_closed();
                if removed_sessions + removed_windows + removed_streams > 0 {
                    debug!(
                        sessions = removed_sessions,
                        rate_windows = removed_windows,
                        sse_streams = removed_streams,
                        "Sweep reclaimed idle state"
                    );
                }
            }
        });
    }

    let router = build_router(state);

    let listener = TcpListener::bind(&bind_address)
        .await
        .map_err(|e| Error::transport(format!("Failed to bind {}: {}", bind_address, e)))?;

    info!(address = %bind_address, "MCP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = signal::ctrl_c().await {
                warn!(error = %e, "Shutdown listener failed");
            }
            info!("Shutdown signal received");
        })
        .await
        .map_err(|e| Error::transport(format!("Server error: {}", e)))?;

    info!("Server shutdown completed");
    Ok(())
}
