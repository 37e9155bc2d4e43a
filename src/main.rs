// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Status Gateway Service
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables (and `.env` if
//! present):
//!
//! - `BIND_ADDR`: Server bind address (default: 0.0.0.0:8080)
//! - `HMAC_SECRET`: Shared webhook secret (required)
//! - `HMAC_MAX_DRIFT_S`: Allowed timestamp drift in seconds (default: 300)
//! - `RATE_LIMIT_DEFAULT` / `RATE_LIMIT_HOOKS`: Requests per window (default: 60 / 5)
//! - `RATE_LIMIT_WINDOW_S`: Window length in seconds (default: 60)
//! - `MAX_BODY_KB`: Body limit for POST/PUT/PATCH (default: 64)
//! - `STATUS_SOURCE`: File path or http(s) URL of the status document
//! - `STATUS_CACHE_TTL_S`: Status cache TTL (default: 60)

use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use status_gateway::{
    app::router, clock::SystemClock, config::Config, error::GatewayError, handlers::AppState,
    source::source_from_config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Missing secret stops us here, before anything binds.
    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        bind_addr = %config.bind_addr,
        max_drift_secs = config.security.max_drift_secs,
        max_body_kb = config.security.max_body_kb,
        default_limit = config.rate_limit.default_limit,
        hooks_limit = config.rate_limit.hooks_limit,
        window_secs = config.rate_limit.window_secs,
        cache_ttl_secs = config.status.cache_ttl_secs,
        "Starting status gateway"
    );

    let source = source_from_config(&config.status).context("Invalid status source")?;
    info!(source = %source.describe(), "Status source configured");

    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .map_err(|source| GatewayError::BindAddr {
            addr: config.bind_addr.clone(),
            source,
        })?;

    let window = config.rate_limit.window_duration();
    let state = Arc::new(AppState::new(config, source, Arc::new(SystemClock::new()))?);

    // Spawn cleanup task
    let cleanup_state = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(window);
        loop {
            interval.tick().await;
            let now = cleanup_state.clock.now();
            cleanup_state.pipeline.limiter().cleanup(now).await;
        }
    });

    let app = router(state);

    let listener = TcpListener::bind(addr).await.map_err(GatewayError::Io)?;
    info!(addr = %addr, "Server listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
