//! # Deposit API
//!
//! JSON-file store mirror for the dorm-deposit prototype.
//!
//! ## Usage
//!
//! ```bash
//! # Optional overrides
//! export PORT=3001
//! export DATA_DIR=data
//!
//! # Run the server
//! deposit-api
//! ```

use deposit_api::{routes, state::AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    // Initialize application state
    let state = AppState::new()?;

    let addr = state.config.socket_addr();
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Data directory: {}", state.config.data_dir);
    info!("Dorms loaded: {}", state.catalog.dorms.len());

    // Create router
    let app = routes::create_router(state);

    // Start server
    info!("🚀 deposit-api starting on http://{}", addr);

    if !is_prod {
        info!("🩺 Health: http://{}/api/health", addr);
        info!("💳 Payments: POST http://{}/api/payments", addr);
        info!("📋 Requests: POST http://{}/api/requests", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
