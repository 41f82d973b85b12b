//! Documentation of a raffle campaign platform.
//!
//!
//!
//! # General Infrastructure
//! - Organizers sign up with the hosted auth provider and draft campaigns from the dashboard
//! - A draft goes live once the publication fee is paid, then stays open for 30 days
//! - Buyers reserve numbers on the public page without an account and pay the organizer directly
//! - The organizer confirms payments, which turns reservations into purchases
//! - Prize photos and avatars go to object storage, only URLs are kept here
//!
//!
//!
//! # Reservations
//!
//! **Goal**: Two buyers can never hold the same number.
//!
//! - Manual campaigns send the exact numbers picked on the grid
//! - Automatic campaigns send a quantity and the server draws free numbers
//! - The whole batch is written in one atomic step, or not at all
//! - A collision on a manual pick is reported back with the offending numbers
//! - A collision on an automatic pick draws again, up to 3 times
//! - Unpaid reservations expire after the campaign's payment deadline and the sweeper frees them
//!
//!
//!
//! # Notes
//!
//! ## Redis
//! Every record is small JSON behind a hash field, which keeps lookups O(1) and lets
//! the reservation check and write happen inside a single Lua script.
//!
//! ## Money
//! Integer cents end to end. The dashboard form still sends `1,50`, which is parsed
//! at the edge by `/campaigns/form`.
//!
//!
//!
//! # Setup
//!
//! View current docs.
//! ```sh
//! cargo doc --open
//! ```
//!
//! Run locally against a Redis on the default port.
//! ```sh
//! SERVICE_KEY=dev REDIS_URL=redis://127.0.0.1:6379 RUST_LOG=info cargo run -p server
//! ```
use std::sync::Arc;

use signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod memory;
pub mod routes;
pub mod state;
pub mod storage;
pub mod store;
pub mod sweeper;
pub mod utils;

use error::AppError;
use state::AppState;
use sweeper::spawn_sweeper;

pub async fn start_server() -> Result<(), AppError> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Initializing state...");
    let state = AppState::new().await?;

    info!("Starting sweeper every {:?}", state.config.sweep_interval);
    let sweeper = spawn_sweeper(Arc::clone(&state), state.config.sweep_interval);

    info!("Starting server...");
    let app = routes::router(Arc::clone(&state));

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address)
        .await
        .map_err(|e| AppError::InternalError(Box::new(e)))?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::InternalError(Box::new(e)))?;

    sweeper.abort();
    info!("Server shutting down...");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }

        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
