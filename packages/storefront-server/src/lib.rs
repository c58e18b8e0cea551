/*
 * Storefront Server - HTTP API for the online shop
 *
 * Architecture:
 * - Catalog browsing (categories, products, gallery)
 * - Accounts with bearer-token sessions
 * - Favorites and a per-customer cart with stock accounting
 * - Checkout through a hosted payment session (order state machine)
 * - Storage behind the storefront_storage port traits (SQLite)
 */

pub mod auth;
pub mod cart;
pub mod config;
pub mod error;
pub mod extract;
pub mod forms;
pub mod order;
pub mod payment;
pub mod routes;
pub mod seed;
pub mod state;

pub use config::{ConfigError, ServerConfig};
pub use error::{Result, ServerError};
pub use order::OrderStateMachine;
pub use payment::{HostedCheckoutGateway, PaymentGateway};
pub use state::AppState;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    Router,
};
use storefront_storage::SqliteStorefrontStore;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Router with request tracing and CORS
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// `RUST_LOG` wins over the configured level
pub fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    // A subscriber may already be installed (tests, embedding)
    let _ = fmt().with_env_filter(filter).try_init();
}

/// Open the database, bind and serve until Ctrl+C / SIGTERM
pub async fn start_server(config: ServerConfig) -> Result<()> {
    info!("Opening database {}", config.database_path.display());
    let store = SqliteStorefrontStore::open(&config.database_path)?;
    let payments = HostedCheckoutGateway::new(config.checkout_base_url.as_str());

    let address = config.listen_addr();
    let state = AppState::new(Arc::new(store), Arc::new(payments), config);
    let app = build_router(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(&address).await?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
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
}
