//! treestage HTTP server
//!
//! Exposes a [`TreeService`] as a small REST API and provides
//! [`HttpTreeApi`], the matching client used by editor sessions.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin treestage-server
//! TREESTAGE_PORT=5001 RUST_LOG=debug cargo run --bin treestage-server
//! ```

use axum::{
    http::{HeaderValue, Method},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use treestage_core::db::{DatabaseService, TursoStore};
use treestage_core::TreeService;

mod client;
pub mod config;
mod http_error;
mod tree_endpoints;

pub use client::HttpTreeApi;
pub use config::ServerConfig;
pub use http_error::HttpError;
pub use tree_endpoints::HealthStatus;

/// Application state shared across all endpoints
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TreeService>,
}

impl AppState {
    pub fn new(service: Arc<TreeService>) -> Self {
        Self { service }
    }
}

/// Create the main application router
///
/// Origins that are not valid header values are skipped with a warning;
/// `ServerConfig::validate` rejects them before the server starts.
pub fn create_router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .merge(tree_endpoints::routes(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origins))
}

fn cors_layer(cors_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers(Any)
        .allow_credentials(false)
}

/// Open the database, build the tree service and seed an empty store
pub async fn build_state(config: &ServerConfig) -> anyhow::Result<AppState> {
    let db = DatabaseService::new(config.db_path.clone()).await?;
    let store = Arc::new(TursoStore::new(Arc::new(db)));
    let service = TreeService::new(store, config.service.clone())?;

    if service.seed_if_empty().await? {
        tracing::info!("Seeded empty database at {}", config.db_path.display());
    }

    Ok(AppState::new(Arc::new(service)))
}

/// Serve `app` on an already bound listener until it fails
pub async fn serve(listener: tokio::net::TcpListener, app: Router) -> anyhow::Result<()> {
    axum::serve(listener, app).await?;
    Ok(())
}

/// Start the tree server
///
/// # Errors
///
/// Returns error if the database cannot be opened or the server fails to
/// bind or start.
pub async fn start_server(config: ServerConfig) -> anyhow::Result<()> {
    let state = build_state(&config).await?;
    let app = create_router(state, &config.cors_origins);

    let addr = config.bind_address();
    tracing::info!("HTTP server starting on http://{}", addr);
    tracing::info!("CORS enabled for {}", config.cors_origins.join(", "));
    tracing::info!(
        "Cascade batch size: {}",
        config.service.cascade_batch_size
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    serve(listener, app).await
}
