//! Tree endpoints
//!
//! # Endpoints
//!
//! - `GET /api/health` - Health check endpoint
//! - `GET /tree` - Live root with its whole subtree (`null` for an empty tree)
//! - `GET /tree/:id` - A single node without children
//! - `PUT /tree` - Apply a change set
//! - `POST /tree/reset` - Restore the seed tree
//! - `POST /tree/filterOutNotRemovedIds` - Subset of the given ids that are removed

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use treestage_core::{ApplyReport, ChangeSet, Node, NodeTree};

use crate::{AppState, HttpError};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
}

/// Health check endpoint
///
/// ```bash
/// curl http://localhost:5000/api/health
/// ```
async fn health_check() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn get_root(State(state): State<AppState>) -> Result<Json<Option<NodeTree>>, HttpError> {
    let root = state.service.get_root_with_children().await?;
    Ok(Json(root))
}

async fn get_node(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Node>, HttpError> {
    let node = state.service.get_node(id).await?;
    Ok(Json(node))
}

/// Apply a change set
///
/// Responds with the counts of inserted, renamed and removed nodes plus the
/// cascade statistics.
///
/// ```bash
/// curl -X PUT http://localhost:5000/tree \
///   -H 'Content-Type: application/json' \
///   -d '{"nodesToUpdate":{"2":"Renamed"},"nodesToRemove":[3]}'
/// ```
async fn apply_changes(
    State(state): State<AppState>,
    Json(changes): Json<ChangeSet>,
) -> Result<Json<ApplyReport>, HttpError> {
    let report = state.service.apply_changes(&changes).await?;
    Ok(Json(report))
}

async fn reset(State(state): State<AppState>) -> Result<StatusCode, HttpError> {
    state.service.reset().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn filter_removed(
    State(state): State<AppState>,
    Json(ids): Json<Vec<i64>>,
) -> Result<Json<Vec<i64>>, HttpError> {
    let removed = state.service.filter_removed(ids).await?;
    Ok(Json(removed))
}

/// Create router with all tree endpoints
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/tree", get(get_root).put(apply_changes))
        .route("/tree/reset", post(reset))
        .route("/tree/filterOutNotRemovedIds", post(filter_removed))
        .route("/tree/:id", get(get_node))
        .with_state(state)
}
