//! JSON HTTP server over the catalog read API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/search?query=` | Pruned section forest; a missing query matches everything |
//! | `GET`  | `/children?parent_id=` | Direct child sections |
//! | `GET`  | `/root-sections` | Sections without a parent |
//! | `GET`  | `/section/{id}/namegroups` | Name groups of a section |
//! | `GET`  | `/namegroup/{id}/works` | Works of a name group |
//! | `GET`  | `/work/{id}` | Work with items and resources |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "work not found: 42" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use pricebase_core::catalog;
use pricebase_core::error::CatalogError;
use pricebase_core::models::{NameGroupRow, RowId, SectionNode, SectionRow, WorkDetail, WorkRow};
use pricebase_core::store::Store;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    store: Arc<dyn Store>,
}

/// Starts the HTTP server on `[server].bind` and runs until the process is
/// terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store = SqliteStore::open(config).await?;
    let app = router(Arc::new(store));

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    println!("Pricebase server listening on http://{}", config.server.bind);
    tracing::info!(bind = %config.server.bind, "server started");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Builds the router over any store.
pub fn router(store: Arc<dyn Store>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/search", get(handle_search))
        .route("/children", get(handle_children))
        .route("/root-sections", get(handle_root_sections))
        .route("/section/{id}/namegroups", get(handle_name_groups))
        .route("/namegroup/{id}/works", get(handle_works))
        .route("/work/{id}", get(handle_work))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(AppState { store })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        if err.is_not_found() {
            return AppError {
                status: StatusCode::NOT_FOUND,
                code: "not_found".to_string(),
                message: err.to_string(),
            };
        }
        tracing::error!(error = %err, "read failed");
        AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "internal".to_string(),
            message: err.to_string(),
        }
    }
}

fn parse_id(name: &str, raw: &str) -> Result<RowId, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| bad_request(format!("{} must be an integer, got {:?}", name, raw)))
}

// ============ Handlers ============

#[derive(Deserialize)]
struct SearchParams {
    query: Option<String>,
}

async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<SectionNode>>, AppError> {
    let substring = params.query.unwrap_or_default();
    Ok(Json(catalog::search(&*state.store, &substring).await?))
}

#[derive(Deserialize)]
struct ChildrenParams {
    parent_id: Option<String>,
}

async fn handle_children(
    State(state): State<AppState>,
    Query(params): Query<ChildrenParams>,
) -> Result<Json<Vec<SectionRow>>, AppError> {
    let raw = params
        .parent_id
        .ok_or_else(|| bad_request("parent_id is required"))?;
    let parent_id = parse_id("parent_id", &raw)?;
    Ok(Json(catalog::children(&*state.store, parent_id).await?))
}

async fn handle_root_sections(
    State(state): State<AppState>,
) -> Result<Json<Vec<SectionRow>>, AppError> {
    Ok(Json(catalog::root_sections(&*state.store).await?))
}

async fn handle_name_groups(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<NameGroupRow>>, AppError> {
    let section_id = parse_id("section id", &id)?;
    Ok(Json(catalog::name_groups(&*state.store, section_id).await?))
}

async fn handle_works(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Vec<WorkRow>>, AppError> {
    let name_group_id = parse_id("name group id", &id)?;
    Ok(Json(catalog::works(&*state.store, name_group_id).await?))
}

async fn handle_work(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<WorkDetail>, AppError> {
    let work_id = parse_id("work id", &id)?;
    Ok(Json(catalog::work_detail(&*state.store, work_id).await?))
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
