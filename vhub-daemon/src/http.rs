//! axum façade over the store.
//!
//! Handlers call the synchronous store directly (every operation is a short
//! critical section) and persist on the blocking pool after each successful
//! mutation.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tower_http::trace::TraceLayer;

use vhub_core::types::{App, AppPatch, CreateAppOptions, Environment, HealthStatus, Region};
use vhub_core::{PersistError, Persistence, RegistryStore, StoreError};
use vhub_renderer::{RenderError, Renderer};

use crate::health::HealthPoller;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RegistryStore>,
    pub persistence: Arc<Persistence>,
    /// `None` when health checks are disabled.
    pub health: Option<HealthPoller>,
    pub renderer: Arc<Renderer>,
}

/// `(methods, path)` for every route, served by `GET /api/v1/`.
const ROUTES: &[(&str, &str)] = &[
    ("GET", "/"),
    ("GET", "/healthcheck"),
    ("GET", "/csv"),
    ("GET", "/api/v1/"),
    ("GET", "/api/v1/health"),
    ("GET,POST", "/api/v1/regions"),
    ("GET,PUT,DELETE", "/api/v1/regions/{region}"),
    ("GET,POST", "/api/v1/regions/{region}/environments"),
    (
        "GET,PUT,DELETE",
        "/api/v1/regions/{region}/environments/{environment}",
    ),
    (
        "GET,POST",
        "/api/v1/regions/{region}/environments/{environment}/apps",
    ),
    (
        "GET,PUT,DELETE",
        "/api/v1/regions/{region}/environments/{environment}/apps/{app}",
    ),
    (
        "GET,PUT",
        "/api/v1/regions/{region}/environments/{environment}/apps/{app}/version",
    ),
];

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard))
        .route("/healthcheck", get(liveness))
        .route("/csv", get(csv_export))
        .route("/api/v1", get(list_routes))
        .route("/api/v1/", get(list_routes))
        .route("/api/v1/health", get(health_snapshot))
        .route("/api/v1/regions", get(list_regions).post(create_region))
        .route(
            "/api/v1/regions/:region",
            get(get_region).put(replace_region).delete(delete_region),
        )
        .route(
            "/api/v1/regions/:region/environments",
            get(list_environments).post(create_environment),
        )
        .route(
            "/api/v1/regions/:region/environments/:environment",
            get(get_environment)
                .put(replace_environment)
                .delete(delete_environment),
        )
        .route(
            "/api/v1/regions/:region/environments/:environment/apps",
            get(list_apps).post(create_app),
        )
        .route(
            "/api/v1/regions/:region/environments/:environment/apps/:app",
            get(get_app).put(update_app).delete(delete_app),
        )
        .route(
            "/api/v1/regions/:region/environments/:environment/apps/:app/version",
            get(get_app_version).put(set_app_version),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("save failed: {0}")]
    Persist(#[from] PersistError),

    #[error("render failed: {0}")]
    Render(#[from] RenderError),

    #[error("malformed request body: {0}")]
    Body(#[from] JsonRejection),

    #[error("{0}")]
    BadRequest(&'static str),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Store(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Store(StoreError::Conflict(_)) => StatusCode::CONFLICT,
            ApiError::Store(_) | ApiError::Body(_) | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Persist(_) | ApiError::Render(_) | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else if status == StatusCode::NOT_FOUND {
            tracing::warn!(error = %self, "lookup failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

async fn persist(state: &AppState) -> ApiResult<()> {
    let store = Arc::clone(&state.store);
    let persistence = Arc::clone(&state.persistence);
    tokio::task::spawn_blocking(move || persistence.save(&store))
        .await
        .map_err(|e| ApiError::Internal(format!("save task failed: {e}")))??;
    Ok(())
}

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct NameBody {
    name: String,
}

#[derive(Debug, Deserialize)]
struct CreateAppBody {
    name: String,
    #[serde(flatten)]
    options: CreateAppOptions,
}

#[derive(Debug, Deserialize)]
struct VersionBody {
    version: String,
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

async fn health_statuses(state: &AppState) -> Vec<HealthStatus> {
    match &state.health {
        Some(poller) => poller.snapshot().await,
        None => Vec::new(),
    }
}

async fn dashboard(State(state): State<AppState>) -> ApiResult<Html<String>> {
    let health = health_statuses(&state).await;
    let html = state
        .renderer
        .render_dashboard(&state.store.snapshot(), &health)?;
    Ok(Html(html))
}

async fn liveness() -> Json<serde_json::Value> {
    Json(json!({ "status": "OK" }))
}

async fn csv_export(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let body = state.renderer.render_csv(&state.store.snapshot())?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=data.csv"),
        ],
        body,
    ))
}

async fn list_routes() -> String {
    ROUTES
        .iter()
        .map(|(methods, path)| format!("Path: {path}\nMethods: {methods}\n"))
        .collect()
}

async fn health_snapshot(State(state): State<AppState>) -> Json<Vec<HealthStatus>> {
    Json(health_statuses(&state).await)
}

// ---------------------------------------------------------------------------
// Regions
// ---------------------------------------------------------------------------

async fn list_regions(State(state): State<AppState>) -> Json<Vec<Region>> {
    Json(state.store.list_regions())
}

async fn create_region(
    State(state): State<AppState>,
    body: Result<Json<NameBody>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Region>)> {
    let Json(body) = body?;
    let region = state.store.create_region(&body.name)?;
    persist(&state).await?;
    tracing::info!(region = %region.name, "region created");
    Ok((StatusCode::CREATED, Json(region)))
}

async fn get_region(
    State(state): State<AppState>,
    Path(region): Path<String>,
) -> ApiResult<Json<Region>> {
    Ok(Json(state.store.get_region(&region)?))
}

async fn replace_region(
    State(state): State<AppState>,
    Path(region): Path<String>,
    body: Result<Json<Region>, JsonRejection>,
) -> ApiResult<Json<Region>> {
    let Json(body) = body?;
    let replaced = state.store.replace_region(&region, body)?;
    persist(&state).await?;
    tracing::info!(
        region = %region,
        environments = replaced.environments.len(),
        "region replaced"
    );
    Ok(Json(replaced))
}

async fn delete_region(
    State(state): State<AppState>,
    Path(region): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state.store.delete_region(&region)?;
    persist(&state).await?;
    tracing::info!(region = %region, "region deleted");
    Ok(Json(json!({ "message": format!("region '{region}' deleted") })))
}

// ---------------------------------------------------------------------------
// Environments
// ---------------------------------------------------------------------------

async fn list_environments(
    State(state): State<AppState>,
    Path(region): Path<String>,
) -> ApiResult<Json<Vec<Environment>>> {
    Ok(Json(state.store.list_environments(&region)?))
}

async fn create_environment(
    State(state): State<AppState>,
    Path(region): Path<String>,
    body: Result<Json<NameBody>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Environment>)> {
    let Json(body) = body?;
    let environment = state.store.create_environment(&region, &body.name)?;
    persist(&state).await?;
    tracing::info!(region = %region, environment = %environment.name, "environment created");
    Ok((StatusCode::CREATED, Json(environment)))
}

async fn get_environment(
    State(state): State<AppState>,
    Path((region, environment)): Path<(String, String)>,
) -> ApiResult<Json<Environment>> {
    Ok(Json(state.store.get_environment(&region, &environment)?))
}

async fn replace_environment(
    State(state): State<AppState>,
    Path((region, environment)): Path<(String, String)>,
    body: Result<Json<Environment>, JsonRejection>,
) -> ApiResult<Json<Environment>> {
    let Json(body) = body?;
    let replaced = state
        .store
        .replace_environment(&region, &environment, body)?;
    persist(&state).await?;
    tracing::info!(
        region = %region,
        environment = %environment,
        apps = replaced.apps.len(),
        "environment replaced"
    );
    Ok(Json(replaced))
}

async fn delete_environment(
    State(state): State<AppState>,
    Path((region, environment)): Path<(String, String)>,
) -> ApiResult<Json<serde_json::Value>> {
    state.store.delete_environment(&region, &environment)?;
    persist(&state).await?;
    tracing::info!(region = %region, environment = %environment, "environment deleted");
    Ok(Json(json!({
        "message": format!("environment '{region}/{environment}' deleted")
    })))
}

// ---------------------------------------------------------------------------
// Apps
// ---------------------------------------------------------------------------

async fn list_apps(
    State(state): State<AppState>,
    Path((region, environment)): Path<(String, String)>,
) -> ApiResult<Json<Vec<App>>> {
    Ok(Json(state.store.list_apps(&region, &environment)?))
}

async fn create_app(
    State(state): State<AppState>,
    Path((region, environment)): Path<(String, String)>,
    body: Result<Json<CreateAppBody>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<App>)> {
    let Json(body) = body?;
    let app = state
        .store
        .create_app(&region, &environment, &body.name, body.options)?;
    persist(&state).await?;
    tracing::info!(
        region = %region,
        environment = %environment,
        app = %app.name,
        version = %app.version,
        "app created"
    );
    Ok((StatusCode::CREATED, Json(app)))
}

async fn get_app(
    State(state): State<AppState>,
    Path((region, environment, app)): Path<(String, String, String)>,
) -> ApiResult<Json<App>> {
    Ok(Json(state.store.get_app(&region, &environment, &app)?))
}

async fn update_app(
    State(state): State<AppState>,
    Path((region, environment, app)): Path<(String, String, String)>,
    body: Result<Json<AppPatch>, JsonRejection>,
) -> ApiResult<Json<App>> {
    let Json(patch) = body?;
    let updated = state.store.update_app(&region, &environment, &app, patch)?;
    persist(&state).await?;
    tracing::info!(region = %region, environment = %environment, app = %app, "app updated");
    Ok(Json(updated))
}

async fn delete_app(
    State(state): State<AppState>,
    Path((region, environment, app)): Path<(String, String, String)>,
) -> ApiResult<Json<serde_json::Value>> {
    state.store.delete_app(&region, &environment, &app)?;
    persist(&state).await?;
    tracing::info!(region = %region, environment = %environment, app = %app, "app deleted");
    Ok(Json(json!({
        "message": format!("app '{region}/{environment}/{app}' deleted")
    })))
}

async fn get_app_version(
    State(state): State<AppState>,
    Path((region, environment, app)): Path<(String, String, String)>,
) -> ApiResult<Json<serde_json::Value>> {
    let app = state.store.get_app(&region, &environment, &app)?;
    Ok(Json(json!({ "version": app.version })))
}

async fn set_app_version(
    State(state): State<AppState>,
    Path((region, environment, app)): Path<(String, String, String)>,
    body: Result<Json<VersionBody>, JsonRejection>,
) -> ApiResult<Json<App>> {
    let Json(body) = body?;
    if body.version.trim().is_empty() {
        return Err(ApiError::BadRequest("version must not be empty"));
    }
    let updated = state
        .store
        .update_app_version(&region, &environment, &app, &body.version)?;
    persist(&state).await?;
    tracing::info!(
        region = %region,
        environment = %environment,
        app = %app,
        version = %updated.version,
        "version updated"
    );
    Ok(Json(updated))
}
