//! HTTP surface of the workspace service
//!
//! The session layer in front of this service authenticates users and
//! forwards their identity in the `X-User-Email` header and their model API
//! token in `X-Api-Token`. NetCDF work runs on the blocking pool.

use crate::config::AppConfig;
use crate::errors::{PrmsError, Result};
use crate::model_runs::model_run_name;
use crate::timeseries::{add_values_into_json, add_values_into_netcdf, TemperatureUpdate};
use crate::vegetation::{get_veg_map_by_hru, VegetationMapByHru};
use crate::workspace::{
    download_prms_inputs, find_user_folder, staged_inputs, use_default_model_run, InputUrls,
    StagedInputs,
};
use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

pub const USER_EMAIL_HEADER: &str = "x-user-email";
pub const API_TOKEN_HEADER: &str = "x-api-token";

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }
}

/// Email of the authenticated user.
#[derive(Debug, Clone)]
pub struct UserEmail(pub String);

/// Model API token of the authenticated session.
#[derive(Debug, Clone)]
pub struct ApiToken(pub String);

fn header_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl<S> FromRequestParts<S> for UserEmail
where
    S: Send + Sync,
{
    type Rejection = PrmsError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        header_value(parts, USER_EMAIL_HEADER)
            .map(UserEmail)
            .ok_or_else(|| PrmsError::Unauthorized("missing user identity".to_string()))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ApiToken
where
    S: Send + Sync,
{
    type Rejection = PrmsError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        header_value(parts, API_TOKEN_HEADER)
            .map(ApiToken)
            .ok_or_else(|| PrmsError::Unauthorized("missing API token".to_string()))
    }
}

/// JSON request body whose rejections answer with the service's error body.
#[derive(Debug, Clone)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = PrmsError;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(JsonBody(value))
    }
}

impl From<JsonRejection> for PrmsError {
    fn from(rejection: JsonRejection) -> Self {
        PrmsError::InvalidBody(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl PrmsError {
    /// HTTP status a failed request answers with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            PrmsError::IoError(e) if e.kind() == std::io::ErrorKind::NotFound => {
                StatusCode::NOT_FOUND
            }
            PrmsError::VariableNotFound { .. }
            | PrmsError::AttributeNotFound { .. }
            | PrmsError::MissingTimeVariable => StatusCode::UNPROCESSABLE_ENTITY,
            PrmsError::InvalidTimeUnits { .. }
            | PrmsError::InvalidCoverType { .. }
            | PrmsError::InvalidGrid { .. }
            | PrmsError::ShapeMismatch { .. }
            | PrmsError::InvalidUser { .. }
            | PrmsError::InvalidBody(_)
            | PrmsError::JsonError(_) => StatusCode::BAD_REQUEST,
            PrmsError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            PrmsError::HttpError(_) | PrmsError::UpstreamStatus { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PrmsError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::warn!(error = %self, status = status.as_u16(), "Request rejected");
        }

        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

async fn run_blocking<T, F>(task: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| PrmsError::IoError(std::io::Error::other(e)))?
}

fn require_file(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(PrmsError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} has not been staged", path.display()),
        )))
    }
}

fn json_text(body: String) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct MergeResponse {
    updated_file: PathBuf,
}

/// GET /health
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// GET /api/modelruns - finished model runs of the session
async fn model_runs_handler(
    State(state): State<AppState>,
    ApiToken(token): ApiToken,
) -> Result<Response> {
    let body = model_run_name(&token, &state.config.model_host).await?;
    Ok(json_text(body))
}

/// POST /api/workspace/default - stage the default model run inputs
async fn stage_default_handler(
    State(state): State<AppState>,
    UserEmail(email): UserEmail,
) -> Result<Json<StagedInputs>> {
    let config = state.config.clone();
    let staged = run_blocking(move || use_default_model_run(&config, &email)).await?;
    Ok(Json(staged))
}

/// POST /api/workspace/download - download inputs from caller-supplied URLs
async fn stage_download_handler(
    State(state): State<AppState>,
    UserEmail(email): UserEmail,
    JsonBody(urls): JsonBody<InputUrls>,
) -> Result<Json<StagedInputs>> {
    let staged = download_prms_inputs(&state.config, &email, &urls).await?;
    Ok(Json(staged))
}

/// GET /api/vegetation - vegetation map of the staged parameter file
async fn vegetation_handler(
    State(state): State<AppState>,
    UserEmail(email): UserEmail,
) -> Result<Json<VegetationMapByHru>> {
    let param = staged_inputs(&state.config, &email)?.param;
    require_file(&param)?;
    let veg_map = run_blocking(move || get_veg_map_by_hru(&param)).await?;
    Ok(Json(veg_map))
}

/// GET /api/temperature - temperature series of the staged data file
async fn get_temperature_handler(
    State(state): State<AppState>,
    UserEmail(email): UserEmail,
) -> Result<Response> {
    let data = staged_inputs(&state.config, &email)?.data;
    require_file(&data)?;
    let body = run_blocking(move || add_values_into_json(&data)).await?;
    Ok(json_text(body))
}

/// POST /api/temperature - merge edited values into the staged data file
async fn post_temperature_handler(
    State(state): State<AppState>,
    UserEmail(email): UserEmail,
    JsonBody(update): JsonBody<TemperatureUpdate>,
) -> Result<Json<MergeResponse>> {
    let folder = find_user_folder(&state.config.static_root, &email)?;
    let data = staged_inputs(&state.config, &email)?.data;
    require_file(&data)?;

    let updated_file = folder.join(state.config.temp_data_updated.trim_start_matches('/'));
    let target = updated_file.clone();
    run_blocking(move || add_values_into_netcdf(&data, &update, &target)).await?;

    Ok(Json(MergeResponse { updated_file }))
}

/// Builds the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/modelruns", get(model_runs_handler))
        .route(
            "/api/workspace/default",
            axum::routing::post(stage_default_handler),
        )
        .route(
            "/api/workspace/download",
            axum::routing::post(stage_download_handler),
        )
        .route("/api/vegetation", get(vegetation_handler))
        .route(
            "/api/temperature",
            get(get_temperature_handler).post(post_temperature_handler),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves the router on the configured listen address until Ctrl+C or SIGTERM.
pub async fn serve(config: AppConfig) -> Result<()> {
    let listener = TcpListener::bind(&config.listen).await?;
    tracing::info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, router(AppState::new(config)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
