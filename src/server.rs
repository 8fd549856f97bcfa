//! HTTP adapter.
//!
//! Exposes the pipeline over JSON:
//! - `GET /` welcome message
//! - `GET /health` liveness
//! - `POST /nl-to-map` with `{"query": "..."}`
//! - `POST /session/reset` drops the follow-up history

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use crate::error::{GeoQueryError, Result};
use crate::pipeline::{MapResponse, Pipeline};

const WELCOME_MESSAGE: &str = "Welcome to the geoquery NL-to-Map API";

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pipeline: Arc<Pipeline>,
}

/// Request body for `POST /nl-to-map`.
#[derive(Debug, Deserialize)]
pub struct NlQueryRequest {
    #[serde(default)]
    pub query: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

/// An error rendered as a JSON response.
///
/// Only the public summary leaves the process. Server-side failures are
/// logged in full.
#[derive(Debug)]
pub struct ApiError(GeoQueryError);

impl From<GeoQueryError> for ApiError {
    fn from(err: GeoQueryError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(category = self.0.category(), error = %self.0, "Request failed");
        } else {
            warn!(category = self.0.category(), error = %self.0, "Request rejected");
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: self.0.code(),
                message: self.0.public_message(),
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Builds the router with permissive CORS.
pub fn router(pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/nl-to-map", post(nl_to_map))
        .route("/session/reset", post(reset_session))
        .layer(CorsLayer::permissive())
        .with_state(AppState { pipeline })
}

/// Binds `addr` and serves until the process is stopped.
pub async fn serve(pipeline: Arc<Pipeline>, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| GeoQueryError::config(format!("Failed to bind {addr}: {e}")))?;

    info!(addr, "Listening");

    axum::serve(listener, router(pipeline))
        .await
        .map_err(|e| GeoQueryError::internal(format!("Server error: {e}")))
}

async fn root() -> Json<JsonValue> {
    Json(json!({ "message": WELCOME_MESSAGE }))
}

async fn health() -> Json<JsonValue> {
    Json(json!({ "status": "ok" }))
}

async fn nl_to_map(
    State(state): State<AppState>,
    req: std::result::Result<Json<NlQueryRequest>, JsonRejection>,
) -> std::result::Result<Json<MapResponse>, ApiError> {
    let Json(req) = req
        .map_err(|rejection| GeoQueryError::validation(rejection.body_text()))?;

    let query = req.query.unwrap_or_default();
    let response = state.pipeline.run(&query).await?;
    Ok(Json(response))
}

async fn reset_session(State(state): State<AppState>) -> Json<JsonValue> {
    state.pipeline.session().reset().await;
    info!("Conversation history cleared");
    Json(json!({ "status": "reset" }))
}
