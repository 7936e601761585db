//! HTTP front door

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use scholar_core::composer::{ResearchAssistant, ResearchResponse};
use scholar_core::error::{ErrorKind, ScholarError};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub assistant: Arc<ResearchAssistant>,
}

/// `POST /query` body
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: ErrorKind,
    message: String,
}

/// Error response: `{"error": {"kind", "message"}}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn invalid_query(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody {
                kind: ErrorKind::InvalidQuery,
                message: message.into(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.body }))).into_response()
    }
}

impl From<ScholarError> for ApiError {
    fn from(err: ScholarError) -> Self {
        let status = match err.kind() {
            ErrorKind::InvalidQuery => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            body: ErrorBody {
                kind: err.kind(),
                message: err.detail(),
            },
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid_query(rejection.body_text())
    }
}

/// Build the router with permissive CORS and request tracing
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/query", post(query))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn query(
    State(state): State<AppState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ResearchResponse>), ApiError> {
    let Json(request) = payload?;

    let outcome = state
        .assistant
        .ask(&request.query, request.session_id.as_deref())
        .await?;

    let status = if outcome.is_success() {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };
    Ok((status, Json(outcome.into_response())))
}
