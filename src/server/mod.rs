//! HTTP surface for the stage controller

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::controller::{Stage, StageController, StageRequest};
use crate::error::{Error, Result};

/// Error body returned with every non-success status.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    details: ErrorDetails,
}

#[derive(Debug, Serialize)]
struct ErrorDetails {
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    excerpt: Option<String>,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        if status.is_server_error() {
            error!(code = self.code(), error = %self, "stage failed");
        } else {
            warn!(code = self.code(), error = %self, "rejected request");
        }

        let excerpt = match &self {
            Error::Parse { excerpt, .. } => Some(excerpt.clone()),
            _ => None,
        };
        let body = ErrorBody {
            error: self.to_string(),
            details: ErrorDetails {
                code: self.code(),
                excerpt,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct StageQuery {
    stage: Option<String>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Build the router. Preflight requests are answered by the CORS layer.
pub fn router(controller: Arc<StageController>) -> Router {
    Router::new()
        .route("/api/workshop", post(run_stage))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(controller)
}

/// Bind `addr` and serve until the process is stopped.
pub async fn serve(controller: Arc<StageController>, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Starting workshop server on {}", listener.local_addr()?);
    axum::serve(listener, router(controller)).await?;
    Ok(())
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// An empty body is treated as an empty request so stage validation can name
/// the missing field.
fn parse_body(body: &[u8]) -> Result<StageRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(StageRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| Error::InvalidRequest(e.to_string()))
}

async fn run_stage(
    State(controller): State<Arc<StageController>>,
    Query(query): Query<StageQuery>,
    body: Bytes,
) -> Response {
    let stage = match query
        .stage
        .as_deref()
        .ok_or(Error::MissingField("stage"))
        .and_then(str::parse::<Stage>)
    {
        Ok(stage) => stage,
        Err(e) => return e.into_response(),
    };
    let request = match parse_body(&body) {
        Ok(request) => request,
        Err(e) => return e.into_response(),
    };

    match controller.dispatch(stage, request).await {
        Ok(envelope) => (StatusCode::OK, Json(envelope)).into_response(),
        Err(e) => e.into_response(),
    }
}
