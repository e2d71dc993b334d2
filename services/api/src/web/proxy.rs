//! services/api/src/web/proxy.rs
//!
//! The OpenAI-compatible chat completion proxy. Requests are validated here,
//! handed to whichever vendor adapter the state carries, and vendor failures
//! are rendered in the proxy's own error shape.

use crate::web::state::AppState;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use legal_analyzer_core::{completion::CompletionRequest, ports::PortError};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

//=========================================================================================
// Proxy Error Rendering
//=========================================================================================

/// Every way a proxy call can fail, each with its own JSON body.
#[derive(Debug)]
pub enum ProxyError {
    BadRequest(String),
    Port(PortError),
}

impl From<PortError> for ProxyError {
    fn from(e: PortError) -> Self {
        ProxyError::Port(e)
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ProxyError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Invalid request body", "message": message }),
            ),
            ProxyError::Port(e @ PortError::Configuration(_)) => {
                error!("{}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": e.to_string() }),
                )
            }
            ProxyError::Port(PortError::Vendor {
                vendor,
                status,
                details,
            }) => (
                StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY),
                json!({
                    "error": format!("{} API error", vendor),
                    "status": status,
                    "details": details,
                }),
            ),
            ProxyError::Port(e) => {
                error!("Proxy failure: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error", "message": e.to_string() }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Parses the body, insisting on a `messages` array before the typed decode.
pub(crate) fn parse_completion_request(body: &[u8]) -> Result<CompletionRequest, ProxyError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ProxyError::BadRequest(format!("Body is not valid JSON: {}", e)))?;
    if !value.get("messages").is_some_and(Value::is_array) {
        return Err(ProxyError::BadRequest(
            "Body must contain a `messages` array".to_string(),
        ));
    }
    serde_json::from_value(value).map_err(|e| ProxyError::BadRequest(e.to_string()))
}

/// Forwards an OpenAI-style chat request to the configured vendor.
pub async fn chat_completions_handler(
    State(app_state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Value>, ProxyError> {
    info!("Proxy request received ({} bytes)", body.len());
    let request = parse_completion_request(&body).map_err(|e| {
        warn!("Rejected proxy request: {:?}", e);
        e
    })?;

    let response = app_state.llm.complete(&request).await?;
    let value = serde_json::to_value(&response)
        .map_err(|e| ProxyError::Port(PortError::Unexpected(e.to_string())))?;
    Ok(Json(value))
}

/// Any method other than POST (OPTIONS never reaches here).
pub async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "error": "Method Not Allowed" })),
    )
}
