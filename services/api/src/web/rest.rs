//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the session-scoped persistence endpoints and
//! the master definition for the OpenAPI specification.

use crate::error::HttpError;
use crate::web::{extract, state::AppState, tasks};
use axum::{
    extract::{rejection::JsonRejection, FromRequestParts, Path, Query, State},
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use legal_analyzer_core::domain::{
    ChatMessage, ChatRole, Document, Favorite, NewDocument, SessionId, StoredAnalysis,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        upload_document_handler,
        get_document_handler,
        save_analysis_handler,
        get_analysis_handler,
        append_chat_handler,
        chat_history_handler,
        save_favorite_handler,
        list_favorites_handler,
        health_handler,
        tasks::list_tasks_handler,
        tasks::create_task_handler,
        tasks::get_task_handler,
        tasks::delete_task_handler,
        extract::extract_handler,
    ),
    components(
        schemas(
            UploadDocumentRequest, DocumentResponse, SaveAnalysisRequest, AnalysisResponse,
            AppendChatRequest, ChatMessageResponse, SaveFavoriteRequest, FavoriteResponse,
            tasks::TaskBody, extract::ExtractResponse,
        )
    ),
    tags(
        (name = "Legal Analyzer API", description = "Session-scoped persistence, task scaffold and text extraction.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Session Extraction
//=========================================================================================

#[derive(Deserialize)]
struct SessionParams {
    session_id: Option<String>,
}

/// The `?session_id=` every persistence route requires.
pub struct Session(pub SessionId);

impl<S: Send + Sync> FromRequestParts<S> for Session {
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(params) = Query::<SessionParams>::try_from_uri(&parts.uri)
            .map_err(|e| HttpError::bad_request(e.body_text()))?;
        let raw = params
            .session_id
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| HttpError::bad_request("session_id query parameter is required"))?;
        let session = raw
            .trim()
            .parse::<SessionId>()
            .map_err(|_| HttpError::bad_request("session_id must be a UUID"))?;
        Ok(Session(session))
    }
}

impl From<JsonRejection> for HttpError {
    fn from(rejection: JsonRejection) -> Self {
        HttpError::new(rejection.status(), rejection.body_text())
    }
}

fn parse_id(raw: &str, what: &str) -> Result<Uuid, HttpError> {
    Uuid::parse_str(raw).map_err(|_| HttpError::bad_request(format!("Invalid {} id", what)))
}

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct UploadDocumentRequest {
    text: String,
    file_name: String,
    #[serde(default)]
    file_type: String,
}

#[derive(Serialize, ToSchema)]
pub struct DocumentResponse {
    id: Uuid,
    text: String,
    file_name: String,
    file_type: String,
    created_at: DateTime<Utc>,
}

impl From<Document> for DocumentResponse {
    fn from(d: Document) -> Self {
        Self {
            id: d.id,
            text: d.text,
            file_name: d.file_name,
            file_type: d.file_type,
            created_at: d.created_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct SaveAnalysisRequest {
    document_id: Uuid,
    /// Stored verbatim.
    analysis: Value,
}

/// The latest analysis of a document. `json_` holds the stored value.
#[derive(Serialize, ToSchema)]
pub struct AnalysisResponse {
    document_id: Uuid,
    json_: Value,
    created_at: DateTime<Utc>,
}

impl From<StoredAnalysis> for AnalysisResponse {
    fn from(a: StoredAnalysis) -> Self {
        Self {
            document_id: a.document_id,
            json_: a.json,
            created_at: a.created_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct AppendChatRequest {
    document_id: Uuid,
    role: String,
    content: String,
}

#[derive(Serialize, ToSchema)]
pub struct ChatMessageResponse {
    id: Uuid,
    document_id: Uuid,
    role: String,
    content: String,
    created_at: DateTime<Utc>,
}

impl From<ChatMessage> for ChatMessageResponse {
    fn from(m: ChatMessage) -> Self {
        Self {
            id: m.id,
            document_id: m.document_id,
            role: m.role.to_string(),
            content: m.content,
            created_at: m.created_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct SaveFavoriteRequest {
    query: String,
}

#[derive(Serialize, ToSchema)]
pub struct FavoriteResponse {
    id: Uuid,
    query: String,
    created_at: DateTime<Utc>,
}

impl From<Favorite> for FavoriteResponse {
    fn from(f: Favorite) -> Self {
        Self {
            id: f.id,
            query: f.query,
            created_at: f.created_at,
        }
    }
}

//=========================================================================================
// Document Handlers
//=========================================================================================

/// Store the extracted text of an uploaded file.
#[utoipa::path(
    post,
    path = "/upload-document",
    request_body = UploadDocumentRequest,
    params(("session_id" = Uuid, Query, description = "Client-generated session id.")),
    responses(
        (status = 201, description = "Document stored"),
        (status = 400, description = "Missing session id or malformed body")
    )
)]
pub async fn upload_document_handler(
    State(app_state): State<Arc<AppState>>,
    Session(session): Session,
    payload: Result<Json<UploadDocumentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let Json(payload) = payload?;
    let document = app_state
        .db
        .create_document(
            session,
            NewDocument {
                text: payload.text,
                file_name: payload.file_name,
                file_type: payload.file_type,
            },
        )
        .await?;
    info!("Stored document {} for session {}", document.id, session);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "ok": true, "document_id": document.id })),
    ))
}

#[utoipa::path(
    get,
    path = "/document/{id}",
    params(
        ("id" = Uuid, Path, description = "Document id."),
        ("session_id" = Uuid, Query, description = "Client-generated session id.")
    ),
    responses(
        (status = 200, description = "The document", body = DocumentResponse),
        (status = 404, description = "No such document in this session")
    )
)]
pub async fn get_document_handler(
    State(app_state): State<Arc<AppState>>,
    Session(session): Session,
    Path(id): Path<String>,
) -> Result<Json<DocumentResponse>, HttpError> {
    let id = parse_id(&id, "document")?;
    let document = app_state.db.get_document(session, id).await?;
    Ok(Json(document.into()))
}

//=========================================================================================
// Analysis Handlers
//=========================================================================================

#[utoipa::path(
    post,
    path = "/analyze",
    request_body = SaveAnalysisRequest,
    params(("session_id" = Uuid, Query, description = "Client-generated session id.")),
    responses(
        (status = 201, description = "Analysis stored"),
        (status = 404, description = "No such document in this session")
    )
)]
pub async fn save_analysis_handler(
    State(app_state): State<Arc<AppState>>,
    Session(session): Session,
    payload: Result<Json<SaveAnalysisRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let Json(payload) = payload?;
    let stored = app_state
        .db
        .save_analysis(session, payload.document_id, payload.analysis)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "ok": true, "analysis_id": stored.id })),
    ))
}

/// The most recently stored analysis of a document.
#[utoipa::path(
    get,
    path = "/analysis/{id}",
    params(
        ("id" = Uuid, Path, description = "Document id."),
        ("session_id" = Uuid, Query, description = "Client-generated session id.")
    ),
    responses(
        (status = 200, description = "Latest analysis", body = AnalysisResponse),
        (status = 404, description = "Document never analyzed")
    )
)]
pub async fn get_analysis_handler(
    State(app_state): State<Arc<AppState>>,
    Session(session): Session,
    Path(id): Path<String>,
) -> Result<Json<AnalysisResponse>, HttpError> {
    let id = parse_id(&id, "document")?;
    let analysis = app_state.db.latest_analysis(session, id).await?;
    Ok(Json(analysis.into()))
}

//=========================================================================================
// Chat Handlers
//=========================================================================================

#[utoipa::path(
    post,
    path = "/chat",
    request_body = AppendChatRequest,
    params(("session_id" = Uuid, Query, description = "Client-generated session id.")),
    responses(
        (status = 201, description = "Turn stored"),
        (status = 400, description = "Role is not user or assistant"),
        (status = 404, description = "No such document in this session")
    )
)]
pub async fn append_chat_handler(
    State(app_state): State<Arc<AppState>>,
    Session(session): Session,
    payload: Result<Json<AppendChatRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let Json(payload) = payload?;
    let role = payload
        .role
        .parse::<ChatRole>()
        .map_err(HttpError::bad_request)?;
    let message = app_state
        .db
        .append_chat_message(session, payload.document_id, role, &payload.content)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "ok": true, "message_id": message.id })),
    ))
}

/// Every turn of a document's conversation in the order it was stored.
#[utoipa::path(
    get,
    path = "/chat/{id}",
    params(
        ("id" = Uuid, Path, description = "Document id."),
        ("session_id" = Uuid, Query, description = "Client-generated session id.")
    ),
    responses((status = 200, description = "Chat turns", body = [ChatMessageResponse]))
)]
pub async fn chat_history_handler(
    State(app_state): State<Arc<AppState>>,
    Session(session): Session,
    Path(id): Path<String>,
) -> Result<Json<Vec<ChatMessageResponse>>, HttpError> {
    let id = parse_id(&id, "document")?;
    let messages = app_state.db.chat_messages(session, id).await?;
    Ok(Json(messages.into_iter().map(Into::into).collect()))
}

//=========================================================================================
// Favorite Handlers
//=========================================================================================

#[utoipa::path(
    post,
    path = "/favorite",
    request_body = SaveFavoriteRequest,
    params(("session_id" = Uuid, Query, description = "Client-generated session id.")),
    responses(
        (status = 201, description = "Favorite stored"),
        (status = 400, description = "Empty query")
    )
)]
pub async fn save_favorite_handler(
    State(app_state): State<Arc<AppState>>,
    Session(session): Session,
    payload: Result<Json<SaveFavoriteRequest>, JsonRejection>,
) -> Result<impl IntoResponse, HttpError> {
    let Json(payload) = payload?;
    if payload.query.trim().is_empty() {
        return Err(HttpError::bad_request("query must not be empty"));
    }
    let favorite = app_state.db.save_favorite(session, &payload.query).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "ok": true, "favorite_id": favorite.id })),
    ))
}

/// Saved queries, newest first.
#[utoipa::path(
    get,
    path = "/favorites",
    params(("session_id" = Uuid, Query, description = "Client-generated session id.")),
    responses((status = 200, description = "Favorites", body = [FavoriteResponse]))
)]
pub async fn list_favorites_handler(
    State(app_state): State<Arc<AppState>>,
    Session(session): Session,
) -> Result<Json<Vec<FavoriteResponse>>, HttpError> {
    let favorites = app_state.db.favorites(session).await?;
    Ok(Json(favorites.into_iter().map(Into::into).collect()))
}

#[utoipa::path(get, path = "/health", responses((status = 200, description = "Service is up")))]
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "ok": true }))
}

/// Serves the generated OpenAPI document.
pub async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
