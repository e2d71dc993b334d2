//! crates/legal_analyzer_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! The server implements `DatabaseService` and `ChatCompletionService` against
//! a relational store and LLM vendors; clients implement `AnalyzerBackend`,
//! `ChatCompletionService` and `SessionStorage` against the HTTP API and local
//! disk.

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::completion::{CompletionRequest, CompletionResponse};
use crate::domain::{
    ChatMessage, ChatRole, ChatTurn, Document, Favorite, NewDocument, SessionId, StoredAnalysis,
    Task, TaskQuery,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    /// A required secret or setting is absent.
    #[error("Server configuration error - {0}")]
    Configuration(String),
    /// The upstream vendor answered with a non-success status.
    #[error("{vendor} API error ({status}): {details}")]
    Vendor {
        vendor: String,
        status: u16,
        details: String,
    },
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Server-side Ports
//=========================================================================================

/// Session-scoped storage. Every lookup is filtered by the session id, so a
/// record stored under another session reads as `NotFound`.
#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Documents ---
    async fn create_document(&self, session: SessionId, document: NewDocument)
        -> PortResult<Document>;

    async fn get_document(&self, session: SessionId, document_id: Uuid) -> PortResult<Document>;

    // --- Analyses ---
    async fn save_analysis(
        &self,
        session: SessionId,
        document_id: Uuid,
        json: Value,
    ) -> PortResult<StoredAnalysis>;

    /// The most recently saved analysis of a document.
    async fn latest_analysis(
        &self,
        session: SessionId,
        document_id: Uuid,
    ) -> PortResult<StoredAnalysis>;

    // --- Chat ---
    async fn append_chat_message(
        &self,
        session: SessionId,
        document_id: Uuid,
        role: ChatRole,
        content: &str,
    ) -> PortResult<ChatMessage>;

    /// All turns of a document's conversation in insertion order.
    async fn chat_messages(
        &self,
        session: SessionId,
        document_id: Uuid,
    ) -> PortResult<Vec<ChatMessage>>;

    // --- Favorites ---
    async fn save_favorite(&self, session: SessionId, query: &str) -> PortResult<Favorite>;

    async fn favorites(&self, session: SessionId) -> PortResult<Vec<Favorite>>;

    // --- Tasks ---
    async fn list_tasks(&self, query: TaskQuery) -> PortResult<Vec<Task>>;

    async fn create_task(&self, task: Task) -> PortResult<Task>;

    async fn get_task(&self, slug: &str) -> PortResult<Task>;

    async fn delete_task(&self, slug: &str) -> PortResult<Task>;
}

#[async_trait]
pub trait ChatCompletionService: Send + Sync {
    /// Sends a chat request and returns an OpenAI-compatible response.
    async fn complete(&self, request: &CompletionRequest) -> PortResult<CompletionResponse>;
}

//=========================================================================================
// Client-side Ports
//=========================================================================================

/// The persistence API as seen by a client already bound to one session.
#[async_trait]
pub trait AnalyzerBackend: Send + Sync {
    async fn upload_document(&self, document: &NewDocument) -> PortResult<Uuid>;

    async fn get_document(&self, document_id: Uuid) -> PortResult<Document>;

    async fn save_analysis(&self, document_id: Uuid, analysis: &Value) -> PortResult<()>;

    /// `None` when the document has never been analyzed.
    async fn get_analysis(&self, document_id: Uuid) -> PortResult<Option<Value>>;

    async fn append_chat(&self, document_id: Uuid, turn: &ChatTurn) -> PortResult<()>;

    async fn chat_history(&self, document_id: Uuid) -> PortResult<Vec<ChatMessage>>;

    async fn save_favorite(&self, query: &str) -> PortResult<()>;

    async fn favorites(&self) -> PortResult<Vec<Favorite>>;
}

/// Client-local state that survives restarts: the session id and the
/// document currently being worked on.
pub trait SessionStorage: Send {
    fn session_id(&self) -> SessionId;

    fn current_document(&self) -> Option<Uuid>;

    fn set_current_document(&mut self, document_id: Uuid) -> PortResult<()>;

    fn clear_current_document(&mut self) -> PortResult<()>;
}
