//! crates/legal_analyzer_core/src/workflow.rs
//!
//! The analyzer controller: upload → extract → persist → analyze → chat.
//!
//! Each public operation is a sequential pipeline of fallible steps. A failed
//! step ends the operation with a [`WorkflowError`] that is also kept as the
//! controller's `last_error`, so a front end has one place to show it.
//! Persisting analyses and chat turns is best-effort: failures there are
//! logged and never interrupt the flow.

use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::{analysis_prompt, parse_analysis, AnalysisError, ParsedAnalysis};
use crate::chat::{
    build_chat_request, regenerate_target, CHAT_FAILURE_REPLY, EMPTY_REPLY_FALLBACK,
    NO_DOCUMENT_REPLY,
};
use crate::completion::{CompletionRequest, WireMessage};
use crate::domain::{ChatTurn, Favorite, NewDocument, SessionId};
use crate::export::{export_analysis, export_transcript};
use crate::extract::{extract_text, ExtractError, FileKind};
use crate::ports::{AnalyzerBackend, ChatCompletionService, PortError, SessionStorage};

pub const ANALYSIS_MAX_TOKENS: u32 = 4000;
pub const ANALYSIS_TEMPERATURE: f32 = 0.2;

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Rejected before any network call.
    #[error("{0}")]
    Input(String),
    #[error(transparent)]
    Extraction(#[from] ExtractError),
    #[error("Error reading or saving file: {0}")]
    Upload(PortError),
    #[error("Analysis failed: {0}")]
    Vendor(PortError),
    #[error("Analysis failed: {0}")]
    Parse(#[from] AnalysisError),
    #[error("Request failed: {0}")]
    Backend(PortError),
    #[error("Could not update local session: {0}")]
    Storage(PortError),
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// The three views of the analyzer. Transitions are user driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Upload,
    Results,
    Chat,
}

/// A file as handed over by the user.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// The document the controller is currently working on.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveDocument {
    pub id: Uuid,
    pub text: String,
    pub file_name: String,
}

pub struct AnalyzerWorkflow<B, L, S> {
    backend: B,
    llm: L,
    storage: S,
    document: Option<ActiveDocument>,
    analysis: Option<ParsedAnalysis>,
    history: Vec<ChatTurn>,
    tab: Tab,
    last_error: Option<String>,
}

impl<B, L, S> AnalyzerWorkflow<B, L, S>
where
    B: AnalyzerBackend,
    L: ChatCompletionService,
    S: SessionStorage,
{
    pub fn new(backend: B, llm: L, storage: S) -> Self {
        Self {
            backend,
            llm,
            storage,
            document: None,
            analysis: None,
            history: Vec::new(),
            tab: Tab::Upload,
            last_error: None,
        }
    }

    //=====================================================================================
    // Accessors
    //=====================================================================================

    pub fn session_id(&self) -> SessionId {
        self.storage.session_id()
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn document(&self) -> Option<&ActiveDocument> {
        self.document.as_ref()
    }

    pub fn analysis(&self) -> Option<&ParsedAnalysis> {
        self.analysis.as_ref()
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Switches view. Results needs an analysis and Chat needs a document;
    /// returns whether the switch happened.
    pub fn select_tab(&mut self, tab: Tab) -> bool {
        let allowed = match tab {
            Tab::Upload => true,
            Tab::Results => self.analysis.is_some(),
            Tab::Chat => self.document.is_some(),
        };
        if allowed {
            self.tab = tab;
        }
        allowed
    }

    fn note<T>(&mut self, result: WorkflowResult<T>) -> WorkflowResult<T> {
        match &result {
            Ok(_) => self.last_error = None,
            Err(e) => self.last_error = Some(e.to_string()),
        }
        result
    }

    //=====================================================================================
    // Session Resume
    //=====================================================================================

    /// Reloads the stored current document with its analysis and chat.
    ///
    /// Returns `false` when there is nothing to resume. A missing analysis or
    /// chat is treated as empty, since an earlier run may have stopped
    /// between steps.
    pub async fn resume(&mut self) -> bool {
        let Some(document_id) = self.storage.current_document() else {
            return false;
        };

        let document = match self.backend.get_document(document_id).await {
            Ok(document) => document,
            Err(e) => {
                warn!("Failed to load document {}: {}", document_id, e);
                return false;
            }
        };
        self.document = Some(ActiveDocument {
            id: document.id,
            text: document.text,
            file_name: document.file_name,
        });

        self.analysis = match self.backend.get_analysis(document_id).await {
            Ok(Some(raw)) => ParsedAnalysis::from_value(raw)
                .map_err(|e| warn!("Stored analysis for {} is unusable: {}", document_id, e))
                .ok(),
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to load analysis for {}: {}", document_id, e);
                None
            }
        };

        self.history = match self.backend.chat_history(document_id).await {
            Ok(messages) => messages.into_iter().map(ChatTurn::from).collect(),
            Err(e) => {
                warn!("Failed to load chat for {}: {}", document_id, e);
                Vec::new()
            }
        };

        self.tab = Tab::Chat;
        info!("Resumed document {} ({} chat turns)", document_id, self.history.len());
        true
    }

    //=====================================================================================
    // Upload
    //=====================================================================================

    /// Extracts the file's text, stores it and makes it the current document.
    pub async fn upload(&mut self, file: UploadedFile) -> WorkflowResult<Uuid> {
        let result = self.upload_steps(file).await;
        self.note(result)
    }

    async fn upload_steps(&mut self, file: UploadedFile) -> WorkflowResult<Uuid> {
        let kind = FileKind::detect(&file.file_name, file.content_type.as_deref())
            .ok_or(WorkflowError::Extraction(ExtractError::UnsupportedFileType))?;
        let text = extract_text(kind, file.bytes)?;

        let new_document = NewDocument {
            text: text.clone(),
            file_name: file.file_name.clone(),
            file_type: kind.mime().to_string(),
        };
        let document_id = self
            .backend
            .upload_document(&new_document)
            .await
            .map_err(WorkflowError::Upload)?;

        self.document = Some(ActiveDocument {
            id: document_id,
            text,
            file_name: file.file_name,
        });
        self.analysis = None;
        self.history.clear();
        self.storage
            .set_current_document(document_id)
            .map_err(WorkflowError::Storage)?;

        info!("Uploaded document {}", document_id);
        Ok(document_id)
    }

    //=====================================================================================
    // Analyze
    //=====================================================================================

    /// Asks the model for the structured analysis of the current document.
    pub async fn analyze(&mut self) -> WorkflowResult<()> {
        let result = self.analyze_steps().await;
        self.note(result)
    }

    async fn analyze_steps(&mut self) -> WorkflowResult<()> {
        let document = self
            .document
            .as_ref()
            .filter(|d| !d.text.is_empty())
            .ok_or_else(|| WorkflowError::Input("No document to analyze.".to_string()))?;
        let document_id = document.id;

        let request = CompletionRequest::new(vec![WireMessage::new(
            "user",
            analysis_prompt(&document.text),
        )])
        .with_max_tokens(ANALYSIS_MAX_TOKENS)
        .with_temperature(ANALYSIS_TEMPERATURE);

        self.analysis = None;
        let response = self.llm.complete(&request).await.map_err(WorkflowError::Vendor)?;
        let parsed = parse_analysis(response.first_content().unwrap_or(""))?;

        if let Err(e) = self.backend.save_analysis(document_id, &parsed.raw).await {
            warn!("Failed to persist analysis for {}: {}", document_id, e);
        }
        self.analysis = Some(parsed);
        self.tab = Tab::Results;
        Ok(())
    }

    //=====================================================================================
    // Chat
    //=====================================================================================

    /// Sends one user message. Vendor failures become an apology turn rather
    /// than an error.
    pub async fn send_chat(&mut self, message: &str) -> WorkflowResult<()> {
        let result = self.chat_steps(message).await;
        self.note(result)
    }

    async fn chat_steps(&mut self, message: &str) -> WorkflowResult<()> {
        let message = message.trim();
        if message.is_empty() {
            return Err(WorkflowError::Input("Message cannot be empty.".to_string()));
        }

        let Some(document) = self.document.clone() else {
            self.history.push(ChatTurn::user(message));
            self.history.push(ChatTurn::assistant(NO_DOCUMENT_REPLY));
            return Ok(());
        };

        let user_turn = ChatTurn::user(message);
        self.persist_turn(document.id, &user_turn).await;
        let summary = self
            .analysis
            .as_ref()
            .and_then(|a| a.report.summary.clone());
        let request = build_chat_request(&self.history, message, &document.text, summary.as_deref());
        self.history.push(user_turn);

        match self.llm.complete(&request).await {
            Ok(response) => {
                let reply = response
                    .first_content()
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or(EMPTY_REPLY_FALLBACK)
                    .to_string();
                let turn = ChatTurn::assistant(reply);
                self.persist_turn(document.id, &turn).await;
                self.history.push(turn);
            }
            Err(e) => {
                warn!("Chat completion failed: {}", e);
                self.history.push(ChatTurn::assistant(CHAT_FAILURE_REPLY));
            }
        }
        Ok(())
    }

    async fn persist_turn(&self, document_id: Uuid, turn: &ChatTurn) {
        if let Err(e) = self.backend.append_chat(document_id, turn).await {
            warn!("Failed to persist {} turn for {}: {}", turn.role, document_id, e);
        }
    }

    /// Replaces the assistant turn at `index` with a fresh answer to the user
    /// turn before it. The user turn is resubmitted as a new turn.
    ///
    /// Returns `false` without touching anything unless `index` is an
    /// assistant turn answering the user turn before it.
    pub async fn regenerate(&mut self, index: usize) -> WorkflowResult<bool> {
        let Some(question) = regenerate_target(&self.history, index).map(str::to_owned) else {
            return Ok(false);
        };
        self.history.drain(index - 1..=index);
        self.send_chat(&question).await?;
        Ok(true)
    }

    //=====================================================================================
    // Favorites, Export and Reset
    //=====================================================================================

    pub async fn save_favorite(&mut self, query: &str) -> WorkflowResult<()> {
        let query = query.trim();
        let result = if query.is_empty() {
            Err(WorkflowError::Input("Favorite query cannot be empty.".to_string()))
        } else {
            self.backend
                .save_favorite(query)
                .await
                .map_err(WorkflowError::Backend)
        };
        self.note(result)
    }

    pub async fn favorites(&mut self) -> WorkflowResult<Vec<Favorite>> {
        let result = self.backend.favorites().await.map_err(WorkflowError::Backend);
        self.note(result)
    }

    /// The raw analysis as pretty JSON, if there is one.
    pub fn export_analysis(&self) -> Option<String> {
        let raw: &Value = &self.analysis.as_ref()?.raw;
        export_analysis(raw).ok()
    }

    pub fn export_transcript(&self) -> String {
        export_transcript(&self.history)
    }

    /// Forgets the current document and returns to the upload view.
    pub fn reset(&mut self) -> WorkflowResult<()> {
        self.document = None;
        self.analysis = None;
        self.history.clear();
        self.tab = Tab::Upload;
        let result = self
            .storage
            .clear_current_document()
            .map_err(WorkflowError::Storage);
        self.note(result)
    }
}
