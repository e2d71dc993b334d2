pub mod analysis;
pub mod chat;
pub mod completion;
pub mod domain;
pub mod export;
pub mod extract;
pub mod ports;
pub mod workflow;

pub use analysis::{parse_analysis, AnalysisItem, AnalysisReport, ParsedAnalysis};
pub use completion::{CompletionRequest, CompletionResponse, WireMessage};
pub use domain::{
    ChatMessage, ChatRole, ChatTurn, Document, Favorite, NewDocument, SessionId, StoredAnalysis,
    Task, TaskQuery,
};
pub use ports::{
    AnalyzerBackend, ChatCompletionService, DatabaseService, PortError, PortResult,
    SessionStorage,
};
pub use workflow::{AnalyzerWorkflow, Tab, UploadedFile, WorkflowError};
