//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use legal_analyzer_core::ports::{ChatCompletionService, DatabaseService};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub llm: Arc<dyn ChatCompletionService>,
    pub config: Arc<Config>,
}
