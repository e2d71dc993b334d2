//! crates/legal_analyzer_core/src/export.rs
//!
//! Downloadable artifacts: the analysis as pretty JSON and the chat as a
//! plain-text transcript.

use crate::domain::ChatTurn;
use chrono::NaiveDate;
use serde_json::Value;

pub const TRANSCRIPT_SEPARATOR: &str = "\n\n---\n\n";

pub fn export_analysis(analysis: &Value) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(analysis)
}

pub fn analysis_file_name(date: NaiveDate) -> String {
    format!("legal-analysis-{}.json", date.format("%Y-%m-%d"))
}

/// `[ROLE] content` blocks separated by `---` lines.
pub fn export_transcript(history: &[ChatTurn]) -> String {
    history
        .iter()
        .map(|turn| format!("[{}] {}", turn.role.as_str().to_uppercase(), turn.content))
        .collect::<Vec<_>>()
        .join(TRANSCRIPT_SEPARATOR)
}

pub fn transcript_file_name(date: NaiveDate) -> String {
    format!("legal-chat-{}.txt", date.format("%Y-%m-%d"))
}
