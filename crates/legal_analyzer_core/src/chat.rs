//! crates/legal_analyzer_core/src/chat.rs
//!
//! Builds chat requests about a document and decides what a regenerate
//! request resubmits.

use crate::completion::{CompletionRequest, WireMessage};
use crate::domain::{ChatRole, ChatTurn};

/// Characters of document text embedded in the chat system prompt.
pub const DOCUMENT_CONTEXT_LIMIT: usize = 8000;
pub const TRUNCATION_MARKER: &str = "\n\n[Document truncated...]";

pub const CHAT_MAX_TOKENS: u32 = 1500;
pub const CHAT_TEMPERATURE: f32 = 0.3;

pub const NO_DOCUMENT_REPLY: &str = "Please upload and analyze a document first.";
pub const CHAT_FAILURE_REPLY: &str = "Sorry, I had an issue. Please try again.";
pub const EMPTY_REPLY_FALLBACK: &str = "I couldn't process that request.";

const SYSTEM_INSTRUCTIONS: &str = "You are an expert legal assistant helping a user understand a legal document. \
Answer questions using the document below. Quote or cite the relevant clause when you can, \
say plainly when the document does not address a question, and do not invent terms. \
You are not a substitute for a licensed attorney; flag issues that need one.";

/// The document text, cut to [`DOCUMENT_CONTEXT_LIMIT`] characters with a
/// marker appended when anything was removed.
pub fn truncate_document(text: &str) -> String {
    match text.char_indices().nth(DOCUMENT_CONTEXT_LIMIT) {
        Some((cut, _)) => format!("{}{}", &text[..cut], TRUNCATION_MARKER),
        None => text.to_string(),
    }
}

pub fn chat_system_prompt(document_text: &str, summary: Option<&str>) -> String {
    let mut prompt = format!(
        "{}\n\nDOCUMENT:\n{}",
        SYSTEM_INSTRUCTIONS,
        truncate_document(document_text)
    );
    if let Some(summary) = summary.filter(|s| !s.trim().is_empty()) {
        prompt.push_str("\n\nANALYSIS SUMMARY:\n");
        prompt.push_str(summary);
    }
    prompt
}

/// The full request for one chat submission: system prompt, every prior
/// turn, then the new user message.
pub fn build_chat_request(
    history: &[ChatTurn],
    user_message: &str,
    document_text: &str,
    summary: Option<&str>,
) -> CompletionRequest {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(WireMessage::new(
        "system",
        chat_system_prompt(document_text, summary),
    ));
    messages.extend(
        history
            .iter()
            .map(|turn| WireMessage::new(turn.role.as_str(), turn.content.clone())),
    );
    messages.push(WireMessage::new("user", user_message));

    CompletionRequest::new(messages)
        .with_max_tokens(CHAT_MAX_TOKENS)
        .with_temperature(CHAT_TEMPERATURE)
}

/// The user message to resubmit when regenerating the turn at `index`.
///
/// `None` unless `index` names an assistant turn directly preceded by a user
/// turn.
pub fn regenerate_target(history: &[ChatTurn], index: usize) -> Option<&str> {
    if index == 0 || index >= history.len() {
        return None;
    }
    if history[index].role != ChatRole::Assistant {
        return None;
    }
    let previous = &history[index - 1];
    (previous.role == ChatRole::User).then_some(previous.content.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_documents_are_embedded_whole() {
        assert_eq!(truncate_document("short"), "short");
        let exact = "a".repeat(DOCUMENT_CONTEXT_LIMIT);
        assert_eq!(truncate_document(&exact), exact);
    }

    #[test]
    fn long_documents_are_cut_at_the_limit() {
        let long = "é".repeat(DOCUMENT_CONTEXT_LIMIT + 10);
        let cut = truncate_document(&long);
        assert!(cut.ends_with(TRUNCATION_MARKER));
        let body = cut.strip_suffix(TRUNCATION_MARKER).unwrap();
        assert_eq!(body.chars().count(), DOCUMENT_CONTEXT_LIMIT);
    }

    #[test]
    fn summary_is_included_when_present() {
        let with = chat_system_prompt("Doc", Some("A lease."));
        assert!(with.contains("ANALYSIS SUMMARY:\nA lease."));
        let without = chat_system_prompt("Doc", Some("  "));
        assert!(!without.contains("ANALYSIS SUMMARY"));
    }

    #[test]
    fn chat_request_carries_history_in_order() {
        let history = vec![ChatTurn::user("Q1"), ChatTurn::assistant("A1")];
        let req = build_chat_request(&history, "Q2", "Doc", None);
        let roles: Vec<&str> = req.messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, ["system", "user", "assistant", "user"]);
        assert_eq!(req.messages[3].content.text(), "Q2");
        assert_eq!(req.max_tokens, Some(CHAT_MAX_TOKENS));
        assert_eq!(req.temperature, Some(CHAT_TEMPERATURE));
    }

    #[test]
    fn regenerate_requires_a_preceding_user_turn() {
        let lone = vec![ChatTurn::assistant("x")];
        assert_eq!(regenerate_target(&lone, 0), None);

        let pair = vec![ChatTurn::user("q"), ChatTurn::assistant("a")];
        assert_eq!(regenerate_target(&pair, 1), Some("q"));
        assert_eq!(regenerate_target(&pair, 2), None);

        let two_bots = vec![ChatTurn::assistant("a"), ChatTurn::assistant("b")];
        assert_eq!(regenerate_target(&two_bots, 1), None);
    }

    #[test]
    fn regenerate_refuses_a_user_turn() {
        let unanswered = vec![ChatTurn::user("q1"), ChatTurn::user("q2")];
        assert_eq!(regenerate_target(&unanswered, 1), None);
    }
}
