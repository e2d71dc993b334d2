//! crates/legal_analyzer_core/src/completion.rs
//!
//! The OpenAI-compatible request and response shapes spoken by the LLM proxy,
//! plus the reshaping helpers shared by every vendor adapter.

use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_TOKENS: u32 = 1000;
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_TOP_P: f32 = 0.9;

//=========================================================================================
// Request Shapes
//=========================================================================================

/// Message content is either a bare string or a list of text parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl MessageContent {
    /// The text of the content. For part lists only the first part counts.
    pub fn text(&self) -> &str {
        match self {
            MessageContent::Text(text) => text,
            MessageContent::Parts(parts) => parts
                .first()
                .and_then(|part| part.text.as_deref())
                .unwrap_or(""),
        }
    }
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Text(String::new())
    }
}

/// One chat message as received from a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    #[serde(default)]
    pub content: MessageContent,
}

impl WireMessage {
    pub fn new(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn is_system(&self) -> bool {
        self.role == "system"
    }
}

/// A chat-style completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub messages: Vec<WireMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<WireMessage>) -> Self {
        Self {
            messages,
            max_tokens: None,
            temperature: None,
            top_p: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens_or_default(&self) -> u32 {
        self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }

    pub fn temperature_or_default(&self) -> f32 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    pub fn top_p_or_default(&self) -> f32 {
        self.top_p.unwrap_or(DEFAULT_TOP_P)
    }

    /// All system texts joined by a blank line, if any system message exists.
    pub fn system_text(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .messages
            .iter()
            .filter(|m| m.is_system())
            .map(|m| m.content.text())
            .collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.join("\n\n"))
        }
    }

    /// The non-system messages flattened to plain text.
    pub fn conversation(&self) -> Vec<PlainMessage> {
        self.messages
            .iter()
            .filter(|m| !m.is_system())
            .map(|m| PlainMessage {
                role: m.role.clone(),
                text: m.content.text().to_string(),
            })
            .collect()
    }
}

/// A flattened message with a single text body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlainMessage {
    pub role: String,
    pub text: String,
}

/// Removes system messages and prefixes their text to the first user message
/// as `"{system}\n\n{text}"`. Without a user message the first remaining
/// message receives the prefix; without any remaining message the system
/// text is dropped.
pub fn merge_system_prompt(request: &CompletionRequest) -> Vec<PlainMessage> {
    let mut messages = request.conversation();
    if let Some(system) = request.system_text() {
        let target = messages
            .iter()
            .position(|m| m.role == "user")
            .or(if messages.is_empty() { None } else { Some(0) });
        if let Some(index) = target {
            let merged = format!("{}\n\n{}", system, messages[index].text);
            messages[index].text = merged;
        }
    }
    messages
}

//=========================================================================================
// Response Shapes
//=========================================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    pub message: ResponseMessage,
    #[serde(default = "default_finish_reason")]
    pub finish_reason: String,
}

fn default_finish_reason() -> String {
    "stop".to_string()
}

/// An OpenAI-compatible completion response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: serde_json::Value,
}

impl CompletionResponse {
    /// A single assistant choice. A missing stop reason becomes `"stop"` and
    /// missing usage becomes `{}`.
    pub fn assistant(
        content: impl Into<String>,
        finish_reason: Option<String>,
        usage: Option<serde_json::Value>,
    ) -> Self {
        Self {
            choices: vec![Choice {
                index: 0,
                message: ResponseMessage {
                    role: "assistant".to_string(),
                    content: content.into(),
                },
                finish_reason: finish_reason.unwrap_or_else(default_finish_reason),
            }],
            usage: usage
                .filter(|u| !u.is_null())
                .unwrap_or_else(|| serde_json::Value::Object(Default::default())),
        }
    }

    /// The first choice's content, if there is a first choice.
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(value: serde_json::Value) -> CompletionRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn system_text_is_prefixed_to_first_user_message() {
        let req = request(json!({
            "messages": [
                {"role": "system", "content": "Be precise."},
                {"role": "user", "content": "What is clause 4?"}
            ]
        }));
        let merged = merge_system_prompt(&req);
        assert_eq!(merged.len(), 1);
        assert!(merged.iter().all(|m| m.role != "system"));
        assert_eq!(merged[0].text, "Be precise.\n\nWhat is clause 4?");
    }

    #[test]
    fn system_prefix_skips_leading_assistant_turns() {
        let req = request(json!({
            "messages": [
                {"role": "assistant", "content": "Hello"},
                {"role": "system", "content": "S"},
                {"role": "user", "content": "U"}
            ]
        }));
        let merged = merge_system_prompt(&req);
        assert_eq!(merged[0].text, "Hello");
        assert_eq!(merged[1].text, "S\n\nU");
    }

    #[test]
    fn lone_system_message_is_dropped() {
        let req = request(json!({"messages": [{"role": "system", "content": "S"}]}));
        assert!(merge_system_prompt(&req).is_empty());
    }

    #[test]
    fn part_lists_use_first_part_text() {
        let req = request(json!({
            "messages": [
                {"role": "user", "content": [{"text": "first"}, {"text": "second"}]},
                {"role": "user", "content": []}
            ]
        }));
        let conv = req.conversation();
        assert_eq!(conv[0].text, "first");
        assert_eq!(conv[1].text, "");
    }

    #[test]
    fn absent_sampling_parameters_use_defaults() {
        let req = request(json!({"messages": [], "temperature": 0.7}));
        assert_eq!(req.max_tokens_or_default(), 1000);
        assert_eq!(req.temperature_or_default(), 0.7);
        assert_eq!(req.top_p_or_default(), 0.9);
    }

    #[test]
    fn assistant_response_fills_missing_fields() {
        let resp = CompletionResponse::assistant("", None, None);
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["choices"][0]["message"]["content"], "");
        assert_eq!(value["choices"][0]["message"]["role"], "assistant");
        assert_eq!(value["choices"][0]["finish_reason"], "stop");
        assert_eq!(value["usage"], json!({}));
    }
}
