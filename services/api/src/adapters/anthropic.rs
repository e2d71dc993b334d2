//! services/api/src/adapters/anthropic.rs
//!
//! This module contains the adapter for Anthropic's Messages API.
//! Unlike the Converse and Workers AI adapters, system text travels in the
//! top-level `system` field instead of being merged into a user turn.

use crate::adapters::post_json;
use crate::config::AnthropicSettings;
use async_trait::async_trait;
use legal_analyzer_core::{
    completion::{CompletionRequest, CompletionResponse},
    ports::{ChatCompletionService, PortError, PortResult},
};
use serde_json::{json, Value};
use tracing::info;

const VENDOR: &str = "Anthropic";
const API_VERSION: &str = "2023-06-01";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

#[derive(Clone)]
pub struct AnthropicAdapter {
    http: reqwest::Client,
    settings: AnthropicSettings,
}

impl AnthropicAdapter {
    pub fn new(http: reqwest::Client, settings: AnthropicSettings) -> Self {
        Self { http, settings }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.settings.base_url.trim_end_matches('/'))
    }
}

//=========================================================================================
// Payload Translation
//=========================================================================================

pub(crate) fn messages_payload(model: &str, request: &CompletionRequest) -> Value {
    let messages: Vec<Value> = request
        .conversation()
        .into_iter()
        .map(|m| json!({ "role": m.role, "content": m.text }))
        .collect();

    let mut payload = json!({
        "model": model,
        "messages": messages,
        "max_tokens": request.max_tokens_or_default(),
        "temperature": request.temperature_or_default(),
        "top_p": request.top_p_or_default(),
    });
    if let Some(system) = request.system_text() {
        payload["system"] = Value::String(system);
    }
    payload
}

pub(crate) fn completion_from_messages(reply: &Value) -> CompletionResponse {
    let content = reply
        .pointer("/content/0/text")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let finish_reason = reply
        .get("stop_reason")
        .and_then(Value::as_str)
        .map(str::to_string);
    CompletionResponse::assistant(content, finish_reason, reply.get("usage").cloned())
}

//=========================================================================================
// `ChatCompletionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ChatCompletionService for AnthropicAdapter {
    async fn complete(&self, request: &CompletionRequest) -> PortResult<CompletionResponse> {
        let api_key = self.settings.api_key.as_deref().ok_or_else(|| {
            PortError::Configuration("Missing Anthropic API key".to_string())
        })?;

        info!("Calling {} model {}", VENDOR, self.settings.model);
        let payload = messages_payload(&self.settings.model, request);
        let builder = self
            .http
            .post(self.endpoint())
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION);

        let reply = post_json(VENDOR, builder, &payload).await?;
        Ok(completion_from_messages(&reply))
    }
}
