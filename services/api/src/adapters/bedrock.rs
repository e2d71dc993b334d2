//! services/api/src/adapters/bedrock.rs
//!
//! This module contains the adapter for AWS Bedrock's Converse API.
//! It implements the `ChatCompletionService` port from the `core` crate,
//! translating OpenAI-style requests into Converse payloads and back.

use crate::adapters::post_json;
use crate::config::BedrockSettings;
use async_trait::async_trait;
use legal_analyzer_core::{
    completion::{merge_system_prompt, CompletionRequest, CompletionResponse},
    ports::{ChatCompletionService, PortError, PortResult},
};
use serde_json::{json, Value};
use tracing::info;

const VENDOR: &str = "Bedrock";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ChatCompletionService` on top of Bedrock Converse.
#[derive(Clone)]
pub struct BedrockAdapter {
    http: reqwest::Client,
    settings: BedrockSettings,
    base_url: Option<String>,
}

impl BedrockAdapter {
    pub fn new(http: reqwest::Client, settings: BedrockSettings) -> Self {
        Self {
            http,
            settings,
            base_url: None,
        }
    }

    /// Points the adapter at a different host than the regional runtime endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    fn endpoint(&self) -> String {
        let base = self.base_url.clone().unwrap_or_else(|| {
            format!("https://bedrock-runtime.{}.amazonaws.com", self.settings.region)
        });
        format!(
            "{}/model/{}/converse",
            base.trim_end_matches('/'),
            self.settings.model_id
        )
    }
}

//=========================================================================================
// Payload Translation
//=========================================================================================

/// Builds the Converse body. System text is folded into the first user turn.
pub(crate) fn converse_payload(model_id: &str, request: &CompletionRequest) -> Value {
    let messages: Vec<Value> = merge_system_prompt(request)
        .into_iter()
        .map(|m| json!({ "role": m.role, "content": [{ "text": m.text }] }))
        .collect();

    json!({
        "modelId": model_id,
        "messages": messages,
        "inferenceConfig": {
            "maxTokens": request.max_tokens_or_default(),
            "temperature": request.temperature_or_default(),
            "topP": request.top_p_or_default(),
        }
    })
}

/// Reads `output.message.content[0].text`, `stopReason` and `usage`.
pub(crate) fn completion_from_converse(reply: &Value) -> CompletionResponse {
    let content = reply
        .pointer("/output/message/content/0/text")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let finish_reason = reply
        .get("stopReason")
        .and_then(Value::as_str)
        .map(str::to_string);
    CompletionResponse::assistant(content, finish_reason, reply.get("usage").cloned())
}

//=========================================================================================
// `ChatCompletionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ChatCompletionService for BedrockAdapter {
    async fn complete(&self, request: &CompletionRequest) -> PortResult<CompletionResponse> {
        let api_key = self.settings.api_key.as_deref().ok_or_else(|| {
            PortError::Configuration("Missing AWS Bedrock API key".to_string())
        })?;

        let url = self.endpoint();
        info!("Calling {} at {}", VENDOR, url);
        let payload = converse_payload(&self.settings.model_id, request);

        let reply = post_json(VENDOR, self.http.post(&url).bearer_auth(api_key), &payload).await?;
        Ok(completion_from_converse(&reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::fake_vendor;
    use axum::http::StatusCode;

    fn settings(api_key: Option<&str>) -> BedrockSettings {
        BedrockSettings {
            api_key: api_key.map(str::to_string),
            region: "eu-west-1".to_string(),
            model_id: "amazon.nova-lite-v1:0".to_string(),
        }
    }

    fn request(value: Value) -> CompletionRequest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn endpoint_uses_region_and_model() {
        let adapter = BedrockAdapter::new(reqwest::Client::new(), settings(Some("k")));
        assert_eq!(
            adapter.endpoint(),
            "https://bedrock-runtime.eu-west-1.amazonaws.com/model/amazon.nova-lite-v1:0/converse"
        );
    }

    #[test]
    fn payload_merges_system_text_and_fills_defaults() {
        let req = request(json!({
            "messages": [
                {"role": "system", "content": "Be precise."},
                {"role": "user", "content": "Summarise."}
            ],
            "max_tokens": 4000
        }));
        let payload = converse_payload("m", &req);
        assert_eq!(payload["messages"].as_array().unwrap().len(), 1);
        assert_eq!(payload["messages"][0]["role"], "user");
        assert_eq!(
            payload["messages"][0]["content"][0]["text"],
            "Be precise.\n\nSummarise."
        );
        assert_eq!(payload["inferenceConfig"]["maxTokens"], 4000);
        assert!((payload["inferenceConfig"]["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
        assert!((payload["inferenceConfig"]["topP"].as_f64().unwrap() - 0.9).abs() < 1e-6);
    }

    #[test]
    fn converse_reply_becomes_a_single_choice() {
        let reply = json!({
            "output": {"message": {"role": "assistant", "content": [{"text": "Hi"}]}},
            "stopReason": "end_turn",
            "usage": {"inputTokens": 3, "outputTokens": 1}
        });
        let resp = completion_from_converse(&reply);
        assert_eq!(resp.first_content(), Some("Hi"));
        assert_eq!(resp.choices[0].finish_reason, "end_turn");
        assert_eq!(resp.usage["outputTokens"], 1);
    }

    #[test]
    fn empty_converse_reply_still_yields_a_choice() {
        let resp = completion_from_converse(&json!({}));
        assert_eq!(resp.first_content(), Some(""));
        assert_eq!(resp.choices[0].finish_reason, "stop");
        assert_eq!(resp.usage, json!({}));
    }

    #[tokio::test]
    async fn missing_key_is_a_configuration_error() {
        let adapter = BedrockAdapter::new(reqwest::Client::new(), settings(None));
        let err = adapter
            .complete(&request(json!({"messages": [{"role": "user", "content": "x"}]})))
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Configuration(_)));
    }

    #[tokio::test]
    async fn upstream_failure_keeps_status_and_details() {
        let fake = fake_vendor::spawn(StatusCode::TOO_MANY_REQUESTS, "slow down".to_string()).await;
        let adapter = BedrockAdapter::new(reqwest::Client::new(), settings(Some("k")))
            .with_base_url(&fake.base_url);
        let err = adapter
            .complete(&request(json!({"messages": [{"role": "user", "content": "x"}]})))
            .await
            .unwrap_err();
        match err {
            PortError::Vendor { vendor, status, details } => {
                assert_eq!(vendor, "Bedrock");
                assert_eq!(status, 429);
                assert_eq!(details, "slow down");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn successful_call_posts_converse_body() {
        let reply = json!({
            "output": {"message": {"content": [{"text": "Done"}]}},
            "stopReason": "end_turn"
        });
        let fake = fake_vendor::spawn(StatusCode::OK, reply.to_string()).await;
        let adapter = BedrockAdapter::new(reqwest::Client::new(), settings(Some("k")))
            .with_base_url(&fake.base_url);
        let resp = adapter
            .complete(&request(json!({"messages": [{"role": "user", "content": "go"}]})))
            .await
            .unwrap();
        assert_eq!(resp.first_content(), Some("Done"));

        let received = fake.received.lock().unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["messages"][0]["content"][0]["text"], "go");
    }
}
