//! services/api/src/adapters/workers_ai.rs
//!
//! Adapter for Cloudflare Workers AI text generation models.

use crate::adapters::post_json;
use crate::config::WorkersAiSettings;
use async_trait::async_trait;
use legal_analyzer_core::{
    completion::{merge_system_prompt, CompletionRequest, CompletionResponse},
    ports::{ChatCompletionService, PortError, PortResult},
};
use serde_json::{json, Value};
use tracing::info;

const VENDOR: &str = "Workers AI";
const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

#[derive(Clone)]
pub struct WorkersAiAdapter {
    http: reqwest::Client,
    settings: WorkersAiSettings,
    base_url: String,
}

impl WorkersAiAdapter {
    pub fn new(http: reqwest::Client, settings: WorkersAiSettings) -> Self {
        Self {
            http,
            settings,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self, account_id: &str) -> String {
        format!(
            "{}/accounts/{}/ai/run/{}",
            self.base_url.trim_end_matches('/'),
            account_id,
            self.settings.model
        )
    }
}

pub(crate) fn run_payload(request: &CompletionRequest) -> Value {
    let messages: Vec<Value> = merge_system_prompt(request)
        .into_iter()
        .map(|m| json!({ "role": m.role, "content": m.text }))
        .collect();

    json!({
        "messages": messages,
        "max_tokens": request.max_tokens_or_default(),
        "temperature": request.temperature_or_default(),
        "top_p": request.top_p_or_default(),
    })
}

/// Workers AI wraps its answer as `{"result": {"response": ..., "usage": ...}}`
/// and reports no stop reason.
pub(crate) fn completion_from_run(reply: &Value) -> CompletionResponse {
    let content = reply
        .pointer("/result/response")
        .and_then(Value::as_str)
        .unwrap_or_default();
    CompletionResponse::assistant(content, None, reply.pointer("/result/usage").cloned())
}

#[async_trait]
impl ChatCompletionService for WorkersAiAdapter {
    async fn complete(&self, request: &CompletionRequest) -> PortResult<CompletionResponse> {
        let (account_id, api_token) = match (
            self.settings.account_id.as_deref(),
            self.settings.api_token.as_deref(),
        ) {
            (Some(account), Some(token)) => (account, token),
            _ => {
                return Err(PortError::Configuration(
                    "Missing Cloudflare account id or API token".to_string(),
                ))
            }
        };

        let url = self.endpoint(account_id);
        info!("Calling {} model {}", VENDOR, self.settings.model);
        let payload = run_payload(request);

        let reply = post_json(VENDOR, self.http.post(&url).bearer_auth(api_token), &payload).await?;
        Ok(completion_from_run(&reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::fake_vendor;
    use axum::http::StatusCode;

    fn settings() -> WorkersAiSettings {
        WorkersAiSettings {
            account_id: Some("acct".to_string()),
            api_token: Some("token".to_string()),
            model: "@cf/meta/llama-3.1-8b-instruct".to_string(),
        }
    }

    #[test]
    fn endpoint_includes_account_and_model() {
        let adapter = WorkersAiAdapter::new(reqwest::Client::new(), settings());
        assert_eq!(
            adapter.endpoint("acct"),
            "https://api.cloudflare.com/client/v4/accounts/acct/ai/run/@cf/meta/llama-3.1-8b-instruct"
        );
    }

    #[test]
    fn payload_uses_plain_string_content() {
        let req: CompletionRequest = serde_json::from_value(json!({
            "messages": [
                {"role": "system", "content": "S"},
                {"role": "user", "content": [{"text": "U"}]}
            ],
            "top_p": 0.5
        }))
        .unwrap();
        let payload = run_payload(&req);
        assert_eq!(payload["messages"], json!([{"role": "user", "content": "S\n\nU"}]));
        assert_eq!(payload["max_tokens"], 1000);
        assert!((payload["top_p"].as_f64().unwrap() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn reply_is_read_from_result() {
        let resp = completion_from_run(&json!({
            "result": {"response": "Answer", "usage": {"total_tokens": 9}},
            "success": true
        }));
        assert_eq!(resp.first_content(), Some("Answer"));
        assert_eq!(resp.choices[0].finish_reason, "stop");
        assert_eq!(resp.usage["total_tokens"], 9);
    }

    #[tokio::test]
    async fn missing_token_is_a_configuration_error() {
        let mut incomplete = settings();
        incomplete.api_token = None;
        let adapter = WorkersAiAdapter::new(reqwest::Client::new(), incomplete);
        let req = CompletionRequest::new(vec![]);
        assert!(matches!(
            adapter.complete(&req).await,
            Err(PortError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn upstream_failure_is_reported_with_vendor_name() {
        let fake = fake_vendor::spawn(StatusCode::BAD_REQUEST, "bad model".to_string()).await;
        let adapter =
            WorkersAiAdapter::new(reqwest::Client::new(), settings()).with_base_url(&fake.base_url);
        let err = adapter
            .complete(&CompletionRequest::new(vec![]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PortError::Vendor { ref vendor, status: 400, .. } if vendor == "Workers AI"
        ));
    }
}
