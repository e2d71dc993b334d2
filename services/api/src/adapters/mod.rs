pub mod anthropic;
pub mod bedrock;
pub mod db;
pub mod openai;
pub mod workers_ai;

pub use anthropic::AnthropicAdapter;
pub use bedrock::BedrockAdapter;
pub use db::DbAdapter;
pub use openai::OpenAiAdapter;
pub use workers_ai::WorkersAiAdapter;

use crate::config::{Config, Vendor};
use legal_analyzer_core::ports::{ChatCompletionService, PortError, PortResult};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

/// Builds the completion adapter selected by `LLM_VENDOR`.
pub fn completion_service(config: &Config, http: reqwest::Client) -> Arc<dyn ChatCompletionService> {
    match config.vendor {
        Vendor::Bedrock => Arc::new(BedrockAdapter::new(http, config.bedrock.clone())),
        Vendor::WorkersAi => Arc::new(WorkersAiAdapter::new(http, config.workers_ai.clone())),
        Vendor::Anthropic => Arc::new(AnthropicAdapter::new(http, config.anthropic.clone())),
        Vendor::OpenAi => Arc::new(OpenAiAdapter::new(config.openai.clone())),
    }
}

/// Sends a JSON body and returns the JSON reply. A non-success status
/// becomes `PortError::Vendor` carrying the raw response text.
pub(crate) async fn post_json<B: Serialize + ?Sized>(
    vendor: &str,
    request: reqwest::RequestBuilder,
    body: &B,
) -> PortResult<Value> {
    let response = request
        .header(reqwest::header::ACCEPT, "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| PortError::Unexpected(format!("{} request failed: {}", vendor, e)))?;

    let status = response.status();
    info!("{} response status: {}", vendor, status);

    if !status.is_success() {
        let details = response.text().await.unwrap_or_default();
        error!("{} error: {}", vendor, details);
        return Err(PortError::Vendor {
            vendor: vendor.to_string(),
            status: status.as_u16(),
            details,
        });
    }

    response
        .json::<Value>()
        .await
        .map_err(|e| PortError::Unexpected(format!("{} returned invalid JSON: {}", vendor, e)))
}
