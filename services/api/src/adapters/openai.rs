//! services/api/src/adapters/openai.rs
//!
//! This module contains the adapter for OpenAI-compatible chat endpoints.
//! It implements the `ChatCompletionService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use legal_analyzer_core::{
    completion::{CompletionRequest, CompletionResponse},
    ports::{ChatCompletionService, PortError, PortResult},
};
use tracing::{error, info};

use crate::config::OpenAiSettings;

const VENDOR: &str = "OpenAI";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ChatCompletionService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiAdapter {
    client: Option<Client<OpenAIConfig>>,
    model: String,
}

impl OpenAiAdapter {
    /// Creates a new `OpenAiAdapter`. Without an API key every call fails
    /// with a configuration error.
    pub fn new(settings: OpenAiSettings) -> Self {
        let client = settings.api_key.map(|key| {
            let config = OpenAIConfig::new()
                .with_api_key(key)
                .with_api_base(settings.base_url.clone());
            Client::with_config(config)
        });
        Self {
            client,
            model: settings.model,
        }
    }
}

fn to_openai_message(role: &str, text: &str) -> PortResult<ChatCompletionRequestMessage> {
    let message = match role {
        "system" => ChatCompletionRequestSystemMessageArgs::default()
            .content(text)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .into(),
        "assistant" => ChatCompletionRequestAssistantMessageArgs::default()
            .content(text)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .into(),
        _ => ChatCompletionRequestUserMessageArgs::default()
            .content(text)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?
            .into(),
    };
    Ok(message)
}

//=========================================================================================
// `ChatCompletionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ChatCompletionService for OpenAiAdapter {
    async fn complete(&self, request: &CompletionRequest) -> PortResult<CompletionResponse> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| PortError::Configuration("Missing OpenAI API key".to_string()))?;

        let messages = request
            .messages
            .iter()
            .map(|m| to_openai_message(&m.role, m.content.text()))
            .collect::<PortResult<Vec<_>>>()?;

        let openai_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_completion_tokens(request.max_tokens_or_default())
            .temperature(request.temperature_or_default())
            .top_p(request.top_p_or_default())
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        info!("Calling {} model {}", VENDOR, self.model);
        let response = client
            .chat()
            .create(openai_request)
            .await
            .map_err(|e: OpenAIError| match e {
                // The client does not surface the HTTP status of API errors.
                OpenAIError::ApiError(api) => {
                    error!("{} error: {}", VENDOR, api.message);
                    PortError::Vendor {
                        vendor: VENDOR.to_string(),
                        status: 502,
                        details: api.message,
                    }
                }
                other => PortError::Unexpected(other.to_string()),
            })?;

        let usage = response
            .usage
            .as_ref()
            .and_then(|u| serde_json::to_value(u).ok());
        let choice = response.choices.into_iter().next();
        let finish_reason = choice
            .as_ref()
            .and_then(|c| c.finish_reason.as_ref())
            .and_then(|r| serde_json::to_value(r).ok())
            .and_then(|v| v.as_str().map(str::to_string));
        let content = choice
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        Ok(CompletionResponse::assistant(content, finish_reason, usage))
    }
}
