use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use chatbridge_config::BridgeConfig;
use chatbridge_core::{
    BridgeError, CompletionLimits, CompletionRequest, CompletionResponse, CompletionService,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// OpenAI chat-completions provider.
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiProvider {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            endpoint: chatbridge_config::schema::DEFAULT_COMPLETION_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = url.into();
        self
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new(&config.completion_api_key, &config.completion_model)
            .with_endpoint(&config.completion_endpoint)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    n: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[async_trait]
impl CompletionService for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn request(
        &self,
        request: &CompletionRequest,
        limits: &CompletionLimits,
    ) -> Result<CompletionResponse, BridgeError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_text,
                },
            ],
            max_tokens: limits.max_output_tokens,
            n: limits.sample_count,
            temperature: limits.temperature,
        };

        debug!(model = %self.model, endpoint = %self.endpoint, "Sending completion request");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Completion HTTP request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(BridgeError::CompletionService {
                status: status.as_u16(),
                body: error_body,
            });
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("Failed to parse completion response")?;

        let candidates = chat_response
            .choices
            .into_iter()
            .filter_map(|c| c.message.and_then(|m| m.content))
            .collect();

        Ok(CompletionResponse { candidates })
    }
}
