use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::llm::{
    models::{ChatOptions, ChatResponse, Message},
    LlmError, LlmProvider, ProviderKind,
};

const ANTHROPIC_VERSION: &str = "2023-06-01";
// The messages API rejects requests without max_tokens.
const FALLBACK_MAX_TOKENS: u32 = 1024;

pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    base_url: String,
    default_model: String,
}

impl AnthropicProvider {
    pub fn new(api_key: String, base_url: String, default_model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url,
            default_model,
        }
    }

    fn request_body(&self, messages: &[Message], options: &ChatOptions) -> Value {
        let model = options.model.as_deref().unwrap_or(&self.default_model);

        // Anthropic takes the system prompt as a separate field and only user/assistant turns in 'messages'
        let mut system = String::new();
        let filtered_messages: Vec<Message> = messages
            .iter()
            .filter_map(|m| {
                if m.role == "system" {
                    system.push_str(&m.content);
                    system.push('\n');
                    None
                } else {
                    Some(m.clone())
                }
            })
            .collect();

        if let Some(opts_system) = &options.system_prompt {
            system.push_str(opts_system);
        }

        let mut body = json!({
            "model": model,
            "messages": filtered_messages,
            "max_tokens": options.max_tokens.unwrap_or(FALLBACK_MAX_TOKENS),
        });
        let system = system.trim();
        if !system.is_empty() {
            body["system"] = json!(system);
        }
        body
    }
}

fn parse_response(json: &Value, model: &str) -> Result<ChatResponse, LlmError> {
    let content = json["content"][0]["text"]
        .as_str()
        .ok_or(LlmError::InvalidResponse)?
        .to_string();

    Ok(ChatResponse {
        content,
        model: json["model"].as_str().unwrap_or(model).to_string(),
    })
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    async fn chat(&self, messages: &[Message], options: ChatOptions) -> Result<ChatResponse, LlmError> {
        let body = self.request_body(messages, &options);

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(LlmError::RateLimited);
            }
            return Err(LlmError::Api(format!("Anthropic Error {}: {}", status, text)));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;

        parse_response(&json, body["model"].as_str().unwrap_or(&self.default_model))
    }
}
