use std::collections::HashMap;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::agent::r#loop::LLMProvider;
use crate::agent::types::{Message, Tool};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "<[Tool]>::is_empty")]
    tools: &'a [Tool],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

/// OpenAI-compatible chat completions provider
pub struct OpenAIProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    headers: HashMap<String, String>,
}

impl OpenAIProvider {
    pub fn new(base_url: &str, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: None,
            max_tokens: None,
            headers: HashMap::new(),
        }
    }

    pub fn temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Extra header sent with every request
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

impl LLMProvider for OpenAIProvider {
    async fn call(&mut self, messages: &[Message], tools: &[Tool]) -> anyhow::Result<Option<Message>> {
        trace!(
            "Request: {} messages, {} tools",
            messages.len(),
            tools.len()
        );

        let request = ChatRequest {
            model: &self.model,
            messages,
            tools,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let mut builder = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&request);
        for (key, value) in &self.headers {
            builder = builder.header(key, value);
        }

        let response = builder
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.base_url))?
            .error_for_status()
            .context("Chat completion request rejected")?;

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("Malformed chat completion response")?;
        trace!("Response has {} choices", chat_response.choices.len());

        if chat_response.choices.is_empty() {
            warn!("Chat completion returned no choices");
        }
        Ok(chat_response.choices.into_iter().next().map(|c| c.message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_trailing_slash_trimmed() {
        let provider = OpenAIProvider::new(
            "https://generativelanguage.googleapis.com/v1beta/openai/",
            "key",
            "gemini-3-flash-preview",
        );
        assert_eq!(
            provider.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions"
        );
    }

    #[test]
    fn test_request_omits_unset_options() {
        let messages = [Message::user("hi")];
        let request = ChatRequest {
            model: "m",
            messages: &messages,
            tools: &[],
            temperature: None,
            max_tokens: Some(1024),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "model": "m",
                "messages": [{"role": "user", "content": "hi"}],
                "max_tokens": 1024
            })
        );
    }

    #[test]
    fn test_response_without_choices() {
        let response: ChatResponse = serde_json::from_value(json!({"id": "x"})).unwrap();
        assert!(response.choices.is_empty());
    }

    #[test]
    fn test_response_with_tool_calls() {
        let response: ChatResponse = serde_json::from_value(json!({
            "choices": [{
                "index": 0,
                "finish_reason": "tool_calls",
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "read_file", "arguments": "{\"filePath\":\"resume.json\"}"}
                    }]
                }
            }]
        }))
        .unwrap();
        let message = &response.choices[0].message;
        assert_eq!(message.requested_tool_calls()[0].function.name, "read_file");
    }
}
