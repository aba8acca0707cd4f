//! Ollama chat client.

use crate::config::ModelConfig;
use crate::error::LlmError;
use crate::llm::{normalize_content, LanguageModel};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Connection settings for the Ollama client.
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    pub ollama_url: String,
    pub model_name: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model_name: "llama3.2:latest".to_string(),
            temperature: 0.2,
            timeout_seconds: 300,
        }
    }
}

impl From<&ModelConfig> for OllamaConfig {
    fn from(config: &ModelConfig) -> Self {
        Self {
            ollama_url: config.ollama_url.trim_end_matches('/').to_string(),
            model_name: config.name.clone(),
            temperature: config.temperature,
            timeout_seconds: config.timeout_seconds,
        }
    }
}

/// Message in the chat request.
#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Ollama chat API request.
#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Ollama chat API response.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Value,
}

/// Language model backed by a local or remote Ollama server.
pub struct OllamaClient {
    config: OllamaConfig,
    http_client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(config: OllamaConfig) -> Result<Self, LlmError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| LlmError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    fn build_request(&self, prompt: &str) -> OllamaChatRequest {
        OllamaChatRequest {
            model: self.config.model_name.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
            },
        }
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    fn name(&self) -> &str {
        &self.config.model_name
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{}/api/chat", self.config.ollama_url);
        let request = self.build_request(prompt);

        debug!(model = %self.config.model_name, prompt_len = prompt.len(), "Sending chat request");

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(self.config.timeout_seconds)
                } else if e.is_connect() {
                    LlmError::Connect(self.config.ollama_url.clone())
                } else {
                    LlmError::Request(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, body });
        }

        let chat_response: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Decode(e.to_string()))?;

        let text = normalize_content(&chat_response.message.content);
        if text.is_empty() {
            return Err(LlmError::Empty);
        }

        Ok(text)
    }
}

const SYSTEM_PROMPT: &str = r#"You are a precise document analyst.
Answer only with what the instructions ask for, without preamble."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_model_config() {
        let model = ModelConfig {
            name: "mistral:7b".to_string(),
            ollama_url: "http://gpu-box:11434/".to_string(),
            temperature: 0.3,
            timeout_seconds: 60,
        };
        let config = OllamaConfig::from(&model);
        assert_eq!(config.ollama_url, "http://gpu-box:11434");
        assert_eq!(config.model_name, "mistral:7b");
    }

    #[test]
    fn test_build_request() {
        let client = OllamaClient::new(OllamaConfig::default()).unwrap();
        let request = client.build_request("Summarize this");
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[1].content, "Summarize this");
        assert!(!request.stream);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["options"]["temperature"], serde_json::json!(0.2f32));
    }

    #[test]
    fn test_response_content_shapes() {
        let plain: OllamaChatResponse =
            serde_json::from_str(r#"{"message":{"role":"assistant","content":" hi "},"done":true}"#)
                .unwrap();
        assert_eq!(normalize_content(&plain.message.content), "hi");

        let missing: OllamaChatResponse =
            serde_json::from_str(r#"{"message":{"role":"assistant"}}"#).unwrap();
        assert_eq!(normalize_content(&missing.message.content), "");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_an_error() {
        let client = OllamaClient::new(OllamaConfig {
            ollama_url: "http://127.0.0.1:9".to_string(),
            timeout_seconds: 2,
            ..OllamaConfig::default()
        })
        .unwrap();
        assert!(client.generate("hello").await.is_err());
    }
}
