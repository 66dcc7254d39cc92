//! Model inference over an OpenAI-compatible chat-completion API.
//!
//! Requests JSON-object output so the reply can be parsed as a decision.

use super::{ChatModel, ModelReply};
use crate::config::AgentConfig;
use crate::error::ConfigError;
use crate::types::*;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Inference client for a chat-completion endpoint.
#[derive(Debug, Clone)]
pub struct InferenceClient {
    base_url: String,
    api_key: String,
    model: String,
    temperature: f64,
    max_tokens: u32,
    http: reqwest::Client,
}

// -- OpenAI-compatible request/response types --------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<MessagePayload<'a>>,
    max_tokens: u32,
    temperature: f64,
    response_format: ResponseFormat<'a>,
}

#[derive(Debug, Serialize)]
struct MessagePayload<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat<'a> {
    r#type: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<UsagePayload>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsagePayload {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

/// Pricing per 1M tokens (prompt, completion) in USD.
const MODEL_PRICING: &[(&str, f64, f64)] = &[
    ("gpt-4o-mini", 0.15, 0.60),
    ("gpt-4o", 2.50, 10.00),
    ("gpt-4.1-mini", 0.40, 1.60),
    ("gpt-4.1", 2.00, 8.00),
];

impl InferenceClient {
    /// Create a new inference client. Fails fast on missing credentials.
    pub fn from_config(config: &AgentConfig) -> Result<Self, ConfigError> {
        if config.api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential);
        }
        if config.api_url.trim().is_empty() {
            return Err(ConfigError::Invalid("api_url must not be empty".into()));
        }
        config.validate()?;

        Ok(Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            http: reqwest::Client::new(),
        })
    }

    /// Estimate the USD cost of a token usage for a given model.
    pub fn estimate_cost(model: &str, usage: &TokenUsage) -> f64 {
        let (prompt_rate, completion_rate) = MODEL_PRICING
            .iter()
            .find(|(name, _, _)| model.contains(name))
            .map(|(_, p, c)| (*p, *c))
            .unwrap_or((0.15, 0.60));

        let prompt_cost = (usage.prompt_tokens as f64 / 1_000_000.0) * prompt_rate;
        let completion_cost = (usage.completion_tokens as f64 / 1_000_000.0) * completion_rate;
        prompt_cost + completion_cost
    }
}

#[async_trait]
impl ChatModel for InferenceClient {
    async fn complete(&self, system_prompt: &str, messages: &[ChatMessage]) -> Result<ModelReply> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let mut payloads = Vec::with_capacity(messages.len() + 1);
        payloads.push(MessagePayload {
            role: "system",
            content: system_prompt,
        });
        for m in messages {
            payloads.push(MessagePayload {
                role: match m.role {
                    ChatRole::System => "system",
                    ChatRole::User => "user",
                    ChatRole::Assistant => "assistant",
                },
                content: &m.content,
            });
        }

        let request = ChatRequest {
            model: &self.model,
            messages: payloads,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            response_format: ResponseFormat {
                r#type: "json_object",
            },
        };

        debug!("Inference request to model {} ({} messages)", self.model, messages.len());

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Inference request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("Inference failed ({}): {}", status, body);
        }

        let body: ChatResponse = resp.json().await.context("Failed to parse inference response")?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        let usage = body
            .usage
            .map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            })
            .unwrap_or_default();

        let cost = Self::estimate_cost(&self.model, &usage);
        Ok(ModelReply {
            content,
            usage,
            cost,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_requires_api_key() {
        let config = AgentConfig::default();
        assert!(matches!(
            InferenceClient::from_config(&config),
            Err(ConfigError::MissingCredential)
        ));
    }

    #[test]
    fn test_from_config_propagates_validation() {
        let config = AgentConfig {
            api_key: "sk-test".into(),
            model: String::new(),
            ..AgentConfig::default()
        };
        assert!(matches!(
            InferenceClient::from_config(&config),
            Err(ConfigError::MissingModel)
        ));
    }

    #[test]
    fn test_from_config_trims_trailing_slash() {
        let config = AgentConfig {
            api_key: "sk-test".into(),
            api_url: "http://localhost:8080/".into(),
            ..AgentConfig::default()
        };
        let client = InferenceClient::from_config(&config).unwrap();
        assert_eq!(client.base_url, "http://localhost:8080");
    }

    #[test]
    fn test_estimate_cost_prefers_specific_model() {
        let usage = TokenUsage {
            prompt_tokens: 1_000_000,
            completion_tokens: 1_000_000,
            total_tokens: 2_000_000,
        };
        let mini = InferenceClient::estimate_cost("gpt-4o-mini", &usage);
        let full = InferenceClient::estimate_cost("gpt-4o", &usage);
        assert!((mini - 0.75).abs() < 1e-9);
        assert!((full - 12.5).abs() < 1e-9);
    }
}
