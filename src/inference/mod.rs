//! Model backend abstraction.
//!
//! The agent loop only ever talks to a [`ChatModel`]; the HTTP client is one
//! implementation of it.

pub mod client;

#[cfg(test)]
pub(crate) mod scripted;

pub use client::InferenceClient;

use crate::types::{ChatMessage, TokenUsage};
use anyhow::Result;
use async_trait::async_trait;

/// Raw reply from one model call.
#[derive(Debug, Clone, Default)]
pub struct ModelReply {
    /// Text content; expected to hold a JSON decision object.
    pub content: String,
    pub usage: TokenUsage,
    /// Opaque cost units for this call, summed per run.
    pub cost: f64,
}

/// A chat-completion style model backend.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send the system prompt plus ordered messages and wait for the reply.
    async fn complete(&self, system_prompt: &str, messages: &[ChatMessage]) -> Result<ModelReply>;
}
