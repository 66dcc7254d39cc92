//! Scripted model used by tests: replays canned replies in order.

use super::{ChatModel, ModelReply};
use crate::types::ChatMessage;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A recorded call to [`ScriptedModel::complete`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub system_prompt: String,
    pub messages: Vec<ChatMessage>,
}

pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    cost_per_call: f64,
}

impl ScriptedModel {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.into())).collect()),
            requests: Mutex::new(Vec::new()),
            cost_per_call: 0.5,
        }
    }

    /// A model whose every call fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            replies: Mutex::new(VecDeque::from([Err(message.to_string())])),
            requests: Mutex::new(Vec::new()),
            cost_per_call: 0.0,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, system_prompt: &str, messages: &[ChatMessage]) -> Result<ModelReply> {
        self.requests.lock().unwrap().push(RecordedRequest {
            system_prompt: system_prompt.to_string(),
            messages: messages.to_vec(),
        });

        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Ok(content)) => Ok(ModelReply {
                content,
                usage: Default::default(),
                cost: self.cost_per_call,
            }),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("scripted model has no replies left")),
        }
    }
}
