//! Shared types used across the agent runtime.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Chat messages
// ---------------------------------------------------------------------------

/// A chat message sent to the model or kept in conversation memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// Token usage reported by one model call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

// ---------------------------------------------------------------------------
// Tool results
// ---------------------------------------------------------------------------

/// Outcome of one tool execution.
///
/// `error` is only set on failures. A successful side-effect-only tool may
/// leave `data` empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn ok(data: impl Into<serde_json::Value>) -> Self {
        Self {
            success: true,
            data: Some(data.into()),
            error: None,
        }
    }

    pub fn ok_empty() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }

    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Reasoning trace
// ---------------------------------------------------------------------------

/// One iteration of a single question's reasoning trace.
///
/// A step either has no action (the thought preceding a final answer) or
/// has an action together with the observation it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub thought: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_input: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,
}

impl Step {
    pub fn thought_only(thought: impl Into<String>) -> Self {
        Self {
            thought: thought.into(),
            action: None,
            action_input: None,
            observation: None,
        }
    }

    pub fn acted(
        thought: impl Into<String>,
        action: impl Into<String>,
        action_input: serde_json::Value,
        observation: impl Into<String>,
    ) -> Self {
        Self {
            thought: thought.into(),
            action: Some(action.into()),
            action_input: Some(action_input),
            observation: Some(observation.into()),
        }
    }
}

/// The model's structured output for one iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDecision {
    pub thought: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_input: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_answer: Option<String>,
}

// ---------------------------------------------------------------------------
// Run results
// ---------------------------------------------------------------------------

/// How a run terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The model produced a final answer.
    Answered,
    /// The same action was proposed three times in a row.
    RepetitionAborted,
    /// `max_iterations` ran out without a final answer.
    IterationBudgetExhausted,
    /// Inference failure, unparseable decision, or contract violation.
    Failed,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Answered => write!(f, "answered"),
            Self::RepetitionAborted => write!(f, "repetition_aborted"),
            Self::IterationBudgetExhausted => write!(f, "iteration_budget_exhausted"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for RunOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "answered" => Ok(Self::Answered),
            "repetition_aborted" => Ok(Self::RepetitionAborted),
            "iteration_budget_exhausted" => Ok(Self::IterationBudgetExhausted),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown run outcome: {other}")),
        }
    }
}

/// Everything a caller gets back from `Agent::run`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub answer: String,
    pub steps: Vec<Step>,
    pub total_cost: f64,
    /// Number of model calls made.
    pub iterations: u32,
    pub outcome: RunOutcome,
}
