//! Configuration schema for toolsmith.toml.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Model identifier sent to the chat-completion endpoint.
    pub model: String,

    /// Chat-completion API base URL.
    pub api_url: String,

    /// API key for the chat-completion endpoint.
    pub api_key: String,

    /// Maximum reasoning iterations per question.
    pub max_iterations: u32,

    /// Sampling temperature (0.0 is the most deterministic).
    pub temperature: f64,

    /// Maximum completion tokens per model call.
    pub max_tokens: u32,

    /// Log thoughts and observations at info level.
    pub verbose: bool,

    /// Question/answer rounds kept verbatim before compression kicks in.
    pub max_history_rounds: u32,

    /// Root directory the file tools operate in.
    pub workspace_dir: String,

    /// Path to the SQLite run log.
    pub db_path: String,

    /// Log level (debug, info, warn, error).
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".into(),
            api_url: "https://api.openai.com".into(),
            api_key: String::new(),
            max_iterations: 10,
            temperature: 0.0,
            max_tokens: 2048,
            verbose: false,
            max_history_rounds: 10,
            workspace_dir: ".".into(),
            db_path: "~/.toolsmith/runs.db".into(),
            log_level: "info".into(),
        }
    }
}

impl AgentConfig {
    /// Resolve a path that may contain `~` to an absolute path.
    pub fn resolve_path(&self, path: &str) -> String {
        shellexpand::tilde(path).into_owned()
    }

    /// Resolved run log path.
    pub fn resolved_db_path(&self) -> String {
        self.resolve_path(&self.db_path)
    }

    /// Resolved workspace directory.
    pub fn resolved_workspace_dir(&self) -> String {
        self.resolve_path(&self.workspace_dir)
    }

    /// Check the settings the agent loop depends on.
    ///
    /// Credentials are checked separately by the inference client so that a
    /// loop driven by a local model needs none.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::MissingModel);
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::Invalid(
                "max_iterations must be at least 1".into(),
            ));
        }
        if self.max_history_rounds == 0 {
            return Err(ConfigError::Invalid(
                "max_history_rounds must be at least 1".into(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Invalid(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.temperature
            )));
        }
        Ok(())
    }
}
