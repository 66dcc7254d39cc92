pub mod decision;
pub mod loop_;
pub mod memory;
pub mod prompt;

pub use memory::ConversationMemory;

use crate::config::AgentConfig;
use crate::error::Result;
use crate::inference::ChatModel;
use crate::tools::ToolRegistry;
use crate::types::ChatMessage;
use std::sync::Arc;

/// A reasoning/acting agent bound to one conversation.
///
/// `run` takes `&mut self`, so calls on one instance are serialized; use
/// one instance per independent conversation. Tools and the model are
/// shared handles and may be used by many agents at once.
pub struct Agent {
    model: Arc<dyn ChatModel>,
    registry: Arc<ToolRegistry>,
    memory: ConversationMemory,
    system_prompt: String,
    max_iterations: u32,
    verbose: bool,
}

impl Agent {
    /// Build an agent. Configuration problems surface here, before any run.
    pub fn new(
        config: &AgentConfig,
        registry: Arc<ToolRegistry>,
        model: Arc<dyn ChatModel>,
    ) -> Result<Self> {
        config.validate()?;
        let system_prompt = prompt::build_system_prompt(&registry.describe());

        Ok(Self {
            model,
            registry,
            memory: ConversationMemory::new(config.max_history_rounds as usize),
            system_prompt,
            max_iterations: config.max_iterations,
            verbose: config.verbose,
        })
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn clear_history(&mut self) {
        self.memory.clear();
    }

    pub fn history(&self) -> Vec<ChatMessage> {
        self.memory.history()
    }

    pub fn history_summary(&self) -> String {
        self.memory.summary()
    }
}
