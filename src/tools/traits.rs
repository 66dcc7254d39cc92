//! Tool trait definition.

use super::schema::ToolSchema;
use crate::types::ToolResult;
use anyhow::Result;
use async_trait::async_trait;

/// An atomic capability the model can invoke by name.
///
/// Tools are built once, registered, and shared for the life of the
/// process. Execution must depend only on the input; any internal caching
/// must not change what a caller observes.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (used in decisions).
    fn name(&self) -> &str;

    /// Human-readable description for the prompt catalog.
    fn description(&self) -> &str;

    /// Declared parameters.
    fn schema(&self) -> ToolSchema;

    /// Check an input before execution.
    fn validate(&self, input: &serde_json::Value) -> std::result::Result<(), String> {
        self.schema().validate(input)
    }

    /// Execute the tool. Expected failures come back as
    /// `ToolResult::fail`; `Err` is reserved for unexpected errors.
    async fn execute(&self, input: serde_json::Value) -> Result<ToolResult>;
}
