//! Name-keyed tool registry.
//!
//! Keeps tools in registration order so the rendered catalog is stable.

use super::traits::Tool;
use crate::error::{AgentError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Names are unique; an existing entry is never replaced.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let name = tool.name().to_string();
        if self.index.contains_key(&name) {
            return Err(AgentError::DuplicateTool(name));
        }
        debug!("Registered tool: {}", name);
        self.index.insert(name, self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&i| self.tools[i].clone())
    }

    pub fn list(&self) -> Vec<Arc<dyn Tool>> {
        self.tools.clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Render the catalog embedded in the system prompt.
    ///
    /// A tool whose schema cannot be rendered gets an empty `{}` parameter
    /// block; the rest of the catalog is unaffected.
    pub fn describe(&self) -> String {
        if self.tools.is_empty() {
            return "(no tools available)\n".to_string();
        }

        let mut out = String::new();
        for tool in &self.tools {
            out.push_str(&format!("### {}\n", tool.name()));
            out.push_str(tool.description());
            out.push_str("\nParameters:\n");
            match tool.schema().render() {
                Ok(params) => out.push_str(&params),
                Err(e) => {
                    warn!("Could not render schema for tool {}: {}", tool.name(), e);
                    out.push_str("  {}\n");
                }
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::schema::{Field, FieldKind, ToolSchema};
    use crate::types::ToolResult;
    use async_trait::async_trait;
    use serde_json::Value;

    struct EchoTool {
        name: &'static str,
        description: &'static str,
        schema: ToolSchema,
    }

    impl EchoTool {
        fn named(name: &'static str, description: &'static str) -> Self {
            Self {
                name,
                description,
                schema: ToolSchema::new(vec![Field::required(
                    "text",
                    FieldKind::String,
                    "Text to echo",
                )]),
            }
        }
    }

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            self.description
        }

        fn schema(&self) -> ToolSchema {
            self.schema.clone()
        }

        async fn execute(&self, input: Value) -> anyhow::Result<ToolResult> {
            Ok(ToolResult::ok(input["text"].clone()))
        }
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(EchoTool::named("echo", "first")))
            .unwrap();
        let err = registry
            .register(Arc::new(EchoTool::named("echo", "second")))
            .unwrap_err();

        assert!(matches!(err, AgentError::DuplicateTool(ref n) if n == "echo"));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("echo").unwrap().description(), "first");
    }

    #[test]
    fn test_get_missing_is_none() {
        let registry = ToolRegistry::new();
        assert!(registry.get("nope").is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_names_and_catalog_follow_registration_order() {
        let mut registry = ToolRegistry::new();
        for (name, desc) in [("zeta", "Last letter"), ("alpha", "First letter"), ("mu", "Middle")] {
            registry.register(Arc::new(EchoTool::named(name, desc))).unwrap();
        }

        assert_eq!(registry.names(), vec!["zeta", "alpha", "mu"]);
        assert_eq!(registry.list().len(), 3);

        let catalog = registry.describe();
        for (name, desc) in [("zeta", "Last letter"), ("alpha", "First letter"), ("mu", "Middle")] {
            assert!(catalog.contains(name));
            assert!(catalog.contains(desc));
        }
        assert!(catalog.find("### zeta").unwrap() < catalog.find("### alpha").unwrap());
        assert!(catalog.contains("- text (string, required): Text to echo"));
    }

    #[test]
    fn test_catalog_degrades_on_unrenderable_schema() {
        let mut registry = ToolRegistry::new();
        registry
            .register(Arc::new(EchoTool {
                name: "broken",
                description: "Has a nameless field",
                schema: ToolSchema::new(vec![Field::required("", FieldKind::String, "")]),
            }))
            .unwrap();
        registry
            .register(Arc::new(EchoTool::named("echo", "Echoes text")))
            .unwrap();

        let catalog = registry.describe();
        assert!(catalog.contains("### broken\nHas a nameless field\nParameters:\n  {}\n"));
        assert!(catalog.contains("### echo"));
        assert!(catalog.contains("Text to echo"));
    }

    #[test]
    fn test_describe_is_deterministic() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool::named("echo", "Echoes text"))).unwrap();
        assert_eq!(registry.describe(), registry.describe());
    }
}
