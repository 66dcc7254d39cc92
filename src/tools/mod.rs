pub mod api_spec;
pub mod codegen;
pub mod files;
pub mod registry;
pub mod schema;
pub mod traits;

pub use files::Workspace;
pub use registry::ToolRegistry;
pub use schema::{Field, FieldKind, ToolSchema};
pub use traits::Tool;

use crate::error::Result;
use std::sync::Arc;

/// Build a registry holding every built-in tool, rooted at `workspace`.
pub fn builtin_registry(workspace: Workspace) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(files::ReadFileTool::new(workspace.clone())))?;
    registry.register(Arc::new(files::WriteFileTool::new(workspace.clone())))?;
    registry.register(Arc::new(files::ListDirectoryTool::new(workspace.clone())))?;
    registry.register(Arc::new(api_spec::ParseApiSpecTool::new(workspace.clone())))?;
    registry.register(Arc::new(codegen::GenerateClientTool::new(workspace)))?;
    Ok(registry)
}
