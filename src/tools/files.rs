//! File I/O tools rooted at the workspace directory.

use super::schema::{Field, FieldKind, ToolSchema};
use super::traits::Tool;
use crate::types::ToolResult;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Component, Path, PathBuf};

/// Largest file `read_file` returns in full.
const MAX_READ_BYTES: usize = 256 * 1024;

/// Resolves tool-supplied paths against a fixed root.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `path` inside the workspace. Rejects `..` components and
    /// absolute paths that point elsewhere.
    pub fn resolve(&self, path: &str) -> std::result::Result<PathBuf, String> {
        let candidate = Path::new(path);
        if candidate
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(format!("path `{}` must not contain `..`", path));
        }
        if candidate.is_absolute() {
            if candidate.starts_with(&self.root) {
                return Ok(candidate.to_path_buf());
            }
            return Err(format!("path `{}` is outside the workspace", path));
        }
        Ok(self.root.join(candidate))
    }
}

fn str_arg<'a>(input: &'a Value, key: &str) -> Option<&'a str> {
    input.get(key).and_then(Value::as_str)
}

// ---------------------------------------------------------------------------
// read_file
// ---------------------------------------------------------------------------

pub struct ReadFileTool {
    workspace: Workspace,
}

impl ReadFileTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a UTF-8 text file from the workspace."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(vec![Field::required(
            "path",
            FieldKind::String,
            "Path relative to the workspace root",
        )])
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let Some(path) = str_arg(&input, "path") else {
            return Ok(ToolResult::fail("missing 'path' argument"));
        };
        let resolved = match self.workspace.resolve(path) {
            Ok(p) => p,
            Err(e) => return Ok(ToolResult::fail(e)),
        };
        if !resolved.is_file() {
            return Ok(ToolResult::fail(format!("file not found: {}", path)));
        }

        let bytes = tokio::fs::read(&resolved)
            .await
            .with_context(|| format!("Failed to read {}", resolved.display()))?;
        let mut text = String::from_utf8_lossy(&bytes).into_owned();
        if text.len() > MAX_READ_BYTES {
            let mut cut = MAX_READ_BYTES;
            while !text.is_char_boundary(cut) {
                cut -= 1;
            }
            text.truncate(cut);
            text.push_str("\n[truncated]");
        }
        Ok(ToolResult::ok(text))
    }
}

// ---------------------------------------------------------------------------
// write_file
// ---------------------------------------------------------------------------

pub struct WriteFileTool {
    workspace: Workspace,
}

impl WriteFileTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write text to a file in the workspace, creating parent directories. Overwrites existing files."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(vec![
            Field::required("path", FieldKind::String, "Path relative to the workspace root"),
            Field::required("content", FieldKind::String, "Full file content"),
        ])
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let (Some(path), Some(content)) = (str_arg(&input, "path"), str_arg(&input, "content"))
        else {
            return Ok(ToolResult::fail("'path' and 'content' are required"));
        };
        let resolved = match self.workspace.resolve(path) {
            Ok(p) => p,
            Err(e) => return Ok(ToolResult::fail(e)),
        };

        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::write(&resolved, content)
            .await
            .with_context(|| format!("Failed to write {}", resolved.display()))?;

        Ok(ToolResult::ok(json!({
            "path": path,
            "bytes_written": content.len(),
        })))
    }
}

// ---------------------------------------------------------------------------
// list_directory
// ---------------------------------------------------------------------------

pub struct ListDirectoryTool {
    workspace: Workspace,
}

impl ListDirectoryTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &str {
        "list_directory"
    }

    fn description(&self) -> &str {
        "List the entries of a workspace directory. Directories end with '/'."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(vec![Field::optional(
            "path",
            FieldKind::String,
            "Directory relative to the workspace root (default: the root)",
        )])
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let path = str_arg(&input, "path").unwrap_or(".");
        let resolved = match self.workspace.resolve(path) {
            Ok(p) => p,
            Err(e) => return Ok(ToolResult::fail(e)),
        };
        if !resolved.is_dir() {
            return Ok(ToolResult::fail(format!("not a directory: {}", path)));
        }

        let mut entries = Vec::new();
        let mut dir = tokio::fs::read_dir(&resolved)
            .await
            .with_context(|| format!("Failed to list {}", resolved.display()))?;
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry.file_type().await?.is_dir() {
                entries.push(format!("{}/", name));
            } else {
                entries.push(name);
            }
        }
        entries.sort();

        Ok(ToolResult::ok(entries.join("\n")))
    }
}
