//! Declarative input schemas for tools.
//!
//! Each tool describes its parameters as plain data. The same description
//! drives input validation and the parameter block of the prompt catalog.

use serde_json::{Map, Value};
use std::fmt;

/// Deepest nesting the catalog renderer will walk.
pub const MAX_SCHEMA_DEPTH: usize = 6;

/// Primitive or composite shape of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String,
    Integer,
    Number,
    Boolean,
    Array(Box<FieldKind>),
    Object(Vec<Field>),
    Enum(Vec<String>),
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Integer => write!(f, "integer"),
            Self::Number => write!(f, "number"),
            Self::Boolean => write!(f, "boolean"),
            Self::Array(inner) => write!(f, "array of {}", inner),
            Self::Object(_) => write!(f, "object"),
            Self::Enum(members) => write!(f, "one of: {}", members.join(" | ")),
        }
    }
}

/// One named parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    pub description: String,
}

impl Field {
    pub fn required(name: &str, kind: FieldKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: true,
            description: description.to_string(),
        }
    }

    pub fn optional(name: &str, kind: FieldKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: false,
            description: description.to_string(),
        }
    }
}

/// Parameters accepted by a tool. The input itself is always an object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolSchema {
    pub fields: Vec<Field>,
}

/// Why a schema could not be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    TooDeep(String),
    UnnamedField,
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooDeep(path) => write!(f, "schema nested too deeply at `{}`", path),
            Self::UnnamedField => write!(f, "schema contains a field without a name"),
        }
    }
}

impl ToolSchema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Render the parameter list, one indented line per field.
    ///
    /// Object fields recurse one indent level deeper; enum members are
    /// flattened inline.
    pub fn render(&self) -> Result<String, RenderError> {
        if self.fields.is_empty() {
            return Ok("  (no parameters)\n".to_string());
        }
        let mut out = String::new();
        render_fields(&self.fields, 1, "", &mut out)?;
        Ok(out)
    }

    /// Check `input` against the schema.
    pub fn validate(&self, input: &Value) -> Result<(), String> {
        let obj = input
            .as_object()
            .ok_or_else(|| "input must be a JSON object".to_string())?;
        validate_fields(&self.fields, obj, "")
    }
}

fn render_fields(
    fields: &[Field],
    depth: usize,
    parent: &str,
    out: &mut String,
) -> Result<(), RenderError> {
    for field in fields {
        if field.name.trim().is_empty() {
            return Err(RenderError::UnnamedField);
        }
        let path = join_path(parent, &field.name);
        if depth > MAX_SCHEMA_DEPTH {
            return Err(RenderError::TooDeep(path));
        }

        let indent = "  ".repeat(depth);
        let presence = if field.required { "required" } else { "optional" };
        out.push_str(&format!("{}- {} ({}, {})", indent, field.name, field.kind, presence));
        if !field.description.is_empty() {
            out.push_str(": ");
            out.push_str(&field.description);
        }
        out.push('\n');

        match &field.kind {
            FieldKind::Object(children) => render_fields(children, depth + 1, &path, out)?,
            FieldKind::Array(inner) => {
                if let FieldKind::Object(children) = innermost(inner) {
                    render_fields(children, depth + 1, &format!("{}[]", path), out)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn innermost(kind: &FieldKind) -> &FieldKind {
    match kind {
        FieldKind::Array(inner) => innermost(inner),
        other => other,
    }
}

fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}.{}", parent, name)
    }
}

fn validate_fields(fields: &[Field], obj: &Map<String, Value>, parent: &str) -> Result<(), String> {
    for field in fields {
        let path = join_path(parent, &field.name);
        match obj.get(&field.name) {
            None | Some(Value::Null) => {
                if field.required {
                    return Err(format!("missing required field `{}`", path));
                }
            }
            Some(value) => check_kind(&field.kind, value, &path)?,
        }
    }
    Ok(())
}

fn check_kind(kind: &FieldKind, value: &Value, path: &str) -> Result<(), String> {
    let matches = match kind {
        FieldKind::String => value.is_string(),
        FieldKind::Integer => value.is_i64() || value.is_u64(),
        FieldKind::Number => value.is_number(),
        FieldKind::Boolean => value.is_boolean(),
        FieldKind::Array(inner) => {
            let items = value
                .as_array()
                .ok_or_else(|| format!("field `{}` must be {}", path, kind))?;
            for (i, item) in items.iter().enumerate() {
                check_kind(inner, item, &format!("{}[{}]", path, i))?;
            }
            true
        }
        FieldKind::Object(children) => {
            let obj = value
                .as_object()
                .ok_or_else(|| format!("field `{}` must be an object", path))?;
            validate_fields(children, obj, path)?;
            true
        }
        FieldKind::Enum(members) => value
            .as_str()
            .map(|s| members.iter().any(|m| m == s))
            .unwrap_or(false),
    };

    if matches {
        Ok(())
    } else {
        Err(format!("field `{}` must be {}", path, kind))
    }
}
