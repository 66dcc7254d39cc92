//! API description parsing (OpenAPI 3 and Swagger 2, JSON or YAML).
//!
//! Produces a small language-neutral model that the `parse_api_spec` tool
//! summarises and the client generator consumes.

use super::files::Workspace;
use super::schema::{Field, FieldKind, ToolSchema};
use super::traits::Tool;
use crate::types::ToolResult;
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::path::Path;

const HTTP_METHODS: &[&str] = &["get", "put", "post", "delete", "options", "head", "patch"];

/// Type of a field, parameter or body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TypeRef {
    String,
    Integer,
    Number,
    Boolean,
    Array(Box<TypeRef>),
    Map(Box<TypeRef>),
    Named(String),
    Any,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    pub name: String,
    pub ty: TypeRef,
    pub required: bool,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ModelKind {
    Struct(Vec<Property>),
    Enum(Vec<String>),
    Alias(TypeRef),
}

/// A named schema from `components.schemas` or `definitions`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Model {
    pub name: String,
    pub description: Option<String>,
    pub kind: ModelKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub name: String,
    /// `path`, `query` or `header`.
    pub location: String,
    pub required: bool,
    pub ty: TypeRef,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    pub method: String,
    pub path: String,
    pub operation_id: String,
    pub summary: Option<String>,
    pub parameters: Vec<Parameter>,
    pub request_body: Option<TypeRef>,
    pub response: Option<TypeRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiDocument {
    pub title: String,
    pub version: String,
    pub base_url: Option<String>,
    pub operations: Vec<Operation>,
    pub models: Vec<Model>,
}

/// Read and parse an API description from disk. `.json` files are parsed as
/// JSON, anything else as YAML.
pub async fn load_document(path: &Path) -> std::result::Result<ApiDocument, String> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let raw: Value = if is_json {
        serde_json::from_str(&text).map_err(|e| format!("invalid JSON: {}", e))?
    } else {
        serde_yaml::from_str(&text).map_err(|e| format!("invalid YAML: {}", e))?
    };
    parse_document(&raw)
}

/// Build an [`ApiDocument`] from an already-decoded description.
pub fn parse_document(raw: &Value) -> std::result::Result<ApiDocument, String> {
    if raw.get("openapi").is_none() && raw.get("swagger").is_none() {
        return Err("document has neither an `openapi` nor a `swagger` version field".into());
    }

    let info = raw.get("info").cloned().unwrap_or(Value::Null);
    let title = info["title"].as_str().unwrap_or("API").to_string();
    let version = info["version"].as_str().unwrap_or("0.0.0").to_string();

    let base_url = raw["servers"]
        .as_array()
        .and_then(|s| s.first())
        .and_then(|s| s["url"].as_str())
        .map(str::to_string)
        .or_else(|| {
            raw["host"].as_str().map(|host| {
                let scheme = raw["schemes"][0].as_str().unwrap_or("https");
                let base_path = raw["basePath"].as_str().unwrap_or("");
                format!("{}://{}{}", scheme, host, base_path)
            })
        });

    let mut operations = Vec::new();
    if let Some(paths) = raw["paths"].as_object() {
        for (path, item) in paths {
            let shared_params = item["parameters"].as_array().cloned().unwrap_or_default();
            for method in HTTP_METHODS {
                let Some(op) = item.get(*method) else {
                    continue;
                };
                operations.push(parse_operation(method, path, op, &shared_params));
            }
        }
    }

    let schemas = raw["components"]["schemas"]
        .as_object()
        .or_else(|| raw["definitions"].as_object());
    let models = schemas
        .map(|s| s.iter().map(|(name, schema)| parse_model(name, schema)).collect())
        .unwrap_or_default();

    Ok(ApiDocument {
        title,
        version,
        base_url,
        operations,
        models,
    })
}

fn parse_operation(method: &str, path: &str, op: &Value, shared: &[Value]) -> Operation {
    let mut parameters = Vec::new();
    let mut request_body = None;

    for param in shared.iter().chain(op["parameters"].as_array().into_iter().flatten()) {
        let location = param["in"].as_str().unwrap_or("query");
        if location == "body" {
            request_body = Some(parse_type(&param["schema"]));
            continue;
        }
        let Some(name) = param["name"].as_str() else {
            continue;
        };
        // Swagger 2 puts the type on the parameter, OpenAPI 3 under `schema`.
        let schema = if param.get("schema").is_some() {
            &param["schema"]
        } else {
            param
        };
        parameters.push(Parameter {
            name: name.to_string(),
            location: location.to_string(),
            required: location == "path" || param["required"].as_bool().unwrap_or(false),
            ty: parse_type(schema),
        });
    }

    if let Some(schema) = json_schema_of(&op["requestBody"]) {
        request_body = Some(parse_type(schema));
    }

    let response = op["responses"].as_object().and_then(|responses| {
        responses
            .iter()
            .filter(|(code, _)| code.starts_with('2'))
            .find_map(|(_, r)| json_schema_of(r).or_else(|| r.get("schema")))
            .map(parse_type)
    });

    Operation {
        method: method.to_uppercase(),
        path: path.to_string(),
        operation_id: op["operationId"]
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| derive_operation_id(method, path)),
        summary: op["summary"].as_str().map(str::to_string),
        parameters,
        request_body,
        response,
    }
}

fn json_schema_of(holder: &Value) -> Option<&Value> {
    let content = holder.get("content")?.as_object()?;
    content
        .get("application/json")
        .or_else(|| content.values().next())
        .and_then(|media| media.get("schema"))
}

fn parse_model(name: &str, schema: &Value) -> Model {
    let description = schema["description"].as_str().map(str::to_string);

    let kind = if let Some(members) = schema["enum"].as_array() {
        ModelKind::Enum(
            members
                .iter()
                .map(|m| m.as_str().map(str::to_string).unwrap_or_else(|| m.to_string()))
                .collect(),
        )
    } else if let Some(props) = schema["properties"].as_object() {
        let required: Vec<&str> = schema["required"]
            .as_array()
            .map(|r| r.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        ModelKind::Struct(
            props
                .iter()
                .map(|(prop, s)| Property {
                    name: prop.clone(),
                    ty: parse_type(s),
                    required: required.contains(&prop.as_str()),
                    description: s["description"].as_str().map(str::to_string),
                })
                .collect(),
        )
    } else {
        ModelKind::Alias(parse_type(schema))
    };

    Model {
        name: name.to_string(),
        description,
        kind,
    }
}

/// Map a JSON schema fragment to a [`TypeRef`].
pub fn parse_type(schema: &Value) -> TypeRef {
    if let Some(reference) = schema["$ref"].as_str() {
        let name = reference.rsplit('/').next().unwrap_or(reference);
        return TypeRef::Named(name.to_string());
    }
    match schema["type"].as_str() {
        Some("string") => TypeRef::String,
        Some("integer") => TypeRef::Integer,
        Some("number") => TypeRef::Number,
        Some("boolean") => TypeRef::Boolean,
        Some("array") => TypeRef::Array(Box::new(parse_type(&schema["items"]))),
        Some("object") => match schema.get("additionalProperties") {
            Some(extra) if extra.is_object() => TypeRef::Map(Box::new(parse_type(extra))),
            _ => TypeRef::Any,
        },
        _ => TypeRef::Any,
    }
}

/// `GET /users/{id}` becomes `get_users_by_id`.
fn derive_operation_id(method: &str, path: &str) -> String {
    let mut parts = vec![method.to_lowercase()];
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        if let Some(param) = segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            parts.push("by".into());
            parts.push(param.to_string());
        } else {
            parts.push(segment.to_string());
        }
    }
    parts
        .join("_")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

// ---------------------------------------------------------------------------
// parse_api_spec tool
// ---------------------------------------------------------------------------

pub struct ParseApiSpecTool {
    workspace: Workspace,
}

impl ParseApiSpecTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for ParseApiSpecTool {
    fn name(&self) -> &str {
        "parse_api_spec"
    }

    fn description(&self) -> &str {
        "Parse an OpenAPI 3 or Swagger 2 document (JSON or YAML) and summarise its operations and schemas."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(vec![Field::required(
            "path",
            FieldKind::String,
            "Path of the API document relative to the workspace root",
        )])
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let Some(path) = input.get("path").and_then(Value::as_str) else {
            return Ok(ToolResult::fail("missing 'path' argument"));
        };
        let resolved = match self.workspace.resolve(path) {
            Ok(p) => p,
            Err(e) => return Ok(ToolResult::fail(e)),
        };
        let doc = match load_document(&resolved).await {
            Ok(doc) => doc,
            Err(e) => return Ok(ToolResult::fail(e)),
        };

        let operations: Vec<Value> = doc
            .operations
            .iter()
            .map(|op| {
                json!({
                    "method": op.method,
                    "path": op.path,
                    "operation_id": op.operation_id,
                    "summary": op.summary,
                })
            })
            .collect();
        let schemas: Vec<&str> = doc.models.iter().map(|m| m.name.as_str()).collect();

        Ok(ToolResult::ok(json!({
            "title": doc.title,
            "version": doc.version,
            "base_url": doc.base_url,
            "operations": operations,
            "schemas": schemas,
        })))
    }
}
