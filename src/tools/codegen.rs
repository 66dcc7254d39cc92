//! Typed client generation from a parsed API description.

use super::api_spec::{load_document, ApiDocument, Model, ModelKind, Operation, TypeRef};
use super::files::Workspace;
use super::schema::{Field, FieldKind, ToolSchema};
use super::traits::Tool;
use crate::types::ToolResult;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    TypeScript,
    Rust,
}

impl Language {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "typescript" | "ts" => Some(Self::TypeScript),
            "rust" | "rs" => Some(Self::Rust),
            _ => None,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::TypeScript => "typescript",
            Self::Rust => "rust",
        }
    }
}

/// Render client source for `doc`.
pub fn generate(doc: &ApiDocument, language: Language, client_name: &str) -> String {
    match language {
        Language::TypeScript => typescript::render(doc, client_name),
        Language::Rust => rust::render(doc, client_name),
    }
}

// ---------------------------------------------------------------------------
// Identifier helpers
// ---------------------------------------------------------------------------

fn words(name: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in name.chars() {
        if !c.is_ascii_alphanumeric() {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_ascii_uppercase() && prev_lower && !current.is_empty() {
            out.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        current.push(c.to_ascii_lowercase());
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

fn snake_case(name: &str) -> String {
    let joined = words(name).join("_");
    if joined.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{}", joined)
    } else if joined.is_empty() {
        "value".to_string()
    } else {
        joined
    }
}

fn pascal_case(name: &str) -> String {
    let joined: String = words(name).iter().map(|w| capitalize(w)).collect();
    if joined.starts_with(|c: char| c.is_ascii_digit()) || joined.is_empty() {
        format!("V{}", joined)
    } else {
        joined
    }
}

fn camel_case(name: &str) -> String {
    let pascal = pascal_case(name);
    let mut chars = pascal.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => pascal,
    }
}

/// Split `/pets/{petId}` into literal and parameter segments.
fn path_segments(path: &str) -> Vec<(bool, &str)> {
    let mut out = Vec::new();
    let mut rest = path;
    while let Some(start) = rest.find('{') {
        let Some(len) = rest[start..].find('}') else {
            break;
        };
        if start > 0 {
            out.push((false, &rest[..start]));
        }
        out.push((true, &rest[start + 1..start + len]));
        rest = &rest[start + len + 1..];
    }
    if !rest.is_empty() {
        out.push((false, rest));
    }
    out
}

mod typescript {
    use super::*;
    use std::fmt::Write as _;

    fn ty(t: &TypeRef) -> String {
        match t {
            TypeRef::String => "string".into(),
            TypeRef::Integer | TypeRef::Number => "number".into(),
            TypeRef::Boolean => "boolean".into(),
            TypeRef::Array(inner) => format!("{}[]", ty(inner)),
            TypeRef::Map(inner) => format!("Record<string, {}>", ty(inner)),
            TypeRef::Named(name) => pascal_case(name),
            TypeRef::Any => "unknown".into(),
        }
    }

    fn property_key(name: &str) -> String {
        let plain = name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            && !name.starts_with(|c: char| c.is_ascii_digit());
        if plain {
            name.to_string()
        } else {
            format!("{:?}", name)
        }
    }

    fn model(out: &mut String, m: &Model) {
        if let Some(desc) = &m.description {
            let _ = writeln!(out, "/** {} */", desc);
        }
        let name = pascal_case(&m.name);
        match &m.kind {
            ModelKind::Struct(props) => {
                let _ = writeln!(out, "export interface {} {{", name);
                for p in props {
                    if let Some(desc) = &p.description {
                        let _ = writeln!(out, "  /** {} */", desc);
                    }
                    let optional = if p.required { "" } else { "?" };
                    let _ = writeln!(out, "  {}{}: {};", property_key(&p.name), optional, ty(&p.ty));
                }
                out.push_str("}\n\n");
            }
            ModelKind::Enum(members) => {
                let union: Vec<String> = members.iter().map(|m| format!("{:?}", m)).collect();
                let _ = writeln!(out, "export type {} = {};\n", name, union.join(" | "));
            }
            ModelKind::Alias(t) => {
                let _ = writeln!(out, "export type {} = {};\n", name, ty(t));
            }
        }
    }

    fn operation(out: &mut String, op: &Operation) {
        let mut args = Vec::new();
        for p in op.parameters.iter().filter(|p| p.location == "path") {
            args.push(format!("{}: {}", camel_case(&p.name), ty(&p.ty)));
        }
        if let Some(body) = &op.request_body {
            args.push(format!("body: {}", ty(body)));
        }
        let query: Vec<_> = op.parameters.iter().filter(|p| p.location == "query").collect();
        if !query.is_empty() {
            let fields: Vec<String> = query
                .iter()
                .map(|p| {
                    let optional = if p.required { "" } else { "?" };
                    format!("{}{}: {}", property_key(&p.name), optional, ty(&p.ty))
                })
                .collect();
            let default = if query.iter().any(|p| p.required) { "" } else { " = {}" };
            args.push(format!("query: {{ {} }}{}", fields.join("; "), default));
        }

        let ret = op.response.as_ref().map(ty).unwrap_or_else(|| "void".into());
        if let Some(summary) = &op.summary {
            let _ = writeln!(out, "  /** {} */", summary);
        }
        let _ = writeln!(
            out,
            "  async {}({}): Promise<{}> {{",
            camel_case(&op.operation_id),
            args.join(", "),
            ret
        );

        let mut url = String::new();
        for (is_param, segment) in path_segments(&op.path) {
            if is_param {
                let _ = write!(url, "${{encodeURIComponent(String({}))}}", camel_case(segment));
            } else {
                url.push_str(segment);
            }
        }
        if query.is_empty() {
            let _ = writeln!(out, "    const path = `{}`;", url);
        } else {
            out.push_str("    const params = new URLSearchParams();\n");
            for p in &query {
                let _ = writeln!(
                    out,
                    "    if (query[{:?}] !== undefined) params.set({:?}, String(query[{:?}]));",
                    p.name, p.name, p.name
                );
            }
            out.push_str("    const qs = params.toString();\n");
            let _ = writeln!(out, "    const path = `{}` + (qs ? `?${{qs}}` : \"\");", url);
        }
        let body = if op.request_body.is_some() { ", body" } else { "" };
        let _ = writeln!(
            out,
            "    return this.request<{}>({:?}, path{});",
            ret, op.method, body
        );
        out.push_str("  }\n\n");
    }

    pub(super) fn render(doc: &ApiDocument, client_name: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "// Generated by toolsmith from {} {}. Do not edit by hand.\n",
            doc.title, doc.version
        );
        for m in &doc.models {
            model(&mut out, m);
        }

        let base = doc.base_url.as_deref().unwrap_or("");
        let _ = writeln!(out, "export class {} {{", pascal_case(client_name));
        out.push_str("  constructor(\n");
        let _ = writeln!(out, "    private readonly baseUrl: string = {:?},", base);
        out.push_str("    private readonly headers: Record<string, string> = {},\n");
        out.push_str("  ) {}\n\n");
        for op in &doc.operations {
            operation(&mut out, op);
        }
        out.push_str(
            "  private async request<T>(method: string, path: string, body?: unknown): Promise<T> {\n\
             \x20   const response = await fetch(this.baseUrl + path, {\n\
             \x20     method,\n\
             \x20     headers: { \"Content-Type\": \"application/json\", ...this.headers },\n\
             \x20     body: body === undefined ? undefined : JSON.stringify(body),\n\
             \x20   });\n\
             \x20   if (!response.ok) {\n\
             \x20     throw new Error(`${method} ${path} failed with status ${response.status}`);\n\
             \x20   }\n\
             \x20   const text = await response.text();\n\
             \x20   return (text ? JSON.parse(text) : undefined) as T;\n\
             \x20 }\n\
             }\n",
        );
        out
    }
}

mod rust {
    use super::*;
    use std::fmt::Write as _;

    const KEYWORDS: &[&str] = &[
        "as", "async", "await", "box", "break", "const", "continue", "crate", "dyn", "else", "enum",
        "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
        "mut", "pub", "ref", "return", "static", "struct", "trait", "true", "type", "unsafe",
        "use", "where", "while",
    ];

    fn ident(name: &str) -> String {
        let snake = snake_case(name);
        if KEYWORDS.contains(&snake.as_str()) {
            format!("r#{}", snake)
        } else {
            snake
        }
    }

    fn ty(t: &TypeRef) -> String {
        match t {
            TypeRef::String => "String".into(),
            TypeRef::Integer => "i64".into(),
            TypeRef::Number => "f64".into(),
            TypeRef::Boolean => "bool".into(),
            TypeRef::Array(inner) => format!("Vec<{}>", ty(inner)),
            TypeRef::Map(inner) => format!("std::collections::HashMap<String, {}>", ty(inner)),
            TypeRef::Named(name) => pascal_case(name),
            TypeRef::Any => "serde_json::Value".into(),
        }
    }

    fn model(out: &mut String, m: &Model) {
        if let Some(desc) = &m.description {
            let _ = writeln!(out, "/// {}", desc);
        }
        let name = pascal_case(&m.name);
        match &m.kind {
            ModelKind::Struct(props) => {
                out.push_str("#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]\n");
                let _ = writeln!(out, "pub struct {} {{", name);
                for p in props {
                    if let Some(desc) = &p.description {
                        let _ = writeln!(out, "    /// {}", desc);
                    }
                    let field = ident(&p.name);
                    if field.trim_start_matches("r#") != p.name {
                        let _ = writeln!(out, "    #[serde(rename = {:?})]", p.name);
                    }
                    if p.required {
                        let _ = writeln!(out, "    pub {}: {},", field, ty(&p.ty));
                    } else {
                        out.push_str(
                            "    #[serde(default, skip_serializing_if = \"Option::is_none\")]\n",
                        );
                        let _ = writeln!(out, "    pub {}: Option<{}>,", field, ty(&p.ty));
                    }
                }
                out.push_str("}\n\n");
            }
            ModelKind::Enum(members) => {
                out.push_str(
                    "#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]\n",
                );
                let _ = writeln!(out, "pub enum {} {{", name);
                for member in members {
                    let _ = writeln!(out, "    #[serde(rename = {:?})]", member);
                    let _ = writeln!(out, "    {},", pascal_case(member));
                }
                out.push_str("}\n\n");
            }
            ModelKind::Alias(t) => {
                let _ = writeln!(out, "pub type {} = {};\n", name, ty(t));
            }
        }
    }

    fn operation(out: &mut String, op: &Operation) {
        let mut args = vec!["&self".to_string()];
        for p in op.parameters.iter().filter(|p| p.location == "path") {
            let arg_ty = match p.ty {
                TypeRef::String => "&str".to_string(),
                ref other => ty(other),
            };
            args.push(format!("{}: {}", ident(&p.name), arg_ty));
        }
        if let Some(body) = &op.request_body {
            args.push(format!("body: &{}", ty(body)));
        }
        let query: Vec<_> = op.parameters.iter().filter(|p| p.location == "query").collect();
        for p in &query {
            if p.required {
                args.push(format!("{}: {}", ident(&p.name), ty(&p.ty)));
            } else {
                args.push(format!("{}: Option<{}>", ident(&p.name), ty(&p.ty)));
            }
        }

        let ret = op.response.as_ref().map(ty).unwrap_or_else(|| "()".into());
        if let Some(summary) = &op.summary {
            let _ = writeln!(out, "    /// {}", summary);
        }
        let _ = writeln!(
            out,
            "    pub async fn {}({}) -> reqwest::Result<{}> {{",
            ident(&op.operation_id),
            args.join(", "),
            ret
        );

        let mut template = String::from("{}");
        let mut values = vec!["self.base_url".to_string()];
        for (is_param, segment) in path_segments(&op.path) {
            if is_param {
                template.push_str("{}");
                values.push(ident(segment));
            } else {
                template.push_str(segment);
            }
        }
        let _ = writeln!(out, "        let url = format!({:?}, {});", template, values.join(", "));

        let _ = writeln!(
            out,
            "        let mut request = self.http.request(reqwest::Method::{}, url);",
            op.method
        );
        if !query.is_empty() {
            out.push_str("        let mut query: Vec<(&str, String)> = Vec::new();\n");
            for p in &query {
                if p.required {
                    let _ = writeln!(
                        out,
                        "        query.push(({:?}, {}.to_string()));",
                        p.name,
                        ident(&p.name)
                    );
                } else {
                    let _ = writeln!(
                        out,
                        "        if let Some(v) = &{} {{\n            query.push(({:?}, v.to_string()));\n        }}",
                        ident(&p.name),
                        p.name
                    );
                }
            }
            out.push_str("        request = request.query(&query);\n");
        }
        if op.request_body.is_some() {
            out.push_str("        request = request.json(body);\n");
        }
        out.push_str("        let response = request.send().await?.error_for_status()?;\n");
        if op.response.is_some() {
            out.push_str("        response.json().await\n");
        } else {
            out.push_str("        let _ = response;\n        Ok(())\n");
        }
        out.push_str("    }\n\n");
    }

    pub(super) fn render(doc: &ApiDocument, client_name: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "//! Generated by toolsmith from {} {}. Do not edit by hand.\n",
            doc.title, doc.version
        );
        out.push_str("use serde::{Deserialize, Serialize};\n\n");
        for m in &doc.models {
            model(&mut out, m);
        }

        let name = pascal_case(client_name);
        let _ = writeln!(out, "#[derive(Debug, Clone)]\npub struct {} {{", name);
        out.push_str("    base_url: String,\n    http: reqwest::Client,\n}\n\n");
        let _ = writeln!(out, "impl {} {{", name);
        let _ = writeln!(
            out,
            "    pub const DEFAULT_BASE_URL: &'static str = {:?};\n",
            doc.base_url.as_deref().unwrap_or("")
        );
        out.push_str(
            "    pub fn new(base_url: impl Into<String>) -> Self {\n\
             \x20       Self {\n\
             \x20           base_url: base_url.into().trim_end_matches('/').to_string(),\n\
             \x20           http: reqwest::Client::new(),\n\
             \x20       }\n\
             \x20   }\n\n",
        );
        for op in &doc.operations {
            operation(&mut out, op);
        }
        // drop the blank line after the last method
        if out.ends_with("\n\n") {
            out.pop();
        }
        out.push_str("}\n");
        out
    }
}

// ---------------------------------------------------------------------------
// generate_client tool
// ---------------------------------------------------------------------------

pub struct GenerateClientTool {
    workspace: Workspace,
}

impl GenerateClientTool {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace }
    }
}

#[async_trait]
impl Tool for GenerateClientTool {
    fn name(&self) -> &str {
        "generate_client"
    }

    fn description(&self) -> &str {
        "Generate typed models and an HTTP client from an OpenAPI/Swagger document. \
         Returns the source, or writes it to output_path when given."
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(vec![
            Field::required(
                "spec_path",
                FieldKind::String,
                "Path of the API document relative to the workspace root",
            ),
            Field::required(
                "language",
                FieldKind::Enum(vec!["typescript".into(), "rust".into()]),
                "Target language",
            ),
            Field::optional(
                "client_name",
                FieldKind::String,
                "Name of the generated client type (default: ApiClient)",
            ),
            Field::optional(
                "output_path",
                FieldKind::String,
                "Write the generated source here instead of returning it",
            ),
        ])
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let Some(spec_path) = input.get("spec_path").and_then(Value::as_str) else {
            return Ok(ToolResult::fail("missing 'spec_path' argument"));
        };
        let Some(language) = input
            .get("language")
            .and_then(Value::as_str)
            .and_then(Language::parse)
        else {
            return Ok(ToolResult::fail("'language' must be one of: typescript, rust"));
        };
        let client_name = input
            .get("client_name")
            .and_then(Value::as_str)
            .unwrap_or("ApiClient");

        let resolved = match self.workspace.resolve(spec_path) {
            Ok(p) => p,
            Err(e) => return Ok(ToolResult::fail(e)),
        };
        let doc = match load_document(&resolved).await {
            Ok(doc) => doc,
            Err(e) => return Ok(ToolResult::fail(e)),
        };
        let code = generate(&doc, language, client_name);

        let Some(output_path) = input.get("output_path").and_then(Value::as_str) else {
            return Ok(ToolResult::ok(code));
        };
        let target = match self.workspace.resolve(output_path) {
            Ok(p) => p,
            Err(e) => return Ok(ToolResult::fail(e)),
        };
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::write(&target, &code)
            .await
            .with_context(|| format!("Failed to write {}", target.display()))?;

        Ok(ToolResult::ok(json!({
            "language": language.as_str(),
            "output_path": output_path,
            "models": doc.models.len(),
            "operations": doc.operations.len(),
            "bytes_written": code.len(),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::api_spec::parse_document;
    use crate::tools::api_spec::tests::PETSTORE_YAML;

    fn petstore() -> ApiDocument {
        let raw: Value = serde_yaml::from_str(PETSTORE_YAML).unwrap();
        parse_document(&raw).unwrap()
    }

    #[test]
    fn test_identifier_case_conversion() {
        assert_eq!(snake_case("listPets"), "list_pets");
        assert_eq!(snake_case("pet-id"), "pet_id");
        assert_eq!(pascal_case("pet_status"), "PetStatus");
        assert_eq!(camel_case("show_pet_by_id"), "showPetById");
        assert_eq!(pascal_case("2fa"), "V2fa");
    }

    #[test]
    fn test_path_segments() {
        assert_eq!(
            path_segments("/pets/{petId}/toys"),
            vec![(false, "/pets/"), (true, "petId"), (false, "/toys")]
        );
        assert_eq!(path_segments("/pets"), vec![(false, "/pets")]);
    }

    #[test]
    fn test_typescript_output() {
        let code = generate(&petstore(), Language::TypeScript, "PetClient");
        assert!(code.contains("export interface Pet {"));
        assert!(code.contains("  tag?: string;"));
        assert!(code.contains("  id: number;"));
        assert!(code.contains("export type Status = \"available\" | \"sold\";"));
        assert!(code.contains("export class PetClient {"));
        assert!(code.contains("async listPets(query: { limit?: number } = {}): Promise<Pet[]>"));
        assert!(code.contains("async showPetById(petId: string): Promise<Pet>"));
        assert!(code.contains("${encodeURIComponent(String(petId))}"));
        assert!(code.contains("async postPets(body: Pet): Promise<void>"));
    }

    #[test]
    fn test_rust_output() {
        let code = generate(&petstore(), Language::Rust, "pet client");
        assert!(code.contains("pub struct Pet {"));
        assert!(code.contains("    pub tag: Option<String>,"));
        assert!(code.contains("    pub id: i64,"));
        assert!(code.contains("pub enum Status {"));
        assert!(code.contains("    #[serde(rename = \"available\")]\n    Available,"));
        assert!(code.contains("pub struct PetClient {"));
        assert!(code.contains(
            "pub async fn list_pets(&self, limit: Option<i64>) -> reqwest::Result<Vec<Pet>>"
        ));
        assert!(code.contains(
            "pub async fn show_pet_by_id(&self, pet_id: &str) -> reqwest::Result<Pet>"
        ));
        assert!(code.contains("let url = format!(\"{}/pets/{}\", self.base_url, pet_id);"));
    }

    #[tokio::test]
    async fn test_tool_writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("petstore.yaml"), PETSTORE_YAML).unwrap();
        let tool = GenerateClientTool::new(Workspace::new(dir.path()));

        let result = tool
            .execute(json!({
                "spec_path": "petstore.yaml",
                "language": "typescript",
                "output_path": "out/client.ts"
            }))
            .await
            .unwrap();
        assert!(result.success);
        let data = result.data.unwrap();
        assert_eq!(data["operations"], 3);
        let written = std::fs::read_to_string(dir.path().join("out/client.ts")).unwrap();
        assert!(written.contains("export class ApiClient"));
    }

    #[tokio::test]
    async fn test_tool_rejects_unknown_language() {
        let dir = tempfile::tempdir().unwrap();
        let tool = GenerateClientTool::new(Workspace::new(dir.path()));
        let result = tool
            .execute(json!({"spec_path": "petstore.yaml", "language": "cobol"}))
            .await
            .unwrap();
        assert!(!result.success);
    }
}
