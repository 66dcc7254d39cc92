//! Parses model replies into [`AgentDecision`]s.

use crate::error::{AgentError, Result};
use crate::types::AgentDecision;
use serde_json::{Map, Value};

/// Parse one model reply.
///
/// Accepts a bare JSON object or one wrapped in a Markdown code fence, with
/// either `snake_case` or `camelCase` keys. `thought` is required; empty
/// strings for `action` and `final_answer` count as absent.
pub fn parse_decision(text: &str) -> Result<AgentDecision> {
    let body = strip_code_fence(text.trim());
    if body.is_empty() {
        return Err(AgentError::DecisionParse("empty reply".into()));
    }

    let value: Value = serde_json::from_str(body)
        .map_err(|e| AgentError::DecisionParse(format!("reply is not valid JSON ({})", e)))?;
    let Value::Object(obj) = value else {
        return Err(AgentError::DecisionParse("reply is not a JSON object".into()));
    };

    let thought = match lookup(&obj, "thought", "thought") {
        Some(Value::String(s)) => s.clone(),
        Some(_) => {
            return Err(AgentError::DecisionParse("`thought` must be a string".into()));
        }
        None => {
            return Err(AgentError::DecisionParse("missing required field `thought`".into()));
        }
    };

    let action = match lookup(&obj, "action", "action") {
        None => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(_) => {
            return Err(AgentError::DecisionParse("`action` must be a string".into()));
        }
    };

    let action_input = lookup(&obj, "action_input", "actionInput").cloned();

    let final_answer = match lookup(&obj, "final_answer", "finalAnswer") {
        None => None,
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    };

    Ok(AgentDecision {
        thought,
        action,
        action_input,
        final_answer,
    })
}

/// Non-null value under either key spelling.
fn lookup<'a>(obj: &'a Map<String, Value>, snake: &str, camel: &str) -> Option<&'a Value> {
    obj.get(snake)
        .or_else(|| obj.get(camel))
        .filter(|v| !v.is_null())
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (e.g. `json`), which may share a line with the body.
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    let body = rest.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_action_decision() {
        let d = parse_decision(
            r#"{"thought": "read it", "action": "read_file", "action_input": {"path": "a.yaml"}}"#,
        )
        .unwrap();
        assert_eq!(d.thought, "read it");
        assert_eq!(d.action.as_deref(), Some("read_file"));
        assert_eq!(d.action_input, Some(json!({"path": "a.yaml"})));
        assert!(d.final_answer.is_none());
    }

    #[test]
    fn test_parse_final_answer_camel_case_in_fence() {
        let reply = "```json\n{\"thought\": \"done\", \"finalAnswer\": \"All set\"}\n```";
        let d = parse_decision(reply).unwrap();
        assert_eq!(d.final_answer.as_deref(), Some("All set"));
        assert!(d.action.is_none());
    }

    #[test]
    fn test_parse_single_line_fence() {
        let d = parse_decision("```json {\"thought\":\"t\",\"final_answer\":\"x\"}```").unwrap();
        assert_eq!(d.final_answer.as_deref(), Some("x"));

        let d = parse_decision("```{\"thought\":\"t\",\"action\":\"read_file\"}```").unwrap();
        assert_eq!(d.action.as_deref(), Some("read_file"));

        let d = parse_decision("```\n{\"thought\": \"bare fence\"}\n```").unwrap();
        assert_eq!(d.thought, "bare fence");
    }

    #[test]
    fn test_empty_strings_count_as_absent() {
        let d = parse_decision(r#"{"thought": "hmm", "action": "", "final_answer": "  "}"#).unwrap();
        assert!(d.action.is_none());
        assert!(d.final_answer.is_none());
    }

    #[test]
    fn test_non_string_final_answer_is_serialized() {
        let d = parse_decision(r#"{"thought": "t", "final_answer": {"files": 2}}"#).unwrap();
        assert_eq!(d.final_answer.as_deref(), Some("{\"files\":2}"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            parse_decision("I think I should read the file first."),
            Err(AgentError::DecisionParse(_))
        ));
        assert!(matches!(parse_decision(""), Err(AgentError::DecisionParse(_))));
        assert!(matches!(parse_decision("[1, 2]"), Err(AgentError::DecisionParse(_))));

        let err = parse_decision(r#"{"action": "read_file"}"#).unwrap_err();
        assert!(err.to_string().contains("thought"));

        assert!(parse_decision(r#"{"thought": "t", "action": 5}"#).is_err());
    }
}
