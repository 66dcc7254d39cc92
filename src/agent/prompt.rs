//! Prompt construction and observation rendering.
//!
//! Three pure renderers:
//! 1. The system prompt (tool catalog + behavioural rules + reply format)
//! 2. The per-iteration user message (question + steps taken so far)
//! 3. The observation text fed back after a tool runs

use crate::types::{Step, ToolResult};
use serde_json::Value;

const ROLE: &str = r#"
# Role

You are a developer assistant that completes requests by calling tools one at a time.
Typical work: reading API descriptions, generating typed client code, and reading or writing files.
Each turn you think about what to do next, then either call exactly one tool or give the final answer.
"#;

const RULES: &str = r#"
# Rules

1. Reply with exactly one JSON object and nothing else.
2. To call a tool, set "action" to a tool name from the catalog and "action_input" to an object matching its parameters.
3. When the request is satisfied, set "final_answer" and leave out "action".
4. Only use tool names listed in the catalog.
5. If a tool fails, read the error and change your approach. Calling the same tool with the same input three times in a row ends the run.
"#;

const REPLY_FORMAT: &str = r#"
# Reply format

Calling a tool:
{"thought": "why this step", "action": "tool_name", "action_input": {"param": "value"}}

Finishing:
{"thought": "why the request is satisfied", "final_answer": "answer for the user"}
"#;

/// Build the system prompt around a rendered tool catalog.
pub fn build_system_prompt(catalog: &str) -> String {
    let mut prompt = String::with_capacity(2048 + catalog.len());
    prompt.push_str(ROLE);
    prompt.push_str("\n# Tools\n\n");
    prompt.push_str(catalog);
    prompt.push_str(RULES);
    prompt.push_str(REPLY_FORMAT);
    prompt
}

/// Build the user message for one iteration: the question followed by
/// every step taken so far in this run.
pub fn build_user_message(question: &str, steps: &[Step]) -> String {
    let mut msg = format!("Question: {}\n\n", question);

    if steps.is_empty() {
        msg.push_str("Steps so far: none yet.\n");
    } else {
        msg.push_str("Steps so far:\n");
        for (i, step) in steps.iter().enumerate() {
            msg.push_str(&format!("\nStep {}\nThought: {}\n", i + 1, step.thought));
            if let Some(action) = &step.action {
                msg.push_str(&format!("Action: {}\n", action));
            }
            if let Some(input) = &step.action_input {
                msg.push_str(&format!("Action Input: {}\n", input));
            }
            if let Some(observation) = &step.observation {
                msg.push_str(&format!("Observation: {}\n", observation));
            }
        }
    }

    msg.push_str("\nReply with the next JSON decision.");
    msg
}

/// Render one tool outcome as observation text.
pub fn render_observation(
    tool: &str,
    success: bool,
    data: Option<&Value>,
    error: Option<&str>,
) -> String {
    if success {
        format!("tool [{}] succeeded. result: {}", tool, data_as_text(data))
    } else {
        format!(
            "tool [{}] failed. error: {}",
            tool,
            error.unwrap_or("unknown error")
        )
    }
}

pub fn render_tool_result(tool: &str, result: &ToolResult) -> String {
    render_observation(tool, result.success, result.data.as_ref(), result.error.as_deref())
}

fn data_as_text(data: Option<&Value>) -> String {
    match data {
        None | Some(Value::Null) => "(no data)".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
