//! Core ReAct loop: Think → Act → Observe, one question at a time.
//!
//! Each iteration:
//! 1. Sends system prompt + conversation history + the question with this
//!    run's steps
//! 2. Parses the reply into a decision
//! 3. Stops on a final answer, or executes the chosen tool and records the
//!    observation
//!
//! Every exit path records the exchange in conversation memory and returns
//! a `RunResult`; nothing is propagated to the caller as an error.

use super::{decision, prompt, Agent};
use crate::types::*;
use serde_json::Value;
use tracing::{debug, error, info, warn};

/// Identical consecutive proposals that end a run.
const REPEAT_LIMIT: usize = 3;

impl Agent {
    /// Resolve one question.
    pub async fn run(&mut self, question: &str) -> RunResult {
        info!("Question: {}", preview(question, 200));

        let history = self.memory.history();
        let mut steps: Vec<Step> = Vec::new();
        let mut total_cost = 0.0;

        for iteration in 1..=self.max_iterations {
            let mut messages = history.clone();
            messages.push(ChatMessage::user(prompt::build_user_message(question, &steps)));

            let reply = match self.model.complete(&self.system_prompt, &messages).await {
                Ok(reply) => reply,
                Err(e) => {
                    error!("[Iteration {}] Model call failed: {:#}", iteration, e);
                    let answer = format!("Error: the model call failed: {:#}", e);
                    return self.finish(question, answer, steps, total_cost, iteration, RunOutcome::Failed);
                }
            };
            total_cost += reply.cost;

            let decision = match decision::parse_decision(&reply.content) {
                Ok(d) => d,
                Err(e) => {
                    warn!("[Iteration {}] {}", iteration, e);
                    let answer = format!("Error: {}", e);
                    return self.finish(question, answer, steps, total_cost, iteration, RunOutcome::Failed);
                }
            };
            self.trace(iteration, "Thought", &decision.thought);

            if let Some(answer) = decision.final_answer {
                steps.push(Step::thought_only(decision.thought));
                info!("[Iteration {}] Final answer ({} chars)", iteration, answer.len());
                return self.finish(question, answer, steps, total_cost, iteration, RunOutcome::Answered);
            }

            let Some(action) = decision.action else {
                warn!("[Iteration {}] Decision has neither an action nor a final answer", iteration);
                let answer =
                    "Error: the model returned neither an action nor a final answer.".to_string();
                return self.finish(question, answer, steps, total_cost, iteration, RunOutcome::Failed);
            };
            let input = decision
                .action_input
                .unwrap_or_else(|| Value::Object(Default::default()));

            if repeats_previous(&steps, &action, &input) {
                warn!(
                    "[Iteration {}] `{}` proposed {} times in a row with identical input; stopping",
                    iteration, action, REPEAT_LIMIT
                );
                let last = steps
                    .last()
                    .and_then(|s| s.observation.as_deref())
                    .unwrap_or("(none)");
                let answer = format!(
                    "Stopped: the agent kept calling `{}` with the same input {} times in a row without making progress. Last observation: {}",
                    action, REPEAT_LIMIT, last
                );
                return self.finish(
                    question,
                    answer,
                    steps,
                    total_cost,
                    iteration,
                    RunOutcome::RepetitionAborted,
                );
            }

            info!("[Iteration {}] Tool: {}({})", iteration, action, input);
            let observation = self.dispatch(&action, &input).await;
            self.trace(iteration, "Observation", &observation);

            steps.push(Step::acted(decision.thought, action, input, observation));
        }

        warn!("Iteration budget of {} exhausted", self.max_iterations);
        let answer = format!(
            "I could not complete this request within the iteration budget ({} steps).",
            self.max_iterations
        );
        let iterations = self.max_iterations;
        self.finish(
            question,
            answer,
            steps,
            total_cost,
            iterations,
            RunOutcome::IterationBudgetExhausted,
        )
    }

    /// Execute one action and render the observation. Unknown tools, invalid
    /// input and tool errors all come back as failure observations so the
    /// model can correct itself.
    async fn dispatch(&self, action: &str, input: &Value) -> String {
        let Some(tool) = self.registry.get(action) else {
            let error = format!(
                "unknown tool `{}`. Available tools: {}",
                action,
                self.registry.names().join(", ")
            );
            return prompt::render_observation(action, false, None, Some(&error));
        };

        if let Err(e) = tool.validate(input) {
            let error = format!("invalid input: {}", e);
            return prompt::render_observation(action, false, None, Some(&error));
        }

        match tool.execute(input.clone()).await {
            Ok(result) => {
                if !result.success {
                    debug!("Tool {} reported failure", action);
                }
                prompt::render_tool_result(action, &result)
            }
            Err(e) => {
                warn!("Tool {} errored: {:#}", action, e);
                prompt::render_observation(action, false, None, Some(&format!("{:#}", e)))
            }
        }
    }

    fn finish(
        &mut self,
        question: &str,
        answer: String,
        steps: Vec<Step>,
        total_cost: f64,
        iterations: u32,
        outcome: RunOutcome,
    ) -> RunResult {
        self.memory.record(question, &answer, &steps);
        debug!("Run finished: {} after {} iterations, cost {:.6}", outcome, iterations, total_cost);
        RunResult {
            answer,
            steps,
            total_cost,
            iterations,
            outcome,
        }
    }

    fn trace(&self, iteration: u32, label: &str, text: &str) {
        if self.verbose {
            info!("[Iteration {}] {}: {}", iteration, label, text);
        } else {
            debug!("[Iteration {}] {}: {}", iteration, label, preview(text, 200));
        }
    }
}

/// True when the previous `REPEAT_LIMIT - 1` steps all proposed exactly this
/// action and input.
fn repeats_previous(steps: &[Step], action: &str, input: &Value) -> bool {
    let needed = REPEAT_LIMIT - 1;
    if steps.len() < needed {
        return false;
    }
    let key = input.to_string();
    steps[steps.len() - needed..].iter().all(|s| {
        s.action.as_deref() == Some(action)
            && s.action_input.as_ref().map(Value::to_string).as_deref() == Some(key.as_str())
    })
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgentConfig;
    use crate::inference::scripted::ScriptedModel;
    use crate::tools::{Field, FieldKind, Tool, ToolRegistry, ToolSchema};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the given text"
        }

        fn schema(&self) -> ToolSchema {
            ToolSchema::new(vec![Field::required("text", FieldKind::String, "Text")])
        }

        async fn execute(&self, input: Value) -> anyhow::Result<ToolResult> {
            Ok(ToolResult::ok(input["text"].clone()))
        }
    }

    struct BrokenTool;

    #[async_trait]
    impl Tool for BrokenTool {
        fn name(&self) -> &str {
            "broken"
        }

        fn description(&self) -> &str {
            "Always errors"
        }

        fn schema(&self) -> ToolSchema {
            ToolSchema::empty()
        }

        async fn execute(&self, _input: Value) -> anyhow::Result<ToolResult> {
            Err(anyhow!("disk on fire"))
        }
    }

    fn registry() -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool)).unwrap();
        registry.register(Arc::new(BrokenTool)).unwrap();
        Arc::new(registry)
    }

    fn agent_with(model: Arc<ScriptedModel>, config: AgentConfig) -> Agent {
        Agent::new(&config, registry(), model).unwrap()
    }

    fn echo(text: &str) -> String {
        json!({"thought": "echo it", "action": "echo", "action_input": {"text": text}}).to_string()
    }

    fn answer(text: &str) -> String {
        json!({"thought": "done", "final_answer": text}).to_string()
    }

    #[tokio::test]
    async fn test_answer_after_one_tool_call() {
        let model = Arc::new(ScriptedModel::new([echo("hi"), answer("It said hi")]));
        let mut agent = agent_with(model.clone(), AgentConfig::default());

        let result = agent.run("say hi").await;

        assert_eq!(result.outcome, RunOutcome::Answered);
        assert_eq!(result.answer, "It said hi");
        assert_eq!(result.iterations, 2);
        assert!((result.total_cost - 1.0).abs() < 1e-9);
        assert_eq!(result.steps.len(), 2);
        assert_eq!(
            result.steps[0].observation.as_deref(),
            Some("tool [echo] succeeded. result: hi")
        );
        assert!(result.steps[1].action.is_none());

        // second request carries the first step
        let requests = model.requests();
        let last_user = &requests[1].messages.last().unwrap().content;
        assert!(last_user.contains("Observation: tool [echo] succeeded. result: hi"));
        assert!(requests[0].system_prompt.contains("### echo"));

        let history = agent.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "say hi");
        assert!(history[1].content.contains("It said hi"));
    }

    #[tokio::test]
    async fn test_repetition_guard_stops_on_third_identical_action() {
        let model = Arc::new(ScriptedModel::new([echo("same"), echo("same"), echo("same"), answer("unreachable")]));
        let mut agent = agent_with(model.clone(), AgentConfig::default());

        let result = agent.run("loop forever").await;

        assert_eq!(result.outcome, RunOutcome::RepetitionAborted);
        assert_eq!(result.iterations, 3);
        assert_eq!(model.calls(), 3);
        assert_eq!(result.steps.len(), 2);
        assert!(result.steps.iter().all(|s| s.observation.is_some()));
        assert!(result.answer.contains("`echo`"));
        assert!(result.answer.contains("tool [echo] succeeded. result: same"));
        assert_eq!(agent.history().len(), 2);
    }

    #[tokio::test]
    async fn test_two_identical_actions_are_tolerated() {
        let model = Arc::new(ScriptedModel::new([echo("same"), echo("same"), echo("other"), answer("ok")]));
        let mut agent = agent_with(model, AgentConfig::default());

        let result = agent.run("retry once").await;
        assert_eq!(result.outcome, RunOutcome::Answered);
        assert_eq!(result.steps.len(), 4);
    }

    #[tokio::test]
    async fn test_non_json_reply_becomes_error_answer() {
        let model = Arc::new(ScriptedModel::new(["Sure! Let me read that file for you."]));
        let mut agent = agent_with(model, AgentConfig::default());

        let result = agent.run("read it").await;

        assert_eq!(result.outcome, RunOutcome::Failed);
        assert!(result.answer.starts_with("Error:"));
        assert!(result.answer.contains("not valid JSON"));
        assert!(result.steps.is_empty());
        assert_eq!(agent.history().len(), 2);
    }

    #[tokio::test]
    async fn test_iteration_budget_exhaustion() {
        let model = Arc::new(ScriptedModel::new([echo("one"), echo("two"), answer("too late")]));
        let config = AgentConfig {
            max_iterations: 2,
            ..AgentConfig::default()
        };
        let mut agent = agent_with(model.clone(), config);

        let result = agent.run("count").await;

        assert_eq!(result.outcome, RunOutcome::IterationBudgetExhausted);
        assert_eq!(result.steps.len(), 2);
        assert_eq!(model.calls(), 2);
        assert_eq!(
            result.answer,
            "I could not complete this request within the iteration budget (2 steps)."
        );
    }

    #[tokio::test]
    async fn test_unknown_tool_is_fed_back() {
        let bad = json!({"thought": "try", "action": "teleport", "action_input": {}}).to_string();
        let model = Arc::new(ScriptedModel::new([bad, answer("recovered")]));
        let mut agent = agent_with(model, AgentConfig::default());

        let result = agent.run("go").await;

        assert_eq!(result.outcome, RunOutcome::Answered);
        let observation = result.steps[0].observation.as_deref().unwrap();
        assert!(observation.starts_with("tool [teleport] failed. error: unknown tool `teleport`"));
        assert!(observation.contains("echo, broken"));
    }

    #[tokio::test]
    async fn test_tool_error_and_invalid_input_are_observations() {
        let broken = json!({"thought": "t", "action": "broken", "action_input": {}}).to_string();
        let invalid = json!({"thought": "t", "action": "echo", "action_input": {"text": 7}}).to_string();
        let model = Arc::new(ScriptedModel::new([broken, invalid, answer("gave up")]));
        let mut agent = agent_with(model, AgentConfig::default());

        let result = agent.run("break things").await;

        assert_eq!(result.outcome, RunOutcome::Answered);
        assert_eq!(
            result.steps[0].observation.as_deref(),
            Some("tool [broken] failed. error: disk on fire")
        );
        assert!(result.steps[1]
            .observation
            .as_deref()
            .unwrap()
            .contains("invalid input: field `text` must be string"));
    }

    #[tokio::test]
    async fn test_decision_without_action_or_answer_fails() {
        let model = Arc::new(ScriptedModel::new([json!({"thought": "pondering"}).to_string()]));
        let mut agent = agent_with(model, AgentConfig::default());

        let result = agent.run("?").await;
        assert_eq!(result.outcome, RunOutcome::Failed);
        assert!(result.answer.contains("neither an action nor a final answer"));
    }

    #[tokio::test]
    async fn test_model_error_becomes_error_answer() {
        let model = Arc::new(ScriptedModel::failing("connection refused"));
        let mut agent = agent_with(model, AgentConfig::default());

        let result = agent.run("anything").await;
        assert_eq!(result.outcome, RunOutcome::Failed);
        assert!(result.answer.contains("connection refused"));
        assert_eq!(agent.history().len(), 2);
    }

    #[tokio::test]
    async fn test_history_is_sent_on_later_runs() {
        let model = Arc::new(ScriptedModel::new([answer("first"), answer("second")]));
        let mut agent = agent_with(model.clone(), AgentConfig::default());

        agent.run("q1").await;
        agent.run("q2").await;

        let second = &model.requests()[1].messages;
        assert_eq!(second.len(), 3);
        assert_eq!(second[0].content, "q1");
        assert!(second[1].content.contains("first"));
        assert!(second[2].content.starts_with("Question: q2"));
        assert_eq!(agent.history_summary(), "2 rounds, 4 messages");

        agent.clear_history();
        assert!(agent.history().is_empty());
        assert_eq!(agent.history_summary(), "No conversation history.");
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let model = Arc::new(ScriptedModel::new(Vec::<String>::new()));
        let config = AgentConfig {
            model: String::new(),
            ..AgentConfig::default()
        };
        assert!(Agent::new(&config, registry(), model).is_err());
    }

    #[test]
    fn test_repeats_previous_compares_serialized_input() {
        let steps = vec![
            Step::acted("a", "echo", json!({"a": 1, "b": 2}), "o"),
            Step::acted("b", "echo", json!({"a": 1, "b": 2}), "o"),
        ];
        assert!(repeats_previous(&steps, "echo", &json!({"a": 1, "b": 2})));
        assert!(!repeats_previous(&steps, "echo", &json!({"a": 2, "b": 2})));
        assert!(!repeats_previous(&steps[..1], "echo", &json!({"a": 1, "b": 2})));
    }
}
