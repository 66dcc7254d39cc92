//! Conversation memory across questions.
//!
//! Each resolved question is stored as a user/assistant pair. The assistant
//! side is a flattened narrative of the tools used plus the final answer,
//! not the raw steps. Once the history outgrows its round budget the oldest
//! whole rounds are folded into a single summary message at the front.

use crate::types::{ChatMessage, ChatRole, Step};
use tracing::debug;

/// First line of the synthetic summary message.
pub const SUMMARY_HEADER: &str = "Summary of earlier conversation:";

/// Share of the message budget kept verbatim after compression.
const KEEP_RATIO: f64 = 0.6;
/// Summary entries kept after folding; the oldest are dropped first.
const MAX_SUMMARY_ENTRIES: usize = 20;
const QUESTION_CAP: usize = 80;
const ANSWER_CAP: usize = 100;
const ANSWER_MARKER: &str = "answer:";

#[derive(Debug, Clone)]
pub struct ConversationMemory {
    messages: Vec<ChatMessage>,
    max_rounds: usize,
}

impl ConversationMemory {
    pub fn new(max_rounds: usize) -> Self {
        Self {
            messages: Vec::new(),
            max_rounds: max_rounds.max(1),
        }
    }

    /// Store one resolved question and compress if over budget.
    pub fn record(&mut self, question: &str, answer: &str, steps: &[Step]) {
        self.messages.push(ChatMessage::user(question));
        self.messages.push(ChatMessage::assistant(narrate(answer, steps)));
        self.compress_if_needed();
    }

    /// Fold the oldest whole rounds into the summary message when the stored
    /// count exceeds `max_rounds * 2`. Returns whether anything changed.
    pub fn compress_if_needed(&mut self) -> bool {
        let limit = self.max_rounds * 2;
        let total = self.messages.len();
        if total <= limit {
            return false;
        }

        let keep = (limit as f64 * KEEP_RATIO).floor() as usize;
        let excess = total - keep;
        // An existing summary is always folded; after it only whole pairs.
        let has_summary = self.has_summary();
        let lead = usize::from(has_summary);
        let pairs = excess.saturating_sub(lead) / 2;
        if pairs == 0 {
            return false;
        }
        let count = lead + pairs * 2;

        let folded: Vec<ChatMessage> = self.messages.drain(..count).collect();
        let mut lines = vec![SUMMARY_HEADER.to_string()];
        let rounds = if has_summary {
            lines.extend(
                folded[0]
                    .content
                    .lines()
                    .skip(1)
                    .map(str::to_string),
            );
            &folded[1..]
        } else {
            &folded[..]
        };
        for pair in rounds.chunks(2) {
            let question = truncate(&pair[0].content, QUESTION_CAP);
            let answer = truncate(extract_answer(&pair[1].content), ANSWER_CAP);
            lines.push(format!("- Q: {} | A: {}", question, answer));
        }
        let overflow = (lines.len() - 1).saturating_sub(MAX_SUMMARY_ENTRIES);
        lines.drain(1..1 + overflow);

        self.messages.insert(0, ChatMessage::assistant(lines.join("\n")));
        debug!(
            "Compressed {} messages into summary ({} -> {} messages)",
            count,
            total,
            self.messages.len()
        );
        true
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Copy of the stored messages, oldest first.
    pub fn history(&self) -> Vec<ChatMessage> {
        self.messages.clone()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// `messages[0]` is a compression summary.
    fn has_summary(&self) -> bool {
        self.messages.first().is_some_and(is_summary)
    }

    pub fn summary(&self) -> String {
        if self.messages.is_empty() {
            return "No conversation history.".to_string();
        }
        let has_summary = self.has_summary();
        let rounds = (self.messages.len() - usize::from(has_summary)) / 2;
        let mut text = format!("{} rounds, {} messages", rounds, self.messages.len());
        if has_summary {
            text.push_str(" (earlier rounds summarized)");
        }
        text
    }
}

/// Flatten a run into the assistant message kept in memory.
fn narrate(answer: &str, steps: &[Step]) -> String {
    let mut lines: Vec<String> = steps
        .iter()
        .filter_map(|step| match (&step.action, &step.observation) {
            (Some(action), Some(observation)) => {
                Some(format!("used tool `{}`, obtained: `{}`", action, observation))
            }
            _ => None,
        })
        .collect();
    lines.push(format!("{} {}", ANSWER_MARKER, answer));
    lines.join("\n")
}

/// Text after the last `answer:` marker, or the whole text if there is none.
fn extract_answer(content: &str) -> &str {
    // ASCII lowercasing keeps byte offsets aligned with `content`.
    match content.to_ascii_lowercase().rfind(ANSWER_MARKER) {
        Some(i) => content[i + ANSWER_MARKER.len()..].trim(),
        None => content.trim(),
    }
}

fn truncate(text: &str, cap: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= cap {
        return flat;
    }
    let mut out: String = flat.chars().take(cap).collect();
    out.push_str("...");
    out
}

/// Whether `message` is a compression summary rather than a real turn.
fn is_summary(message: &ChatMessage) -> bool {
    message.role == ChatRole::Assistant && message.content.starts_with(SUMMARY_HEADER)
}
