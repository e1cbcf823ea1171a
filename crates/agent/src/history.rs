//! Step history: what each ReAct iteration decided and observed.
//!
//! A [`HistoryStep`] is serialized into `STEP` events and, between turns,
//! handed back to the agent as the previous-history blob, so its JSON shape
//! is part of the caller contract.

use reagent_core::provider::Usage;
use serde::{Deserialize, Serialize};

/// Tokens spent by all model calls of one step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCount {
    #[serde(rename = "inputTokens")]
    pub input_tokens: u32,

    #[serde(rename = "outputToken")]
    pub output_tokens: u32,
}

impl TokenCount {
    pub fn absorb(&mut self, usage: &Usage) {
        self.input_tokens += usage.prompt_tokens;
        self.output_tokens += usage.completion_tokens;
    }

    pub fn merge(&mut self, other: &TokenCount) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }

    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// One completed iteration of the loop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStep {
    #[serde(default)]
    pub thought: String,

    /// Chosen skill, empty when none.
    #[serde(default)]
    pub skill: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_input: Option<serde_json::Value>,

    /// Text for the end user, including any skill marker.
    #[serde(default)]
    pub user_message: String,

    #[serde(default)]
    pub is_question: bool,

    #[serde(default)]
    pub is_final: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation: Option<String>,

    #[serde(default)]
    pub token_count: TokenCount,
}

/// Render steps the way the reasoning prompt expects them.
///
/// ```text
/// Step 1:
/// Thought: …
/// Action: get_weather
/// Action Input: {"location":"Paris"}
/// Observation: …
/// ```
pub fn format_history(steps: &[HistoryStep]) -> String {
    let mut out = String::new();
    for (i, step) in steps.iter().enumerate() {
        let input = step
            .skill_input
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_default();
        out.push_str(&format!("Step {}:\n", i + 1));
        out.push_str(&format!("Thought: {}\n", or_na(&step.thought)));
        out.push_str(&format!("Action: {}\n", or_na(&step.skill)));
        out.push_str(&format!("Action Input: {}\n", or_na(&input)));
        out.push_str(&format!(
            "Observation: {}\n\n",
            or_na(step.observation.as_deref().unwrap_or_default())
        ));
    }
    out
}

fn or_na(value: &str) -> &str {
    if value.is_empty() { "N/A" } else { value }
}
