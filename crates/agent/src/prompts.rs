//! Prompt templates for the three model calls of an iteration.
//!
//! Templates use `{{KEY}}` placeholders. Rendering is a single pass, so text
//! substituted into a placeholder is never expanded again.

use std::collections::BTreeMap;

use reagent_core::skill::SkillDefinition;

/// Placeholder values keyed by name.
pub type PromptVars = BTreeMap<&'static str, String>;

/// Reasoning call: pick the next thought and action, or finish.
pub const REACT_PROMPT: &str = r#"You are {{SERVICE_NAME}}, an assistant that solves tasks by reasoning step by step and using skills.

## Available skills
{{TOOLS}}

## Domain terminology
{{SERVICE_JARGON}}

## Context
{{CONTEXT}}

## Previous conversation steps
{{PREVIOUS_EXECUTION_HISTORY}}

## Steps taken so far for this request
{{EXECUTION_HISTORY}}

## User request
{{QUERY}}

Auto mode: {{AUTO_MODE}}. When auto mode is true, never ask the user a question; make the most reasonable assumption and continue.

Respond using these tags:
<thought>your reasoning about what to do next</thought>
<message>what the user should read at this point (optional)</message>

Then exactly one of:
- <action>skill_name</action> to use one of the available skills
- <final_response> when the request is fully answered (put the answer in <message>)
- <question_response> when you need more information from the user (put the question in <message>)

Only choose skills from the list above. Do not write the skill input here."#;

/// Action-input call: produce arguments for the selected skill.
pub const ACTION_PROMPT: &str = r#"You are {{SERVICE_NAME}}. You decided to use a skill and must now provide its input.

## User request
{{QUERY}}

## Context
{{CONTEXT}}

## Previous conversation steps
{{PREVIOUS_EXECUTION_HISTORY}}

## Steps taken so far for this request
{{EXECUTION_HISTORY}}

## Your reasoning
{{THOUGHT_PROCESS}}

## Selected skill
{{SELECTED_ACTION}}

Auto mode: {{AUTO_MODE}}.

Reply with the skill input as a single JSON object matching the input schema, wrapped in tags:
<action_input>{"param": "value"}</action_input>"#;

/// Observation call: summarize the skill result.
pub const OBSERVATION_PROMPT: &str = r#"You are {{SERVICE_NAME}}. A skill has just run on your behalf.

## User request
{{QUERY}}

## Steps taken so far for this request
{{EXECUTION_HISTORY}}

## Your reasoning
{{THOUGHT}}

## Skill
{{ACTION_NAME}}

## Skill input
{{ACTION_INPUT}}

## Skill result
{{API_RESPONSE}}

Summarize what the result tells you about the request, keeping every detail needed for the next step:
<observation>your summary</observation>"#;

/// Substitute `{{KEY}}` placeholders. Unknown keys render as empty text.
pub fn render(template: &str, vars: &PromptVars) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        let Some(close) = rest[open + 2..].find("}}") else {
            break;
        };
        out.push_str(&rest[..open]);
        let key = rest[open + 2..open + 2 + close].trim();
        if let Some(value) = vars.get(key) {
            out.push_str(value);
        }
        rest = &rest[open + 2 + close + 2..];
    }

    out.push_str(rest);
    out
}

/// The skill catalogue: one entry per skill with its input schema.
pub fn format_skills(skills: &[SkillDefinition]) -> String {
    if skills.is_empty() {
        return "No skills are available.".into();
    }
    skills
        .iter()
        .map(|s| format!("- {}: {}\n  Input schema: {}", s.name, s.description, s.input_schema))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A single skill with its full schema, for the action-input call.
pub fn format_skill(skill: &SkillDefinition) -> String {
    let schema = serde_json::to_string_pretty(&skill.input_schema)
        .unwrap_or_else(|_| skill.input_schema.to_string());
    format!(
        "Name: {}\nDescription: {}\nInput schema:\n{}",
        skill.name, skill.description, schema
    )
}

/// Caller context as `- key: value` lines.
pub fn format_context(context: Option<&serde_json::Value>) -> String {
    match context {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::Object(map)) => map
            .iter()
            .map(|(k, v)| format!("- {k}: {}", plain(v)))
            .collect::<Vec<_>>()
            .join("\n"),
        Some(other) => plain(other),
    }
}

fn plain(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
