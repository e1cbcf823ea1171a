//! Agent-level streaming events.
//!
//! `AgentStreamEvent` is what callers of the ReAct loop consume: lifecycle
//! markers for each tagged segment of the model output, one `STEP` per
//! finished iteration, and the `STREAM_START` / `STREAM_END` bracket.
//!
//! Wire format (one JSON object per event):
//!
//! ```json
//! {"type":"THOUGHT_CHUNK","message":"I should check the"}
//! {"type":"SKILL_CHUNK","message":"{\"location\":","skillId":"5f0c…"}
//! ```

use serde::{Deserialize, Serialize};

/// The `type` field of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentEventKind {
    StreamStart,
    ThoughtStart,
    ThoughtChunk,
    ThoughtEnd,
    MessageStart,
    MessageChunk,
    MessageEnd,
    SkillStart,
    SkillChunk,
    SkillEnd,
    /// A completed iteration; the message is the serialized `HistoryStep`.
    Step,
    Error,
    StreamEnd,
}

impl AgentEventKind {
    /// Wire name for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StreamStart => "STREAM_START",
            Self::ThoughtStart => "THOUGHT_START",
            Self::ThoughtChunk => "THOUGHT_CHUNK",
            Self::ThoughtEnd => "THOUGHT_END",
            Self::MessageStart => "MESSAGE_START",
            Self::MessageChunk => "MESSAGE_CHUNK",
            Self::MessageEnd => "MESSAGE_END",
            Self::SkillStart => "SKILL_START",
            Self::SkillChunk => "SKILL_CHUNK",
            Self::SkillEnd => "SKILL_END",
            Self::Step => "STEP",
            Self::Error => "ERROR",
            Self::StreamEnd => "STREAM_END",
        }
    }

    pub fn is_thought(&self) -> bool {
        matches!(
            self,
            Self::ThoughtStart | Self::ThoughtChunk | Self::ThoughtEnd
        )
    }
}

impl std::fmt::Display for AgentEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Start / chunk / end kinds for one tagged segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagKinds {
    pub start: AgentEventKind,
    pub chunk: AgentEventKind,
    pub end: AgentEventKind,
}

impl TagKinds {
    pub const THOUGHT: Self = Self {
        start: AgentEventKind::ThoughtStart,
        chunk: AgentEventKind::ThoughtChunk,
        end: AgentEventKind::ThoughtEnd,
    };

    pub const MESSAGE: Self = Self {
        start: AgentEventKind::MessageStart,
        chunk: AgentEventKind::MessageChunk,
        end: AgentEventKind::MessageEnd,
    };

    pub const SKILL: Self = Self {
        start: AgentEventKind::SkillStart,
        chunk: AgentEventKind::SkillChunk,
        end: AgentEventKind::SkillEnd,
    };
}

/// Events emitted by the agent during an `ask`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStreamEvent {
    #[serde(rename = "type")]
    pub kind: AgentEventKind,

    pub message: String,

    /// Correlates skill-input events and markers with a history step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_id: Option<String>,
}

impl AgentStreamEvent {
    pub fn new(kind: AgentEventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            skill_id: None,
        }
    }

    pub fn with_skill_id(mut self, skill_id: Option<String>) -> Self {
        self.skill_id = skill_id;
        self
    }

    pub fn stream_start() -> Self {
        Self::new(AgentEventKind::StreamStart, "Starting process")
    }

    pub fn stream_end() -> Self {
        Self::new(AgentEventKind::StreamEnd, "Stream ended")
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(AgentEventKind::Error, message)
    }

    /// One JSON line, as printed by `ask --print`.
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"type":"ERROR","message":"unserializable event: {}"}}"#,
                e.to_string().replace('"', "'")
            )
        })
    }
}
