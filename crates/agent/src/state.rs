//! Execution state of one `ask`.

use crate::history::{HistoryStep, TokenCount};

/// What the caller hands to the agent for one turn.
#[derive(Debug, Clone, Default)]
pub struct AskRequest {
    pub message: String,

    /// Arbitrary caller context; objects are rendered as `- key: value` lines.
    pub context: Option<serde_json::Value>,

    /// Serialized steps of earlier turns, passed through to the prompt verbatim.
    pub previous_history: Option<String>,

    pub auto_mode: bool,
}

impl AskRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn with_previous_history(mut self, history: impl Into<String>) -> Self {
        self.previous_history = Some(history.into());
        self
    }

    pub fn with_auto_mode(mut self, auto_mode: bool) -> Self {
        self.auto_mode = auto_mode;
        self
    }
}

/// Mutable context of a single `ask`. History is append-only.
#[derive(Debug, Clone)]
pub struct ExecutionState {
    pub query: String,
    pub context: Option<serde_json::Value>,
    pub previous_history: Option<String>,
    pub history: Vec<HistoryStep>,
    pub completed: bool,
    pub auto_mode: bool,
}

impl ExecutionState {
    pub fn new(request: AskRequest) -> Self {
        Self {
            query: request.message,
            context: request.context,
            previous_history: request.previous_history,
            history: Vec::new(),
            completed: false,
            auto_mode: request.auto_mode,
        }
    }

    /// Append a finished step; a final step also completes the run.
    pub fn record(&mut self, step: HistoryStep) {
        if step.is_final {
            self.completed = true;
        }
        self.history.push(step);
    }

    pub fn tokens_used(&self) -> TokenCount {
        let mut total = TokenCount::default();
        for step in &self.history {
            total.merge(&step.token_count);
        }
        total
    }
}
