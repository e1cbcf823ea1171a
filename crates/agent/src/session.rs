//! Conversational session: re-enters the ReAct loop turn after turn.
//!
//! A turn is one `ask`. In auto mode the session ends after the first turn;
//! otherwise a [`Prompter`] is asked for the next message and an empty answer
//! ends the session. Steps from earlier turns are handed to later turns as
//! their previous-history blob.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::history::HistoryStep;
use crate::react::{ReactAgent, Termination};
use crate::state::AskRequest;
use crate::stream_event::AgentStreamEvent;

/// Source of follow-up messages between turns.
#[async_trait]
pub trait Prompter: Send {
    /// The next user message, or `None` when the user is done.
    async fn next_message(&mut self) -> Option<String>;
}

/// Replays a fixed list of answers.
#[async_trait]
impl Prompter for std::collections::VecDeque<String> {
    async fn next_message(&mut self) -> Option<String> {
        self.pop_front()
    }
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub context: Option<serde_json::Value>,
    /// Caller-supplied history blob for the first turn.
    pub previous_history: Option<String>,
    pub auto_mode: bool,
    /// Upper bound on turns, whatever the prompter says.
    pub max_turns: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            context: None,
            previous_history: None,
            auto_mode: false,
            max_turns: 50,
        }
    }
}

/// What a whole session produced.
#[derive(Debug)]
pub struct SessionOutcome {
    /// Every step of every turn, in order.
    pub steps: Vec<HistoryStep>,
    pub turns: usize,
    /// How the last turn ended.
    pub termination: Option<Termination>,
}

pub struct Session {
    agent: ReactAgent,
    options: SessionOptions,
}

impl Session {
    pub fn new(agent: ReactAgent, options: SessionOptions) -> Self {
        Self { agent, options }
    }

    pub async fn run(
        &self,
        first_message: impl Into<String>,
        prompter: &mut impl Prompter,
        mut on_event: impl FnMut(&AgentStreamEvent),
    ) -> SessionOutcome {
        let mut message = first_message.into();
        let mut previous = self.options.previous_history.clone();
        let mut outcome = SessionOutcome {
            steps: Vec::new(),
            turns: 0,
            termination: None,
        };

        while outcome.turns < self.options.max_turns {
            outcome.turns += 1;
            debug!(turn = outcome.turns, "Session turn starting");

            let request = AskRequest {
                message,
                context: self.options.context.clone(),
                previous_history: previous.clone(),
                auto_mode: self.options.auto_mode,
            };
            let (termination, state) = self.agent.run_observed(request, &mut on_event).await;
            outcome.termination = Some(termination);

            previous = carry_forward(previous.as_deref(), &state.history);
            outcome.steps.extend(state.history);

            if self.options.auto_mode {
                break;
            }
            match prompter.next_message().await {
                Some(next) if !next.trim().is_empty() => message = next,
                _ => break,
            }
        }

        info!(
            turns = outcome.turns,
            steps = outcome.steps.len(),
            "Session finished"
        );
        outcome
    }
}

/// Append `steps` to a history blob.
///
/// A blob holding a JSON array is extended in place. Any other blob is kept
/// as text with the new steps' array after it.
pub fn carry_forward(previous: Option<&str>, steps: &[HistoryStep]) -> Option<String> {
    if steps.is_empty() {
        return previous.map(str::to_string);
    }

    let new_steps: Vec<serde_json::Value> = steps
        .iter()
        .filter_map(|s| serde_json::to_value(s).ok())
        .collect();

    let blob = match previous.map(str::trim).filter(|p| !p.is_empty()) {
        None => serde_json::Value::Array(new_steps).to_string(),
        Some(text) => match serde_json::from_str::<serde_json::Value>(text) {
            Ok(serde_json::Value::Array(mut earlier)) => {
                earlier.extend(new_steps);
                serde_json::Value::Array(earlier).to_string()
            }
            _ => format!("{text}\n{}", serde_json::Value::Array(new_steps)),
        },
    };
    Some(blob)
}
