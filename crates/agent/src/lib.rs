//! The ReAct loop — the heart of Reagent.
//!
//! The agent follows a **Reason → Act → Observe** cycle:
//!
//! 1. **Reason**: stream the model's thought and user message, and read the
//!    chosen skill or terminal marker out of the response
//! 2. **Act**: ask the model for the skill's JSON input and run the skill
//! 3. **Observe**: have the model digest the skill output
//! 4. Record the step and loop back to 1
//!
//! The loop ends on a final answer, a question for the user, an error, or the
//! iteration ceiling. Everything the caller sees arrives as
//! [`AgentStreamEvent`]s.

pub mod history;
pub mod profile;
pub mod prompts;
pub mod react;
pub mod session;
pub mod state;
pub mod stream_event;
pub mod tag;

#[cfg(test)]
mod test_helpers;

pub use history::{HistoryStep, TokenCount, format_history};
pub use profile::AgentProfile;
pub use react::{EventSink, ReactAgent, ReactResult, Termination};
pub use session::{Prompter, Session, SessionOptions, SessionOutcome};
pub use state::{AskRequest, ExecutionState};
pub use stream_event::{AgentEventKind, AgentStreamEvent, TagKinds};
pub use tag::{TagExtractor, TagScanState, capture_tag};
