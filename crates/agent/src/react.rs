//! ReAct loop — Reason → Act → Observe.
//!
//! Every iteration makes up to three streamed model calls:
//!
//! 1. **Reasoning**: the model thinks (`<thought>`), optionally talks to the
//!    user (`<message>`), and either picks a skill (`<action>`) or ends the
//!    turn (`<final_response>` / `<question_response>`).
//! 2. **Action input**: the model writes JSON arguments for the chosen skill
//!    (`<action_input>`), which is then run.
//! 3. **Observation**: the model digests the skill output (`<observation>`).
//!
//! Each finished iteration becomes a [`HistoryStep`] that is emitted as a
//! `STEP` event and fed into the next reasoning prompt. The loop stops on a
//! final answer, a question for the user, an error, or when the iteration
//! ceiling is hit.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use reagent_core::error::{Error, SkillError};
use reagent_core::event::{DomainEvent, EventBus};
use reagent_core::message::Message;
use reagent_core::provider::{Provider, ProviderRequest};
use reagent_core::skill::SkillRegistry;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::history::{HistoryStep, TokenCount, format_history};
use crate::profile::AgentProfile;
use crate::prompts::{
    ACTION_PROMPT, OBSERVATION_PROMPT, PromptVars, REACT_PROMPT, format_context, format_skill,
    format_skills, render,
};
use crate::state::{AskRequest, ExecutionState};
use crate::stream_event::{AgentEventKind, AgentStreamEvent, TagKinds};
use crate::tag::{TagExtractor, capture_tag};

/// Capacity of the caller-facing event channel.
pub const EVENT_BUFFER: usize = 128;

const FINAL_MARKER: &str = "<final_response>";
const QUESTION_MARKER: &str = "<question_response>";

/// Where the loop delivers its events.
pub type EventSink = mpsc::Sender<AgentStreamEvent>;

/// Why a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The model gave its final answer.
    Final,
    /// The model is waiting on the user.
    Question,
    /// The iteration ceiling was reached.
    Exhausted,
    /// An iteration failed; an `ERROR` event was emitted.
    Failed,
    /// The event receiver was dropped.
    Cancelled,
}

/// The result of a ReAct execution.
#[derive(Debug)]
pub struct ReactResult {
    /// Every event, `STREAM_START` through `STREAM_END`.
    pub events: Vec<AgentStreamEvent>,
    /// Steps recorded during this run.
    pub history: Vec<HistoryStep>,
    pub completed: bool,
    pub termination: Termination,
}

/// What the reasoning call asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decision {
    Final,
    Question,
    Act,
    /// Neither a skill nor a terminal marker: record and reason again.
    Continue,
}

/// Where the loop is within an iteration.
enum Phase {
    Reasoning,
    Acting(HistoryStep),
    Observing {
        step: HistoryStep,
        raw_input: String,
        output: String,
    },
    Recording(HistoryStep),
}

/// The ReAct agent.
#[derive(Clone)]
pub struct ReactAgent {
    /// LLM provider.
    provider: Arc<dyn Provider>,
    /// Model name.
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    skills: Arc<SkillRegistry>,
    profile: AgentProfile,
    /// Maximum recorded iterations per ask.
    max_iterations: u32,
    /// Skills hidden from the model and refused if chosen anyway.
    excluded_skills: Vec<String>,
    event_bus: Option<Arc<EventBus>>,
}

impl ReactAgent {
    /// Create a new ReAct agent.
    pub fn new(
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
        skills: Arc<SkillRegistry>,
        profile: AgentProfile,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            skills,
            profile,
            max_iterations: 10,
            excluded_skills: Vec::new(),
            event_bus: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the default max tokens per LLM response.
    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }

    /// Set max iterations.
    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_excluded_skills(mut self, skills: Vec<String>) -> Self {
        self.excluded_skills = skills;
        self
    }

    /// Publish usage, skill timings and failures to an event bus.
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    /// Start a run on a background task and stream its events.
    ///
    /// The receiver yields `STREAM_START` first and `STREAM_END` last, then
    /// closes.
    pub fn ask_agent(&self, request: AskRequest) -> mpsc::Receiver<AgentStreamEvent> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let agent = self.clone();

        tokio::spawn(async move {
            let mut state = ExecutionState::new(request);
            agent.execute(&mut state, tx).await;
        });

        rx
    }

    /// Run to completion in place, collecting every event.
    pub async fn run(&self, request: AskRequest) -> ReactResult {
        let mut events = Vec::new();
        let (termination, state) = self
            .run_observed(request, |event| events.push(event.clone()))
            .await;

        ReactResult {
            events,
            history: state.history,
            completed: state.completed,
            termination,
        }
    }

    /// Run to completion in place, handing each event to `on_event` as it
    /// is produced.
    pub async fn run_observed(
        &self,
        request: AskRequest,
        mut on_event: impl FnMut(&AgentStreamEvent),
    ) -> (Termination, ExecutionState) {
        let mut state = ExecutionState::new(request);
        let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);

        let forward = async {
            while let Some(event) = rx.recv().await {
                on_event(&event);
            }
        };
        let (termination, ()) = tokio::join!(self.execute(&mut state, tx), forward);

        (termination, state)
    }

    /// The loop itself. Emits `STREAM_START` first and `STREAM_END` last.
    pub async fn execute(&self, state: &mut ExecutionState, events: EventSink) -> Termination {
        info!(
            model = %self.model,
            agent = %self.profile.name,
            max_iter = self.max_iterations,
            "ReAct loop starting"
        );
        let _ = events.send(AgentStreamEvent::stream_start()).await;

        let termination = match self.drive(state, &events).await {
            Ok(termination) => termination,
            Err(e) => {
                warn!(error = %e, steps = state.history.len(), "ReAct iteration failed");
                self.publish(DomainEvent::ErrorOccurred {
                    context: format!("iteration {}", state.history.len() + 1),
                    error_message: e.to_string(),
                    timestamp: Utc::now(),
                });
                let _ = events.send(AgentStreamEvent::error(e.to_string())).await;
                Termination::Failed
            }
        };

        let _ = events.send(AgentStreamEvent::stream_end()).await;
        let tokens = state.tokens_used();
        info!(
            ?termination,
            steps = state.history.len(),
            completed = state.completed,
            input_tokens = tokens.input_tokens,
            output_tokens = tokens.output_tokens,
            "ReAct loop finished"
        );
        termination
    }

    async fn drive(
        &self,
        state: &mut ExecutionState,
        events: &EventSink,
    ) -> Result<Termination, Error> {
        let mut iterations = 0u32;
        let mut phase = Phase::Reasoning;

        loop {
            phase = match phase {
                Phase::Reasoning => {
                    if events.is_closed() {
                        debug!(steps = state.history.len(), "Event receiver dropped; stopping");
                        return Ok(Termination::Cancelled);
                    }
                    if iterations >= self.max_iterations {
                        warn!("ReAct: max iterations reached ({})", self.max_iterations);
                        return Ok(Termination::Exhausted);
                    }
                    debug!(iteration = iterations + 1, "ReAct iteration");

                    let (step, decision) = self.reason(state, events).await?;
                    match decision {
                        Decision::Final => {
                            self.commit(state, step, events).await?;
                            return Ok(Termination::Final);
                        }
                        Decision::Question => {
                            self.commit(state, step, events).await?;
                            return Ok(Termination::Question);
                        }
                        Decision::Act => Phase::Acting(step),
                        Decision::Continue => {
                            debug!("No action and no terminal marker; reasoning again");
                            Phase::Recording(step)
                        }
                    }
                }

                Phase::Acting(mut step) => {
                    let (input, raw_input) = self.action_input(state, &mut step, events).await?;
                    let output = self.run_skill(&step.skill, input.clone()).await?;
                    step.skill_input = Some(input);
                    Phase::Observing {
                        step,
                        raw_input,
                        output,
                    }
                }

                Phase::Observing {
                    mut step,
                    raw_input,
                    output,
                } => {
                    let observation = self
                        .observe(state, &mut step, &raw_input, &output, events)
                        .await?;
                    step.observation = Some(observation);
                    Phase::Recording(step)
                }

                Phase::Recording(step) => {
                    self.commit(state, step, events).await?;
                    iterations += 1;
                    Phase::Reasoning
                }
            };
        }
    }

    /// Reasoning call: thought, user message, and what to do next.
    async fn reason(
        &self,
        state: &ExecutionState,
        events: &EventSink,
    ) -> Result<(HistoryStep, Decision), Error> {
        let mut vars = self.shared_vars(state);
        vars.insert(
            "TOOLS",
            format_skills(&self.skills.catalogue(&self.excluded_skills)),
        );
        vars.insert("SERVICE_JARGON", self.profile.terms.clone());
        let prompt = render(REACT_PROMPT, &vars);

        let mut thought = TagExtractor::for_tag("thought", TagKinds::THOUGHT);
        let mut message = TagExtractor::for_tag("message", TagKinds::MESSAGE);
        let mut tokens = TokenCount::default();
        let text = self
            .generate(
                "reasoning",
                prompt,
                &mut [&mut thought, &mut message],
                events,
                &mut tokens,
            )
            .await?;

        let skill = capture_tag(&text, "<action>", "</action>").unwrap_or_default();
        let is_final = text.contains(FINAL_MARKER);
        let is_question = !is_final && text.contains(QUESTION_MARKER);

        let mut step = HistoryStep {
            thought: thought.state().emitted().to_string(),
            skill: skill.to_string(),
            user_message: message.state().emitted().to_string(),
            is_final,
            is_question,
            token_count: tokens,
            ..Default::default()
        };

        if !step.skill.is_empty() {
            let skill_id = Uuid::new_v4().to_string();
            let marker = format!(
                "\n<skill id=\"{skill_id}\" name=\"{}\" agent=\"{}\"></skill>\n",
                step.skill,
                self.profile.marker_name()
            );
            for event in [
                AgentStreamEvent::new(AgentEventKind::MessageStart, ""),
                AgentStreamEvent::new(AgentEventKind::MessageChunk, marker.as_str()),
                AgentStreamEvent::new(AgentEventKind::MessageEnd, ""),
            ] {
                let _ = events.send(event).await;
            }
            step.user_message.push_str(&marker);
            step.skill_id = Some(skill_id);
        }

        let decision = if is_final {
            Decision::Final
        } else if is_question {
            Decision::Question
        } else if !step.skill.is_empty() {
            Decision::Act
        } else {
            Decision::Continue
        };
        debug!(?decision, skill = %step.skill, "Reasoning complete");

        Ok((step, decision))
    }

    /// Action-input call. Returns the parsed input and its raw text.
    async fn action_input(
        &self,
        state: &ExecutionState,
        step: &mut HistoryStep,
        events: &EventSink,
    ) -> Result<(serde_json::Value, String), Error> {
        let definition = self
            .excluded_skills
            .iter()
            .all(|x| *x != step.skill)
            .then(|| self.skills.definition(&step.skill))
            .flatten()
            .ok_or_else(|| SkillError::NotFound(step.skill.clone()))?;

        let mut vars = self.shared_vars(state);
        vars.insert("THOUGHT_PROCESS", step.thought.clone());
        vars.insert("SELECTED_ACTION", format_skill(&definition));
        let prompt = render(ACTION_PROMPT, &vars);

        let mut extractor = TagExtractor::for_tag("action_input", TagKinds::SKILL)
            .with_skill_id(step.skill_id.clone().unwrap_or_default());
        let text = self
            .generate(
                "action_input",
                prompt,
                &mut [&mut extractor],
                events,
                &mut step.token_count,
            )
            .await?;

        let raw = extractor.finish().ok_or_else(|| Error::MalformedSkillInput {
            skill: step.skill.clone(),
            reason: if text.contains("<action_input>") {
                "<action_input> was never closed".into()
            } else {
                "response has no <action_input> block".into()
            },
        })?;

        let input = serde_json::from_str(&raw).map_err(|e| Error::MalformedSkillInput {
            skill: step.skill.clone(),
            reason: e.to_string(),
        })?;
        debug!(skill = %step.skill, "Parsed skill input");

        Ok((input, raw))
    }

    async fn run_skill(&self, name: &str, input: serde_json::Value) -> Result<String, Error> {
        let start = Instant::now();
        let result = self.skills.run_skill(name, input).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        debug!(skill = %name, success = result.is_ok(), duration_ms, "Skill finished");
        self.publish(DomainEvent::SkillExecuted {
            skill_name: name.to_string(),
            success: result.is_ok(),
            duration_ms,
            timestamp: Utc::now(),
        });

        Ok(result?)
    }

    /// Observation call. Falls back to the raw response without a tag.
    async fn observe(
        &self,
        state: &ExecutionState,
        step: &mut HistoryStep,
        raw_input: &str,
        output: &str,
        events: &EventSink,
    ) -> Result<String, Error> {
        let mut vars = self.shared_vars(state);
        vars.insert("API_RESPONSE", output.to_string());
        vars.insert("THOUGHT", step.thought.clone());
        vars.insert("ACTION_NAME", step.skill.clone());
        vars.insert("ACTION_INPUT", raw_input.to_string());
        let prompt = render(OBSERVATION_PROMPT, &vars);

        let text = self
            .generate("observation", prompt, &mut [], events, &mut step.token_count)
            .await?;

        Ok(capture_tag(&text, "<observation>", "</observation>")
            .map(str::to_string)
            .unwrap_or(text))
    }

    /// Emit the step, then append it to the history.
    async fn commit(
        &self,
        state: &mut ExecutionState,
        step: HistoryStep,
        events: &EventSink,
    ) -> Result<(), Error> {
        let message = serde_json::to_string(&step)?;
        let _ = events
            .send(AgentStreamEvent::new(AgentEventKind::Step, message))
            .await;
        state.record(step);
        Ok(())
    }

    /// Stream one model call through `extractors`, forwarding their events.
    /// Returns the full response text; usage is added to `tokens`.
    async fn generate(
        &self,
        phase: &'static str,
        prompt: String,
        extractors: &mut [&mut TagExtractor],
        events: &EventSink,
        tokens: &mut TokenCount,
    ) -> Result<String, Error> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages: vec![Message::user(prompt)],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: true,
            stop: vec![],
        };

        let started = Instant::now();
        let mut stream = self.provider.stream(request).await?;
        let mut text = String::new();
        let mut call_tokens = TokenCount::default();

        while let Some(chunk) = stream.recv().await {
            let chunk = chunk?;
            if let Some(usage) = &chunk.usage {
                call_tokens.absorb(usage);
            }
            let Some(content) = chunk.content.filter(|c| !c.is_empty()) else {
                continue;
            };
            text.push_str(&content);
            for extractor in extractors.iter_mut() {
                for event in extractor.feed(&text, &content) {
                    let _ = events.send(event).await;
                }
            }
        }

        debug!(
            phase,
            chars = text.len(),
            input_tokens = call_tokens.input_tokens,
            output_tokens = call_tokens.output_tokens,
            duration_ms = started.elapsed().as_millis() as u64,
            "Model call finished"
        );
        self.publish(DomainEvent::ResponseGenerated {
            phase: phase.to_string(),
            model: self.model.clone(),
            input_tokens: call_tokens.input_tokens,
            output_tokens: call_tokens.output_tokens,
            timestamp: Utc::now(),
        });
        tokens.merge(&call_tokens);

        Ok(text)
    }

    /// Placeholders every template shares.
    fn shared_vars(&self, state: &ExecutionState) -> PromptVars {
        let mut vars = PromptVars::new();
        vars.insert("SERVICE_NAME", self.profile.name.clone());
        vars.insert("QUERY", state.query.clone());
        vars.insert("CONTEXT", format_context(state.context.as_ref()));
        vars.insert("EXECUTION_HISTORY", format_history(&state.history));
        vars.insert("AUTO_MODE", state.auto_mode.to_string());
        vars.insert(
            "PREVIOUS_EXECUTION_HISTORY",
            state.previous_history.clone().unwrap_or_default(),
        );
        vars
    }

    fn publish(&self, event: DomainEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
