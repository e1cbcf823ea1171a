//! Shared test helpers for agent tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use reagent_core::error::{ProviderError, SkillError};
use reagent_core::message::Message;
use reagent_core::provider::{
    ChunkReceiver, Provider, ProviderRequest, ProviderResponse, StreamChunk, Usage,
};
use reagent_core::skill::{Skill, SkillRegistry};
use tokio::sync::mpsc;

/// Usage reported at the end of every scripted stream.
pub const CALL_USAGE: Usage = Usage {
    prompt_tokens: 10,
    completion_tokens: 5,
    total_tokens: 15,
};

/// One scripted generation call.
pub enum Reply {
    /// Stream these chunks, then finish with [`CALL_USAGE`].
    Chunks(Vec<String>),
    /// Refuse the call outright.
    Refuse(ProviderError),
    /// Stream these chunks, then fail.
    BreakAfter(Vec<String>, ProviderError),
}

impl Reply {
    pub fn chunks(chunks: &[&str]) -> Self {
        Self::Chunks(chunks.iter().map(|c| c.to_string()).collect())
    }

    /// The whole text as a single chunk.
    pub fn text(text: &str) -> Self {
        Self::Chunks(vec![text.to_string()])
    }
}

/// A mock provider that streams a sequence of scripted replies.
///
/// Each call to `stream` consumes the next reply. Calls past the end of the
/// script fail with an API error. Every request is captured.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Reply>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Prompt text of every call, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| {
                r.messages
                    .iter()
                    .map(|m| m.content.as_str())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .collect()
    }

    fn next_reply(&self, request: ProviderRequest) -> Option<Reply> {
        self.requests.lock().unwrap().push(request);
        self.script.lock().unwrap().pop_front()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let model = request.model.clone();
        match self.next_reply(request) {
            Some(Reply::Chunks(chunks)) => Ok(ProviderResponse {
                message: Message::assistant(chunks.concat()),
                usage: Some(CALL_USAGE),
                model,
            }),
            Some(Reply::Refuse(e)) | Some(Reply::BreakAfter(_, e)) => Err(e),
            None => Err(exhausted()),
        }
    }

    async fn stream(&self, request: ProviderRequest) -> Result<ChunkReceiver, ProviderError> {
        let (chunks, failure) = match self.next_reply(request) {
            Some(Reply::Chunks(chunks)) => (chunks, None),
            Some(Reply::BreakAfter(chunks, e)) => (chunks, Some(e)),
            Some(Reply::Refuse(e)) => return Err(e),
            None => return Err(exhausted()),
        };

        let (tx, rx) = mpsc::channel(chunks.len() + 1);
        for chunk in chunks {
            let _ = tx.send(Ok(StreamChunk::text(chunk))).await;
        }
        let last = match failure {
            Some(e) => Err(e),
            None => Ok(StreamChunk::finished(Some(CALL_USAGE))),
        };
        let _ = tx.send(last).await;
        Ok(rx)
    }
}

fn exhausted() -> ProviderError {
    ProviderError::ApiError {
        status_code: 500,
        message: "script exhausted".into(),
    }
}

/// Echoes its `text` input; fails when `text` is missing.
pub struct EchoSkill;

#[async_trait]
impl Skill for EchoSkill {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Echoes back the text input"
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": { "text": { "type": "string" } },
            "required": ["text"]
        })
    }

    async fn run(&self, input: serde_json::Value) -> Result<String, SkillError> {
        input["text"]
            .as_str()
            .map(|t| format!("echo: {t}"))
            .ok_or_else(|| SkillError::InvalidInput("missing 'text'".into()))
    }
}

/// Always fails.
pub struct BrokenSkill;

#[async_trait]
impl Skill for BrokenSkill {
    fn name(&self) -> &str {
        "broken"
    }

    fn description(&self) -> &str {
        "Fails every time"
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({"type": "object"})
    }

    async fn run(&self, _input: serde_json::Value) -> Result<String, SkillError> {
        Err(SkillError::ExecutionFailed {
            skill_name: "broken".into(),
            reason: "upstream unavailable".into(),
        })
    }
}

pub fn test_registry() -> SkillRegistry {
    let mut registry = SkillRegistry::new();
    registry.register(Box::new(EchoSkill));
    registry.register(Box::new(BrokenSkill));
    registry
}
