//! # Reagent Core
//!
//! Domain types, traits, and error definitions for the Reagent ReAct runtime.
//! This crate has **no I/O dependencies**: it defines the seams the
//! agent loop talks to (the generation service, the skill registry, the
//! domain event bus) and leaves implementations to the other crates.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the agent loop is a trait here. This enables:
//! - Swapping the generation backend via configuration
//! - Scripted providers and stub skills in tests
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod event;
pub mod message;
pub mod provider;
pub mod skill;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, StreamChunk, Usage};
pub use skill::{Skill, SkillDefinition, SkillRegistry};
