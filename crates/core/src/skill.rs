//! Skill trait — the abstraction over agent capabilities.
//!
//! Skills are the callables the model can choose during the Act phase.
//! Each has a name, a description, and a JSON-schema-like input contract,
//! and renders its result back as text for the Observe phase.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::error::SkillError;

/// A skill as the model sees it in the catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDefinition {
    /// The skill name
    pub name: String,

    /// Description of what the skill does
    pub description: String,

    /// JSON Schema describing the skill's input
    pub input_schema: serde_json::Value,
}

/// The core Skill trait.
///
/// Skills are registered in the [`SkillRegistry`] and made available to the
/// agent loop.
#[async_trait]
pub trait Skill: Send + Sync {
    /// The unique name of this skill (e.g., "get_weather").
    fn name(&self) -> &str;

    /// A description of what this skill does (sent to the LLM).
    fn description(&self) -> &str;

    /// JSON Schema describing this skill's input.
    fn input_schema(&self) -> serde_json::Value;

    /// Run the skill with already-parsed input, returning text for the observation.
    async fn run(&self, input: serde_json::Value) -> Result<String, SkillError>;

    /// Convert this skill into a SkillDefinition for prompts.
    fn to_definition(&self) -> SkillDefinition {
        SkillDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// A registry of available skills.
///
/// The agent loop uses this to:
/// 1. Render the skill catalogue into the reasoning prompt
/// 2. Render the selected skill's schema into the action-input prompt
/// 3. Run the skill the model chose
///
/// Skills are kept ordered by name so rendered catalogues are stable.
pub struct SkillRegistry {
    skills: BTreeMap<String, Box<dyn Skill>>,
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self {
            skills: BTreeMap::new(),
        }
    }

    /// Register a skill. Replaces any existing skill with the same name.
    pub fn register(&mut self, skill: Box<dyn Skill>) {
        let name = skill.name().to_string();
        debug!(skill = %name, "Registered skill");
        self.skills.insert(name, skill);
    }

    /// Get a skill by name.
    pub fn get(&self, name: &str) -> Option<&dyn Skill> {
        self.skills.get(name).map(|s| s.as_ref())
    }

    /// Definition of a single skill, if registered.
    pub fn definition(&self, name: &str) -> Option<SkillDefinition> {
        self.get(name).map(|s| s.to_definition())
    }

    /// All skill definitions except the ones the caller asked to suppress.
    pub fn catalogue(&self, excluded: &[String]) -> Vec<SkillDefinition> {
        self.skills
            .values()
            .filter(|s| !excluded.iter().any(|x| x == s.name()))
            .map(|s| s.to_definition())
            .collect()
    }

    /// Run a skill by name.
    pub async fn run_skill(
        &self,
        name: &str,
        input: serde_json::Value,
    ) -> Result<String, SkillError> {
        let Some(skill) = self.skills.get(name) else {
            warn!(skill = %name, available = ?self.names(), "Unknown skill requested");
            return Err(SkillError::NotFound(name.to_string()));
        };

        debug!(skill = %name, "Running skill");
        let result = skill.run(input).await;
        if let Err(e) = &result {
            warn!(skill = %name, error = %e, "Skill failed");
        }
        result
    }

    /// List all registered skill names.
    pub fn names(&self) -> Vec<&str> {
        self.skills.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}

impl Default for SkillRegistry {
    fn default() -> Self {
        Self::new()
    }
}
