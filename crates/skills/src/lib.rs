//! Built-in skills for Reagent.
//!
//! Each skill implements the `reagent_core::Skill` trait and can be
//! registered with a `SkillRegistry`.

pub mod calculator;
pub mod weather;

pub use calculator::CalculatorSkill;
pub use weather::GetWeatherSkill;

use reagent_core::skill::SkillRegistry;

/// Create a skill registry with all built-in skills, configured from the
/// agent's configuration object.
pub fn default_registry(configuration: &serde_json::Value) -> SkillRegistry {
    let mut registry = SkillRegistry::new();
    registry.register(Box::new(GetWeatherSkill::from_configuration(configuration)));
    registry.register(Box::new(CalculatorSkill));
    registry
}
