//! `reagent skills` — Print the skill catalogue as JSON.

use reagent_core::skill::SkillDefinition;

use super::load_config;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let registry = reagent_skills::default_registry(&serde_json::Value::Null);
    let catalogue = registry.catalogue(&config.agent.exclude_skills);
    println!("{}", render(&catalogue)?);
    Ok(())
}

fn render(catalogue: &[SkillDefinition]) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(catalogue)
}
