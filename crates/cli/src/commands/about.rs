//! `reagent about` — Describe the agent and the configuration it accepts.

use reagent_agent::AgentProfile;

use super::load_config;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let profile = AgentProfile::from(&config.agent);
    println!("{}", serde_json::to_string_pretty(&profile.about())?);
    Ok(())
}
