//! `reagent terms` — Show the domain terminology injected into prompts.

use super::load_config;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    if config.agent.terms.trim().is_empty() {
        eprintln!("  No terminology configured. Set `terms` under [agent] in config.toml.");
    } else {
        println!("{}", config.agent.terms);
    }
    Ok(())
}
