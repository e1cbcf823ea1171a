pub mod about;
pub mod ask;
pub mod skills;
pub mod terms;

use reagent_config::AppConfig;

/// Load `~/.reagent/config.toml`, with env overrides applied.
pub(crate) fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}
