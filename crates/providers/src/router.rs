//! Provider router — selects the generation backend based on config.

use std::collections::HashMap;
use std::sync::Arc;

use reagent_core::error::ProviderError;
use reagent_core::provider::Provider;

use crate::openai_compat::OpenAiCompatProvider;

/// Routes generation requests to the correct provider.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the default provider.
    pub fn default(&self) -> Result<Arc<dyn Provider>, ProviderError> {
        self.get(&self.default_provider).ok_or_else(|| {
            ProviderError::NotConfigured(format!(
                "default provider '{}' has no known endpoint; set [providers.{}].api_url (registered: [{}])",
                self.default_provider,
                self.default_provider,
                self.list().join(", ")
            ))
        })
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// List all registered provider names.
    pub fn list(&self) -> Vec<&str> {
        self.providers.keys().map(|s| s.as_str()).collect()
    }
}

/// Build providers from configuration.
///
/// Every `[providers.<name>]` entry with a resolvable endpoint is registered;
/// the default provider is added from the top-level key when it is a
/// well-known backend.
pub fn build_from_config(config: &reagent_config::AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider);

    for (name, provider_config) in &config.providers {
        let api_key = provider_config
            .api_key
            .clone()
            .or_else(|| config.api_key.clone())
            .unwrap_or_default();

        let Some(base_url) = provider_config
            .api_url
            .clone()
            .or_else(|| default_base_url(name).map(str::to_string))
        else {
            tracing::warn!(provider = %name, "Skipping provider without api_url");
            continue;
        };

        router.register(
            name.clone(),
            Arc::new(OpenAiCompatProvider::new(name, base_url, api_key)),
        );
    }

    if router.get(&config.default_provider).is_none()
        && let Some(base_url) = default_base_url(&config.default_provider)
    {
        let api_key = config.api_key.clone().unwrap_or_default();
        router.register(
            config.default_provider.clone(),
            Arc::new(OpenAiCompatProvider::new(
                &config.default_provider,
                base_url,
                api_key,
            )),
        );
    }

    router
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> Option<&'static str> {
    match provider_name {
        "openrouter" => Some("https://openrouter.ai/api/v1"),
        "openai" => Some("https://api.openai.com/v1"),
        "ollama" => Some("http://localhost:11434/v1"),
        "deepseek" => Some("https://api.deepseek.com/v1"),
        "groq" => Some("https://api.groq.com/openai/v1"),
        "together" => Some("https://api.together.xyz/v1"),
        "vllm" => Some("http://localhost:8000/v1"),
        "llamacpp" | "llama.cpp" => Some("http://localhost:8080/v1"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reagent_config::{AppConfig, ProviderConfig};

    #[test]
    fn router_register_and_lookup() {
        let mut router = ProviderRouter::new("openrouter");
        let provider = Arc::new(OpenAiCompatProvider::openrouter("sk-test"));
        router.register("openrouter", provider);

        assert!(router.get("openrouter").is_some());
        assert!(router.get("nonexistent").is_none());
        assert!(router.default().is_ok());
    }

    #[test]
    fn default_base_urls() {
        assert!(default_base_url("openrouter").unwrap().contains("openrouter.ai"));
        assert!(default_base_url("openai").unwrap().contains("api.openai.com"));
        assert!(default_base_url("ollama").unwrap().contains("localhost:11434"));
        assert!(default_base_url("mystery").is_none());
    }

    #[test]
    fn build_from_default_config() {
        let config = AppConfig::default();
        let router = build_from_config(&config);
        assert_eq!(router.default().unwrap().name(), "openrouter");
    }

    #[test]
    fn custom_provider_needs_an_endpoint() {
        let mut config = AppConfig {
            default_provider: "inhouse".into(),
            ..AppConfig::default()
        };
        let err = build_from_config(&config).default().err().unwrap();
        assert!(err.to_string().contains("[providers.inhouse].api_url"));
        assert!(err.to_string().contains("registered: ["));

        config.providers.insert(
            "inhouse".into(),
            ProviderConfig {
                api_key: None,
                api_url: Some("http://llm.internal/v1".into()),
                default_model: None,
            },
        );
        let router = build_from_config(&config);
        assert_eq!(router.default().unwrap().name(), "inhouse");
        assert_eq!(router.list(), vec!["inhouse"]);
    }
}
