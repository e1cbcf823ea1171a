//! Who the agent is: name, version, description, terminology.

use std::collections::BTreeMap;

use reagent_config::{AgentConfig, ConfigurationField};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct AgentProfile {
    pub name: String,
    pub version: String,
    pub description: String,

    /// Domain terminology injected into the reasoning prompt.
    #[serde(skip)]
    pub terms: String,

    pub configuration: BTreeMap<String, ConfigurationField>,
}

impl AgentProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: env!("CARGO_PKG_VERSION").into(),
            description: String::new(),
            terms: String::new(),
            configuration: BTreeMap::new(),
        }
    }

    pub fn with_terms(mut self, terms: impl Into<String>) -> Self {
        self.terms = terms.into();
        self
    }

    /// The `agent` attribute of skill markers: "WeatherAgent" becomes "weather".
    pub fn marker_name(&self) -> String {
        self.name.to_lowercase().replacen("agent", "", 1)
    }

    /// `{ description, configuration }`, as printed by `about`.
    pub fn about(&self) -> serde_json::Value {
        serde_json::json!({
            "description": self.description,
            "configuration": self.configuration,
        })
    }
}

impl From<&AgentConfig> for AgentProfile {
    fn from(config: &AgentConfig) -> Self {
        Self {
            name: config.name.clone(),
            version: config.version.clone(),
            description: config.description.clone(),
            terms: config.terms.clone(),
            configuration: config.configuration.clone(),
        }
    }
}
