//! `get_weather` — deterministic mock weather report.
//!
//! Returns plausible conditions derived from a hash of the location so the
//! agent loop can be exercised end to end without network access.
//! The agent configuration may set `units` to choose the default system.

use async_trait::async_trait;
use reagent_core::error::SkillError;
use reagent_core::skill::Skill;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default)]
pub struct GetWeatherSkill {
    default_units: Units,
}

impl GetWeatherSkill {
    /// Build from the agent configuration object. Unknown or missing
    /// `units` keep the metric default.
    pub fn from_configuration(configuration: &serde_json::Value) -> Self {
        let default_units = match configuration["units"].as_str() {
            Some("imperial") => Units::Imperial,
            _ => Units::Metric,
        };
        Self { default_units }
    }
}

#[async_trait]
impl Skill for GetWeatherSkill {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Get the current weather for a location: temperature, conditions, humidity and wind."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "City name or place to report on"
                },
                "units": {
                    "type": "string",
                    "enum": ["metric", "imperial"],
                    "default": self.default_units.as_str()
                }
            },
            "required": ["location"]
        })
    }

    async fn run(&self, input: serde_json::Value) -> Result<String, SkillError> {
        let location = input["location"]
            .as_str()
            .filter(|l| !l.trim().is_empty())
            .ok_or_else(|| SkillError::InvalidInput("'location' must be a non-empty string".into()))?;

        let units = match input["units"].as_str() {
            None => self.default_units,
            Some("metric") => Units::Metric,
            Some("imperial") => Units::Imperial,
            Some(other) => {
                return Err(SkillError::InvalidInput(format!(
                    "unknown units '{other}', expected metric or imperial"
                )));
            }
        };

        let report = WeatherReport::for_location(location.trim(), units);
        serde_json::to_string_pretty(&report).map_err(|e| SkillError::ExecutionFailed {
            skill_name: self.name().into(),
            reason: e.to_string(),
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    fn as_str(self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
        }
    }
}

#[derive(Debug, Serialize)]
struct WeatherReport {
    location: String,
    temperature: f64,
    unit: &'static str,
    conditions: &'static str,
    humidity_pct: u32,
    wind_kph: u32,
}

const CONDITIONS: [&str; 7] = [
    "Clear",
    "Partly cloudy",
    "Overcast",
    "Drizzle",
    "Rain",
    "Snow",
    "Fog",
];

impl WeatherReport {
    fn for_location(location: &str, units: Units) -> Self {
        let seed = location
            .to_lowercase()
            .bytes()
            .fold(17u32, |acc, b| acc.wrapping_mul(31).wrapping_add(u32::from(b)));

        let celsius = f64::from(seed % 40) - 5.0;
        let (temperature, unit) = match units {
            Units::Metric => (celsius, "°C"),
            Units::Imperial => (celsius * 9.0 / 5.0 + 32.0, "°F"),
        };

        Self {
            location: location.to_string(),
            temperature: (temperature * 10.0).round() / 10.0,
            unit,
            conditions: CONDITIONS[(seed as usize / 7) % CONDITIONS.len()],
            humidity_pct: 30 + seed % 60,
            wind_kph: 3 + seed % 35,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn reports_weather_for_location() {
        let output = GetWeatherSkill::default()
            .run(json!({"location": "Tokyo"}))
            .await
            .unwrap();
        let report: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(report["location"], "Tokyo");
        assert_eq!(report["unit"], "°C");
        assert!(report["temperature"].is_number());
    }

    #[tokio::test]
    async fn imperial_units() {
        let output = GetWeatherSkill::default()
            .run(json!({"location": "New York", "units": "imperial"}))
            .await
            .unwrap();
        assert!(output.contains("°F"));
    }

    #[tokio::test]
    async fn same_location_same_report() {
        let a = GetWeatherSkill::default().run(json!({"location": "London"})).await.unwrap();
        let b = GetWeatherSkill::default().run(json!({"location": "london"})).await.unwrap();
        let a: serde_json::Value = serde_json::from_str(&a).unwrap();
        let b: serde_json::Value = serde_json::from_str(&b).unwrap();
        assert_eq!(a["temperature"], b["temperature"]);
        assert_eq!(a["conditions"], b["conditions"]);
    }

    #[tokio::test]
    async fn missing_location_is_rejected() {
        let err = GetWeatherSkill::default().run(json!({})).await.unwrap_err();
        assert!(matches!(err, SkillError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn unknown_units_are_rejected() {
        let err = GetWeatherSkill::default()
            .run(json!({"location": "Oslo", "units": "kelvin"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("kelvin"));
    }

    #[tokio::test]
    async fn configured_units_become_the_default() {
        let skill = GetWeatherSkill::from_configuration(&json!({"units": "imperial"}));
        assert_eq!(skill.input_schema()["properties"]["units"]["default"], "imperial");

        let output = skill.run(json!({"location": "Oslo"})).await.unwrap();
        assert!(output.contains("°F"));

        // An explicit choice still wins.
        let output = skill
            .run(json!({"location": "Oslo", "units": "metric"}))
            .await
            .unwrap();
        assert!(output.contains("°C"));
    }

    #[test]
    fn unknown_configuration_keeps_metric() {
        let skill = GetWeatherSkill::from_configuration(&json!({"units": "kelvin"}));
        assert_eq!(skill.default_units, Units::Metric);
        let skill = GetWeatherSkill::from_configuration(&serde_json::Value::Null);
        assert_eq!(skill.default_units, Units::Metric);
    }
}
