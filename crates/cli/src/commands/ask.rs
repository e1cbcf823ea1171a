//! `reagent ask` — Run the agent on a message and stream its responses.
//!
//! By default thoughts are printed as they stream and the user is asked for
//! a follow-up after every turn (press Enter to finish). With `--print` every
//! event is written to stdout as one JSON line and the command exits after a
//! single turn.

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use clap::Args;
use reagent_agent::{
    AgentProfile, AgentStreamEvent, AskRequest, Prompter, ReactAgent, Session, SessionOptions,
};
use reagent_config::{AppConfig, ConfigError, ConfigurationField, FieldKind, parse_json_input};
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{debug, info, warn};

use super::load_config;

#[derive(Args, Debug)]
pub struct AskArgs {
    /// Message to send to the agent
    pub message: String,

    /// General context as a JSON string or a path to a JSON file
    #[arg(long)]
    pub context: Option<String>,

    /// Previous execution steps as a JSON string or a path to a JSON file
    #[arg(long)]
    pub history: Option<String>,

    /// Comma-separated list of skills to exclude
    #[arg(long, value_delimiter = ',')]
    pub exclude_skills: Vec<String>,

    /// Configuration values as a JSON string or a path to a JSON file
    #[arg(long)]
    pub configuration: Option<String>,

    /// Print every event as a JSON line and exit without interactive mode
    #[arg(long)]
    pub print: bool,

    /// Never pause for user input between turns
    #[arg(long)]
    pub auto_mode: bool,
}

/// Everything `ask` needs besides the agent itself.
#[derive(Debug)]
struct AskInputs {
    context: Option<Value>,
    previous_history: Option<String>,
    /// Configuration values with schema defaults filled in.
    configuration: Value,
    excluded: Vec<String>,
    auto_mode: bool,
}

pub async fn run(args: AskArgs) -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = ask(args).await {
        warn!(error = %e, "ask failed");
        let message = json!({ "error": e.to_string() }).to_string();
        println!("{}", AgentStreamEvent::error(message).to_json_line());
    }
    Ok(())
}

async fn ask(args: AskArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    let inputs = resolve_inputs(&args, &config)?;

    if !config.has_api_key() {
        warn!(
            config = %AppConfig::config_dir().join("config.toml").display(),
            "No API key configured; set OPENROUTER_API_KEY, OPENAI_API_KEY or REAGENT_API_KEY"
        );
    }

    let router = reagent_providers::build_from_config(&config);
    let provider = router.default()?;
    let model = config
        .providers
        .get(&config.default_provider)
        .and_then(|p| p.default_model.clone())
        .unwrap_or_else(|| config.default_model.clone());

    info!(provider = %provider.name(), model = %model, "Starting ask");

    let agent = ReactAgent::new(
        provider,
        model,
        Arc::new(reagent_skills::default_registry(&inputs.configuration)),
        AgentProfile::from(&config.agent),
    )
    .with_temperature(config.default_temperature)
    .with_max_tokens(config.default_max_tokens)
    .with_max_iterations(config.agent.max_iterations)
    .with_excluded_skills(inputs.excluded.clone());

    if args.print {
        let request = AskRequest {
            message: args.message,
            context: inputs.context,
            previous_history: inputs.previous_history,
            auto_mode: inputs.auto_mode,
        };
        let mut rx = agent.ask_agent(request);
        let mut stdout = std::io::stdout();
        while let Some(event) = rx.recv().await {
            writeln!(stdout, "{}", event.to_json_line())?;
        }
        stdout.flush()?;
        return Ok(());
    }

    let session = Session::new(
        agent,
        SessionOptions {
            context: inputs.context,
            previous_history: inputs.previous_history,
            auto_mode: inputs.auto_mode,
            ..Default::default()
        },
    );
    let mut prompter = StdinPrompter::new();
    let outcome = session
        .run(args.message, &mut prompter, |event| {
            if event.kind.is_thought() {
                print!("{}", event.message);
                let _ = std::io::stdout().flush();
            } else if event.kind == reagent_agent::AgentEventKind::Error {
                eprintln!("\n  [Error] {}", event.message);
            }
        })
        .await;
    println!();

    debug!(turns = outcome.turns, steps = outcome.steps.len(), "Session done");
    Ok(())
}

fn resolve_inputs(args: &AskArgs, config: &AppConfig) -> Result<AskInputs, ConfigError> {
    let context = parse_json_input(
        args.context.as_deref().unwrap_or("context.json"),
        Value::Null,
    )?;
    let history = parse_json_input(args.history.as_deref().unwrap_or("history.json"), json!([]))?;
    let configuration = parse_json_input(
        args.configuration.as_deref().unwrap_or("config.json"),
        json!({}),
    )?;
    let configuration = apply_configuration(&config.agent.configuration, configuration)?;

    let mut excluded = config.agent.exclude_skills.clone();
    for skill in &args.exclude_skills {
        let skill = skill.trim();
        if !skill.is_empty() && !excluded.iter().any(|s| s == skill) {
            excluded.push(skill.to_string());
        }
    }

    let previous_history = match &history {
        Value::Null => None,
        Value::Array(steps) if steps.is_empty() => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    };

    Ok(AskInputs {
        context: (!context.is_null()).then_some(context),
        previous_history,
        configuration,
        excluded,
        auto_mode: args.auto_mode || config.agent.auto_mode,
    })
}

/// Check `values` against the agent's configuration schema and fill in
/// defaults. Required fields must be present or carry a default; select
/// fields must hold one of their options.
fn apply_configuration(
    schema: &BTreeMap<String, ConfigurationField>,
    values: Value,
) -> Result<Value, ConfigError> {
    let mut values = match values {
        Value::Object(map) => map,
        Value::Null => serde_json::Map::new(),
        other => {
            return Err(ConfigError::ValidationError(format!(
                "configuration must be a JSON object, got {other}"
            )));
        }
    };

    let mut missing = Vec::new();
    for (name, field) in schema {
        match (values.get(name), &field.default) {
            (Some(value), _) => {
                if field.kind == FieldKind::Select
                    && !field.options.is_empty()
                    && !value
                        .as_str()
                        .is_some_and(|v| field.options.iter().any(|o| o == v))
                {
                    return Err(ConfigError::ValidationError(format!(
                        "configuration '{name}' must be one of: {}",
                        field.options.join(", ")
                    )));
                }
            }
            (None, Some(default)) => {
                values.insert(name.clone(), default.clone());
            }
            (None, None) if field.required => missing.push(name.as_str()),
            (None, None) => {}
        }
    }

    if missing.is_empty() {
        Ok(Value::Object(values))
    } else {
        Err(ConfigError::ValidationError(format!(
            "missing required configuration: {}",
            missing.join(", ")
        )))
    }
}

/// Reads follow-up messages from stdin.
struct StdinPrompter {
    lines: Lines<BufReader<Stdin>>,
}

impl StdinPrompter {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

#[async_trait]
impl Prompter for StdinPrompter {
    async fn next_message(&mut self) -> Option<String> {
        eprint!("\n\n  Ask... (Enter to finish) > ");
        let _ = std::io::stderr().flush();

        match self.lines.next_line().await {
            Ok(Some(line)) if !matches!(line.trim(), "exit" | "quit" | "/exit" | ":q") => {
                Some(line)
            }
            _ => None,
        }
    }
}
