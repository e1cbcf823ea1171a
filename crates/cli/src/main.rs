//! Reagent CLI — the main entry point.
//!
//! Commands:
//! - `skills` — List the skills the agent can use
//! - `about`  — Describe the agent and the configuration it accepts
//! - `terms`  — Show the domain terminology the agent understands
//! - `ask`    — Run the agent on a message and stream its reasoning

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "reagent",
    about = "Reagent — a streaming ReAct agent",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Logging level (trace, debug, info, warn, error); RUST_LOG wins
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Human-readable logs instead of JSON
    #[arg(long, global = true)]
    pretty: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List agent capabilities and available skills
    Skills,

    /// Describe what the agent does
    About,

    /// Show domain-specific terminology the agent understands
    Terms,

    /// Run the agent with a message and stream its responses
    Ask(commands::ask::AskArgs),
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries the agent output.
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    let logs = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if cli.pretty {
        logs.init();
    } else {
        logs.json().init();
    }

    match cli.command {
        Commands::Skills => commands::skills::run().await?,
        Commands::About => commands::about::run().await?,
        Commands::Terms => commands::terms::run().await?,
        Commands::Ask(args) => commands::ask::run(args).await?,
    }

    Ok(())
}
