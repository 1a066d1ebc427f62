//! Scout CLI: answers one question with a ReAct agent and prints every step.
//!
//! The agent may search the web and look up current weather. Each
//! intermediate message is printed as it is appended to the conversation.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use scout_agent::{AgentEvent, AgentLoop};
use scout_config::AppConfig;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod render;

const DEFAULT_QUERY: &str =
    "Find the capital of Madhya Pradesh, then find its current weather condition.";

#[derive(Parser)]
#[command(
    name = "scout",
    about = "Scout: a ReAct agent with web search and weather tools",
    version,
    author
)]
struct Cli {
    /// The question to answer
    #[arg(short, long, env = "SCOUT_QUERY", default_value = DEFAULT_QUERY)]
    query: String,

    /// Config file to use instead of ~/.scout/config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => AppConfig::load_path(path)?,
        None => AppConfig::load()?,
    };
    config.require_credentials()?;

    let tools = Arc::new(scout_tools::build_registry(&config)?);
    let provider = scout_providers::build_from_config(&config)?;
    info!(
        model = %config.model,
        tools = ?tools.names(),
        max_iterations = config.agent.max_iterations,
        "Scout ready"
    );

    let agent = Arc::new(AgentLoop::from_config(provider, tools, &config));

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling run");
                cancel.cancel();
            }
        });
    }

    println!("--- Agent is thinking ---");

    let mut events = agent.run_stream(cli.query, cancel);
    while let Some(event) = events.recv().await {
        if let Some(block) = render::render_event(&event) {
            println!("{block}");
        }
        let terminal = event.is_terminal();
        match event {
            AgentEvent::Done {
                iterations,
                tool_calls_made,
                ..
            } => info!(iterations, tool_calls_made, "Agent finished"),
            AgentEvent::Error { message } => return Err(message.into()),
            AgentEvent::Message { .. } => {}
        }
        if terminal {
            break;
        }
    }

    Ok(())
}
