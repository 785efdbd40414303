//! `debate-agents`: run a Proponent / Opposition / Judge debate from the
//! command line.
//!
//! ```bash
//! debate-agents --topic "AI should be regulated" --rounds 2 --stream
//! debate-agents -t "Remote work beats office work" --json --export debate.md
//! ```
//!
//! Exit status: 0 when the judge ruled, 2 when the run aborted, 1 on any
//! configuration or I/O error.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use coordination::debate::{DebateOrchestrator, DebateOutcome};
use debate_agents::{report, runner, AppConfig, CliOverrides, OpenRouterBackend, TemplateRenderer};
use tracing::info;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Multi-agent LLM debate", long_about = None)]
struct Args {
    /// Proposition to debate
    #[arg(short, long)]
    topic: String,

    /// Rebuttal rounds (overrides MAX_ROUNDS and the config file)
    #[arg(short, long)]
    rounds: Option<u32>,

    /// Model identifier (overrides DEFAULT_MODEL)
    #[arg(short, long)]
    model: Option<String>,

    /// Word cap per debater turn (overrides MAX_RESPONSE_LENGTH)
    #[arg(long)]
    max_words: Option<usize>,

    /// Print each turn as soon as it completes
    #[arg(short, long, default_value_t = false)]
    stream: bool,

    /// Print the final state as JSON instead of text
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Write the transcript to a .md or .json file
    #[arg(long)]
    export: Option<PathBuf>,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(args).await {
        Ok(outcome) if outcome.is_completed() => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(2),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<DebateOutcome> {
    let overrides = CliOverrides {
        rounds: args.rounds,
        model: args.model.clone(),
        max_words: args.max_words,
    };
    let config = match AppConfig::load(args.config.as_deref(), &overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Tip: copy .env.example to .env and set OPENROUTER_API_KEY");
            return Err(anyhow::Error::new(e).context("configuration error"));
        }
    };

    let backend = OpenRouterBackend::new(&config.provider).context("building model client")?;
    info!(
        endpoint = %backend.endpoint(),
        model = %config.debate.model.name,
        rounds = config.debate.max_rounds,
        "debate-agents starting"
    );
    let orchestrator = DebateOrchestrator::new(
        config.debate.clone(),
        Arc::new(TemplateRenderer),
        Arc::new(backend),
    )?;

    if !args.json {
        println!("\nDEBATE: {}", args.topic.trim());
        println!(
            "Rounds: {} | Model: {}",
            config.debate.max_rounds, config.debate.model.name
        );
    }

    let outcome = if args.stream {
        let json = args.json;
        runner::run_streaming(&orchestrator, &args.topic, |turn| {
            if !json {
                println!("{}", report::render_turn(turn));
            }
        })
        .await?
    } else {
        let outcome = orchestrator.run(&args.topic).await?;
        if !args.json {
            for turn in outcome.state().history() {
                println!("{}", report::render_turn(turn));
            }
        }
        outcome
    };

    if args.json {
        println!("{}", report::to_json(outcome.state())?);
    } else {
        println!("{}", report::render_verdict(outcome.verdict()));
        println!("{}", report::render_summary(outcome.state()));
        if let Some(error) = outcome.error() {
            println!("\nDebate aborted: {}", error);
        }
    }

    if let Some(path) = &args.export {
        report::export(outcome.state(), path)
            .with_context(|| format!("exporting transcript to {}", path.display()))?;
        info!(path = %path.display(), "transcript exported");
    }

    Ok(outcome)
}
