//! `refiner` command-line entry point.
//!
//! Run with:
//!   EXA_API_KEY=your_key LLM_API_KEY=your_key refiner "what is quantum error correction"

use clap::Parser;
use refiner::llm::{LlmQueryGenerator, LlmReflector, LlmSummarizer, OpenAiChat};
use refiner::{
    Collaborators, Controller, ExaSearch, MarkdownFinalizer, ResearchConfig, ResearchState,
};
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use thiserror::Error;
use tracing::error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The research question (all bare words are joined by spaces)
    #[arg(required = true, num_args = 1..)]
    question: Vec<String>,

    /// Maximum number of research rounds
    #[arg(long)]
    max_loops: Option<usize>,

    /// Chat model used for query generation, summarizing and reflection
    #[arg(long)]
    model: Option<String>,

    /// Print the final state as JSON instead of the report
    #[arg(long)]
    json: bool,
}

/// Failures of the command-line front end.
#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Research(#[from] refiner::Error),

    #[error("cannot serialize state: {0}")]
    Serialize(#[from] serde_json::Error),
}

fn build_controller(config: ResearchConfig) -> refiner::Result<Controller> {
    let api_key = env::var("LLM_API_KEY")
        .or_else(|_| env::var("OPENAI_API_KEY"))
        .ok();
    let chat = Arc::new(OpenAiChat::from_config(&config, api_key));
    let search = ExaSearch::from_env(&config)?;

    let collaborators = Collaborators::new(
        LlmQueryGenerator::new(chat.clone()),
        search,
        LlmSummarizer::new(chat.clone()),
        LlmReflector::new(chat),
        MarkdownFinalizer,
    );
    Ok(Controller::new(config, collaborators).verbose(true))
}

fn print_outcome(state: &ResearchState, json: bool) -> Result<(), CliError> {
    if json {
        let rendered = serde_json::to_string_pretty(state)?;
        println!("{}", rendered);
        return Ok(());
    }

    println!("\n[FINAL REPORT]");
    if let Some(reason) = state.stop_reason() {
        println!(
            "({} round(s), {} source(s), stopped: {})\n",
            state.loop_count(),
            state.sources().len(),
            reason
        );
    }
    println!("{}", state.report().unwrap_or("[No report produced]"));
    Ok(())
}

async fn run(args: Args) -> Result<(), CliError> {
    let mut config = ResearchConfig::from_env()?;
    if let Some(n) = args.max_loops {
        config = config.max_loops(n);
    }
    if let Some(model) = args.model {
        config.model = model;
    }
    config.validate()?;

    let topic = args.question.join(" ");
    let controller = build_controller(config)?;

    println!("Starting research on: {}", topic);
    let state = controller.run(&topic).await?;
    print_outcome(&state, args.json)
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "refiner=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "research failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
