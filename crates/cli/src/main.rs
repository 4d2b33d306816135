use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use eventflow::Emitter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod runner;
mod script;

use script::Script;

#[derive(Parser)]
#[command(name = "eventflow")]
#[command(about = "Run series, parallel and waterfall flows over event listeners", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Register the script's listeners and run its steps.
    ///
    /// Exits non-zero if any step failed.
    Run {
        script: PathBuf,

        /// Stop after the first failing step
        #[arg(long)]
        fail_fast: bool,
    },
    /// Validate a script and summarize its listeners
    Check { script: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run { script, fail_fast } => run(script, fail_fast).await,
        Commands::Check { script } => check(script).await,
    }
}

async fn run(path: PathBuf, fail_fast: bool) -> Result<()> {
    let script = Script::load(&path).await?;
    let emitter: Emitter<serde_json::Value> = Emitter::new();
    script.register(&emitter);

    let reports = runner::run_steps(&emitter, &script.steps, fail_fast).await;
    for report in &reports {
        println!("{}", serde_json::to_string(report)?);
    }

    runner::ensure_succeeded(&reports, script.steps.len())
}

async fn check(path: PathBuf) -> Result<()> {
    let script = Script::load(&path).await?;

    println!("Script: {}", path.display());
    println!();
    if script.listeners.is_empty() {
        println!("No listeners.");
    } else {
        println!("Listeners:");
        for (event, count) in script.listener_counts() {
            println!("  {:<24} {}", event, count);
        }
    }
    println!();
    println!("Steps: {}", script.steps.len());

    let counts = script.listener_counts();
    for step in &script.steps {
        if !counts.contains_key(step.event.as_str()) {
            tracing::warn!(event = %step.event, "Step targets an event with no listeners");
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .init();
}
