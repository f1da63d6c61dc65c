use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use stepflow_cli::cli::{cmd_run, cmd_validate, RunArgs, ValidateArgs};
use stepflow_cli::config::StepflowConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "stepflow", version, about = "Workflow execution engine")]
struct Cli {
    /// Configuration file (stepflow.toml in the working directory by default)
    #[arg(short = 'C', long, global = true)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a flow file
    Run(RunArgs),

    /// Check a flow file without executing it
    Validate(ValidateArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);
    let config = StepflowConfig::load(cli.config.as_deref())?;
    match cli.command {
        Commands::Run(args) => cmd_run(args, &config),
        Commands::Validate(args) => cmd_validate(args),
    }
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
