use crate::config::StepflowConfig;
use anyhow::{bail, Context, Result};
use clap::Args;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use stepflow_engine::Engine;
use stepflow_model::{ExecutionContext, NodeRegistry};
use tracing::info;

#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Flow file to execute (JSON action tree)
    pub flow: PathBuf,

    /// Initial context variables (JSON object file)
    #[arg(short, long)]
    pub context: Option<PathBuf>,

    /// Write the execution report to this file instead of stdout
    #[arg(short, long)]
    pub results: Option<PathBuf>,
}

pub fn cmd_run(args: RunArgs, config: &StepflowConfig) -> Result<()> {
    let action = load_flow(&args.flow)?;
    let mut ctx = match &args.context {
        Some(path) => load_context(path)?,
        None => ExecutionContext::new(),
    };

    let engine = Engine::new();
    let report = engine.run(&action, &mut ctx)?;

    let rendered = if config.run.pretty_results {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    match &args.results {
        Some(path) => {
            fs::write(path, rendered)
                .with_context(|| format!("cannot write {}", path.display()))?;
            info!(path = %path.display(), "execution report written");
        }
        None => println!("{rendered}"),
    }

    if !report.result.success {
        bail!("flow failed: {}", report.result.message);
    }
    Ok(())
}

fn load_flow(path: &PathBuf) -> Result<stepflow_model::Action> {
    let raw = fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    let registry = NodeRegistry::with_builtins();
    registry
        .decode_action(&value)
        .with_context(|| format!("{} does not describe a valid action tree", path.display()))
}

fn load_context(path: &PathBuf) -> Result<ExecutionContext> {
    let raw = fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    match value {
        Value::Object(map) => Ok(ExecutionContext::from_map(map)),
        _ => bail!("{} must contain a JSON object", path.display()),
    }
}
