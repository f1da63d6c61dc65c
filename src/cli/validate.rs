use anyhow::{Context, Result};
use clap::Args;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use stepflow_model::NodeRegistry;

#[derive(Args, Clone, Debug)]
pub struct ValidateArgs {
    /// Flow file to check (JSON action tree)
    pub flow: PathBuf,
}

pub fn cmd_validate(args: ValidateArgs) -> Result<()> {
    let raw = fs::read_to_string(&args.flow)
        .with_context(|| format!("cannot read {}", args.flow.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not valid JSON", args.flow.display()))?;
    let registry = NodeRegistry::with_builtins();
    let action = registry
        .decode_action(&value)
        .with_context(|| format!("{} does not describe a valid action tree", args.flow.display()))?;
    println!("{}: valid (root action {})", args.flow.display(), action.id);
    Ok(())
}
