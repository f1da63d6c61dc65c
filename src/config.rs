//! Configuration management module
//!
//! Layers an optional `stepflow.toml` file under `STEPFLOW_*` environment
//! variables; every field has a default so both layers may be absent.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StepflowConfig {
    pub logging: LoggingConfig,
    pub run: RunConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Fallback filter when neither RUST_LOG nor --log-level is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Pretty-print execution reports
    pub pretty_results: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            pretty_results: true,
        }
    }
}

impl StepflowConfig {
    /// Load configuration from an explicit file, or from `stepflow.toml`
    /// in the working directory when none is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        builder = match path {
            Some(path) => builder.add_source(config::File::from(path.to_path_buf())),
            None => builder.add_source(config::File::with_name("stepflow").required(false)),
        };
        builder = builder.add_source(config::Environment::with_prefix("STEPFLOW").separator("__"));
        let settings = builder.build().context("cannot load configuration")?;
        settings
            .try_deserialize()
            .context("configuration is malformed")
    }
}
