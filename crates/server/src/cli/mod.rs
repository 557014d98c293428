pub mod config_cmd;
pub mod info;
pub mod predict;
pub mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use danbot_core::Mode;

use crate::config::AppConfig;

#[derive(Parser)]
#[command(
    name = "danbot-server",
    version,
    about = "Scored natural-language to tag translation service"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, clap::Args, Clone)]
pub struct GlobalArgs {
    /// Listen address (overrides config).
    #[arg(long, env = "DANBOT_HOST")]
    pub host: Option<String>,

    /// Listen port (overrides config).
    #[arg(short, long, env = "DANBOT_PORT")]
    pub port: Option<u16>,

    /// Model directory containing `model.json`.
    #[arg(long = "model-dir", env = "DANBOT_MODEL_DIR")]
    pub model_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server (default).
    Serve(ServeArgs),

    /// Translate one input and print the scores.
    Predict(PredictArgs),

    /// Show the model manifest and vocabulary summary.
    Info,

    /// View / edit configuration.
    Config(ConfigArgs),
}

//  Subcommand argument structs

/// Pipeline overrides shared by `serve` and `predict`.
#[derive(Debug, clap::Args, Clone, Default)]
pub struct PipelineArgs {
    /// Decoding mode: `generative` or `single-pass`.
    #[arg(long, env = "DANBOT_MODE")]
    pub mode: Option<Mode>,

    /// Maximum generation steps per request.
    #[arg(long = "max-steps", env = "DANBOT_MAX_STEPS")]
    pub max_steps: Option<usize>,
}

#[derive(Debug, clap::Args, Clone, Default)]
pub struct ServeArgs {
    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Debug, clap::Args, Clone)]
pub struct PredictArgs {
    /// Text to translate.
    pub text: String,

    /// Candidates shown per step.
    #[arg(long = "top-k", default_value_t = 5)]
    pub top_k: usize,

    /// Print the raw response payload instead of the summary.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub pipeline: PipelineArgs,
}

#[derive(Debug, clap::Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Display the current configuration.
    Show,
    /// Set a configuration value (e.g. `decoding.rating general`).
    Set { key: String, value: String },
}

/// Load the persisted config and layer command-line overrides on top.
pub fn effective_config(
    global: &GlobalArgs,
    pipeline: &PipelineArgs,
) -> anyhow::Result<AppConfig> {
    let mut cfg = AppConfig::load_or_default()?;
    apply_overrides(&mut cfg, global, pipeline);
    Ok(cfg)
}

fn apply_overrides(cfg: &mut AppConfig, global: &GlobalArgs, pipeline: &PipelineArgs) {
    if let Some(host) = &global.host {
        cfg.host = host.clone();
    }
    if let Some(port) = global.port {
        cfg.port = port;
    }
    if let Some(dir) = &global.model_dir {
        cfg.model_dir = Some(dir.clone());
    }
    if let Some(mode) = pipeline.mode {
        cfg.mode = mode;
    }
    if let Some(steps) = pipeline.max_steps {
        cfg.max_steps = steps;
    }
}
