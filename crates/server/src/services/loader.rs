//! Startup loading: manifest → revision check → backend → pipeline.
//!
//! Every failure here is fatal; the caller aborts before binding.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use danbot_core::{ControlTemplate, ModelManifest, PipelineSettings, Predictor};
use tracing::info;

use crate::config::AppConfig;

/// Resolve the configured model directory.
pub fn model_dir(cfg: &AppConfig) -> anyhow::Result<&Path> {
    cfg.model_dir.as_deref().context(
        "No model directory configured; pass --model-dir, set DANBOT_MODEL_DIR, \
         or run `config set model_dir <path>`",
    )
}

/// Read `model.json` and check it against the pinned revision.
pub fn load_manifest(cfg: &AppConfig) -> anyhow::Result<(PathBuf, ModelManifest)> {
    let dir = model_dir(cfg)?;
    let manifest = ModelManifest::load(dir)
        .with_context(|| format!("Failed to read model manifest in {}", dir.display()))?;
    manifest.verify_revision(&cfg.revision)?;
    Ok((dir.to_path_buf(), manifest))
}

/// Pipeline settings from the config file plus manifest overrides.
pub fn pipeline_settings(
    cfg: &AppConfig,
    manifest: &ModelManifest,
) -> anyhow::Result<PipelineSettings> {
    let template = match &manifest.control_template {
        Some(source) => ControlTemplate::parse(source).context("Invalid control template")?,
        None => ControlTemplate::default(),
    };
    Ok(PipelineSettings {
        mode: cfg.mode,
        decoding: cfg.decoding,
        template,
        max_steps: cfg.max_steps,
        end_token: manifest.end_token.clone(),
    })
}

#[cfg(feature = "onnx")]
pub fn load_predictor(cfg: &AppConfig) -> anyhow::Result<Arc<dyn Predictor>> {
    use danbot_core::{OnnxParams, OnnxScorer, Pipeline};

    let (dir, manifest) = load_manifest(cfg)?;
    let settings = pipeline_settings(cfg, &manifest)?;
    let params = OnnxParams {
        intra_threads: cfg.intra_threads,
    };

    info!(dir = %dir.display(), repo = %manifest.repo, "Loading model");
    let scorer = OnnxScorer::load(&dir, &manifest, &params)?;
    let pipeline = Pipeline::new(scorer, settings)?;
    Ok(Arc::new(pipeline))
}

#[cfg(not(feature = "onnx"))]
pub fn load_predictor(cfg: &AppConfig) -> anyhow::Result<Arc<dyn Predictor>> {
    let (dir, _) = load_manifest(cfg)?;
    info!(dir = %dir.display(), "Model manifest found");
    anyhow::bail!("danbot-server was built without a model backend; enable the `onnx` feature")
}
