use crate::cli::{GlobalArgs, PipelineArgs, effective_config};
use crate::services::loader;

pub async fn execute(global: GlobalArgs) -> anyhow::Result<()> {
    let cfg = effective_config(&global, &PipelineArgs::default())?;
    let (dir, manifest) = loader::load_manifest(&cfg)?;

    println!("Model directory: {}", dir.display());
    println!("Repo:            {}", manifest.repo);
    println!("Revision:        {} (pinned {})", manifest.revision, cfg.revision);
    println!("Precision:       {}", manifest.precision);
    println!("End token:       {}", manifest.end_token);
    println!("Mode:            {}", cfg.mode);
    println!("Max steps:       {}", cfg.max_steps);

    let predictor = tokio::task::spawn_blocking(move || loader::load_predictor(&cfg)).await??;
    let vocab = predictor.vocab();
    println!("Vocabulary:      {} tokens (width {})", vocab.len(), vocab.size());
    println!("Control:         {}", predictor.decoder_control());

    Ok(())
}
