//! End-to-end prediction: prompt → decode → normalize.

use std::time::Instant;

use tracing::{debug, info};

use crate::decoding::{DecodingConfig, Mode};
use crate::error::{DanbotError, Result};
use crate::generate::{self, DEFAULT_MAX_STEPS, DecodeOptions, FinishReason};
use crate::manifest::DEFAULT_END_TOKEN;
use crate::normalize::normalize;
use crate::prompt::{ControlTemplate, PromptBuilder};
use crate::response::{ResponsePayload, assemble};
use crate::scorer::Scorer;
use crate::vocab::Vocabulary;

/// Startup-time settings for a [`Pipeline`].
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub mode: Mode,
    pub decoding: DecodingConfig,
    pub template: ControlTemplate,
    pub max_steps: usize,
    pub end_token: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            decoding: DecodingConfig::default(),
            template: ControlTemplate::default(),
            max_steps: DEFAULT_MAX_STEPS,
            end_token: DEFAULT_END_TOKEN.into(),
        }
    }
}

/// Result of one prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Probabilities (generative) or raw scores (single pass), per step.
    pub logits: Vec<Vec<f32>>,
    /// Chosen token per step; empty in single-pass mode.
    pub tokens: Vec<u32>,
    pub finish_reason: Option<FinishReason>,
}

/// Object-safe view of a loaded pipeline, shared by the HTTP layer and CLI.
pub trait Predictor: Send + Sync {
    fn mode(&self) -> Mode;
    fn vocab(&self) -> &Vocabulary;
    fn decoder_control(&self) -> &str;
    fn predict(&self, input_text: &str) -> Result<Prediction>;

    fn payload(&self, prediction: Prediction) -> ResponsePayload<'_> {
        assemble(self.vocab(), prediction.logits)
    }
}

/// A scorer plus everything fixed at startup.
pub struct Pipeline<S> {
    scorer: S,
    prompt: PromptBuilder,
    vocab: Vocabulary,
    mode: Mode,
    options: DecodeOptions,
}

impl<S: Scorer> Pipeline<S> {
    pub fn new(scorer: S, settings: PipelineSettings) -> Result<Self> {
        let vocab = Vocabulary::new(scorer.vocab(), scorer.vocab_size())?;
        let end_id = vocab
            .id(&settings.end_token)
            .ok_or_else(|| DanbotError::UnknownToken(settings.end_token.clone()))?;
        let options = DecodeOptions::new(settings.max_steps, end_id)?;
        let prompt = PromptBuilder::new(&settings.template, settings.decoding);

        info!(
            mode = %settings.mode,
            vocab_size = vocab.size(),
            end_token = %settings.end_token,
            end_id,
            max_steps = settings.max_steps,
            "Pipeline ready"
        );

        Ok(Self {
            scorer,
            prompt,
            vocab,
            mode: settings.mode,
            options,
        })
    }

    pub fn scorer(&self) -> &S {
        &self.scorer
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }
}

impl<S: Scorer> Predictor for Pipeline<S> {
    fn mode(&self) -> Mode {
        self.mode
    }

    fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    fn decoder_control(&self) -> &str {
        self.prompt.decoder_control()
    }

    fn predict(&self, input_text: &str) -> Result<Prediction> {
        let started = Instant::now();
        let prompt = self.prompt.build(input_text);
        let inputs = self
            .scorer
            .prepare_inputs(&prompt.encoder_text, &prompt.decoder_control)?;
        let decoded = generate::decode(&self.scorer, &inputs, self.mode, &self.options)?;
        let logits = normalize(decoded.scores, self.mode);

        debug!(
            mode = %self.mode,
            steps = logits.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Prediction complete"
        );

        Ok(Prediction {
            logits,
            tokens: decoded.tokens,
            finish_reason: decoded.finish_reason,
        })
    }
}
