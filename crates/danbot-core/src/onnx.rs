//! ONNX Runtime backend: encoder/decoder graphs plus HuggingFace tokenizers.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Once;

use ndarray::{Array2, Array3, ArrayView3, Ix3, s};
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use crate::error::{DanbotError, Result};
use crate::manifest::{IoNames, ModelManifest};
use crate::scorer::{ModelInputs, Scorer};

static RUNTIME_INIT: Once = Once::new();

/// Initialize the global ONNX Runtime environment (idempotent).
fn init_runtime() {
    RUNTIME_INIT.call_once(|| match ort::init().with_name("danbot").commit() {
        Ok(_) => info!("ONNX Runtime initialized"),
        Err(e) => warn!("ONNX Runtime init failed, using defaults: {e}"),
    });
}

/// Session options for [`OnnxScorer::load`].
#[derive(Debug, Clone, Default)]
pub struct OnnxParams {
    /// Intra-op threads per session. `None` lets the runtime decide.
    pub intra_threads: Option<usize>,
}

/// Encoder–decoder model exported as two ONNX graphs.
///
/// Sessions and tokenizers are only read after loading, so one instance
/// serves concurrent requests without locking.
pub struct OnnxScorer {
    encoder: Session,
    decoder: Session,
    encoder_tokenizer: Tokenizer,
    decoder_tokenizer: Tokenizer,
    io: IoNames,
    vocab_size: usize,
}

/// Token ids plus the encoder output, computed once per request.
pub struct EncodedInputs {
    pub ids: ModelInputs,
    hidden_states: Array3<f32>,
}

impl OnnxScorer {
    /// Load every file named by `manifest` from `dir`.
    pub fn load(dir: &Path, manifest: &ModelManifest, params: &OnnxParams) -> Result<Self> {
        init_runtime();

        let encoder_tokenizer = load_tokenizer(&dir.join(&manifest.encoder_tokenizer))?;
        let decoder_tokenizer = load_tokenizer(&dir.join(&manifest.decoder_tokenizer))?;
        let encoder = load_session(&dir.join(&manifest.encoder), params)?;
        let decoder = load_session(&dir.join(&manifest.decoder), params)?;

        let vocab_size = manifest
            .vocab_size
            .unwrap_or_else(|| decoder_tokenizer.get_vocab_size(true));

        info!(
            repo = %manifest.repo,
            revision = %manifest.revision,
            precision = %manifest.precision,
            vocab_size,
            "ONNX model loaded"
        );

        Ok(Self {
            encoder,
            decoder,
            encoder_tokenizer,
            decoder_tokenizer,
            io: manifest.io.clone(),
            vocab_size,
        })
    }

    fn encode(&self, ids: &[i64], mask: &[i64]) -> Result<Array3<f32>> {
        let ids = row(ids)?;
        let mask = row(mask)?;

        let outputs = self.encoder.run(ort::inputs![
            self.io.encoder_input_ids.as_str() => Tensor::from_array(ids)?,
            self.io.encoder_attention_mask.as_str() => Tensor::from_array(mask)?,
        ]?)?;

        let hidden = outputs[self.io.encoder_hidden_states.as_str()]
            .try_extract_tensor::<f32>()?
            .into_dimensionality::<Ix3>()
            .map_err(|e| DanbotError::InferenceFailed(format!("encoder output: {e}")))?
            .to_owned();
        Ok(hidden)
    }
}

impl Scorer for OnnxScorer {
    type Inputs = EncodedInputs;

    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn vocab(&self) -> HashMap<String, u32> {
        self.decoder_tokenizer.get_vocab(true)
    }

    fn prepare_inputs(&self, encoder_text: &str, decoder_control: &str) -> Result<EncodedInputs> {
        let enc = self
            .encoder_tokenizer
            .encode(encoder_text, true)
            .map_err(|e| DanbotError::TokenizationFailed(format!("encoder text: {e}")))?;
        // The control sequence already spells out its special tokens.
        let dec = self
            .decoder_tokenizer
            .encode(decoder_control, false)
            .map_err(|e| DanbotError::TokenizationFailed(format!("decoder control: {e}")))?;

        if dec.get_ids().is_empty() {
            return Err(DanbotError::TokenizationFailed(
                "decoder control produced no tokens".into(),
            ));
        }

        let ids = ModelInputs {
            encoder_ids: enc.get_ids().iter().map(|&t| t as i64).collect(),
            encoder_mask: enc.get_attention_mask().iter().map(|&m| m as i64).collect(),
            decoder_ids: dec.get_ids().iter().map(|&t| t as i64).collect(),
        };
        let hidden_states = self.encode(&ids.encoder_ids, &ids.encoder_mask)?;

        debug!(
            encoder_tokens = ids.encoder_ids.len(),
            decoder_tokens = ids.decoder_ids.len(),
            "Inputs prepared"
        );
        Ok(EncodedInputs { ids, hidden_states })
    }

    fn forward_step(&self, inputs: &EncodedInputs, history: &[u32]) -> Result<Vec<f32>> {
        let mut decoder_ids = inputs.ids.decoder_ids.clone();
        decoder_ids.extend(history.iter().map(|&t| t as i64));
        let decoder_row = row(&decoder_ids)?;
        let mask_row = row(&inputs.ids.encoder_mask)?;

        let outputs = self.decoder.run(ort::inputs![
            self.io.decoder_input_ids.as_str() => Tensor::from_array(decoder_row)?,
            self.io.decoder_encoder_hidden_states.as_str() => Tensor::from_array(inputs.hidden_states.clone())?,
            self.io.decoder_encoder_attention_mask.as_str() => Tensor::from_array(mask_row)?,
        ]?)?;

        let logits = outputs[self.io.decoder_logits.as_str()]
            .try_extract_tensor::<f32>()?
            .into_dimensionality::<Ix3>()
            .map_err(|e| DanbotError::InferenceFailed(format!("decoder output: {e}")))?;
        last_position(logits, decoder_ids.len())
    }
}

/// Scores at the final input position of a `[1, positions, vocab]` output.
fn last_position(logits: ArrayView3<'_, f32>, input_len: usize) -> Result<Vec<f32>> {
    let positions = logits.shape()[1];
    if input_len == 0 || positions < input_len {
        return Err(DanbotError::InferenceFailed(format!(
            "decoder returned {positions} positions for {input_len} input tokens"
        )));
    }
    Ok(logits.slice(s![0, input_len - 1, ..]).to_vec())
}

fn load_tokenizer(path: &Path) -> Result<Tokenizer> {
    Tokenizer::from_file(path).map_err(|e| DanbotError::ModelLoadFailed {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn load_session(path: &Path, params: &OnnxParams) -> Result<Session> {
    let mut builder =
        Session::builder()?.with_optimization_level(GraphOptimizationLevel::Level3)?;
    if let Some(n) = params.intra_threads {
        builder = builder.with_intra_threads(n)?;
    }
    let session = builder
        .commit_from_file(path)
        .map_err(|e| DanbotError::ModelLoadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
    debug!(path = %path.display(), "Session created");
    Ok(session)
}

/// `[1, n]` batch-of-one tensor.
fn row(values: &[i64]) -> Result<Array2<i64>> {
    Array2::from_shape_vec((1, values.len()), values.to_vec())
        .map_err(|e| DanbotError::InferenceFailed(e.to_string()))
}
