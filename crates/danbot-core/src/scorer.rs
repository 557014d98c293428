//! The model capability the decode engine runs against.

use std::collections::HashMap;

use crate::error::Result;

/// Batch-of-one token bundle for an encoder–decoder forward pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInputs {
    pub encoder_ids: Vec<i64>,
    pub encoder_mask: Vec<i64>,
    pub decoder_ids: Vec<i64>,
}

/// Raw (unnormalized) score vectors, one per decoding step, in step order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreSequence(Vec<Vec<f32>>);

impl ScoreSequence {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, scores: Vec<f32>) {
        self.0.push(scores);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn steps(&self) -> &[Vec<f32>] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<Vec<f32>> {
        self.0
    }
}

impl From<Vec<Vec<f32>>> for ScoreSequence {
    fn from(steps: Vec<Vec<f32>>) -> Self {
        Self(steps)
    }
}

/// A loaded model/tokenizer pair.
///
/// Implementations are shared across requests and must not mutate
/// internal state from these methods.
pub trait Scorer: Send + Sync {
    /// Per-request prepared state (token ids plus anything the backend
    /// can compute once per request, such as encoder outputs).
    type Inputs: Send;

    /// Width of every score vector.
    fn vocab_size(&self) -> usize;

    /// Decoder token → id mapping.
    fn vocab(&self) -> HashMap<String, u32>;

    /// Tokenize both texts and prepare them for forward passes.
    fn prepare_inputs(&self, encoder_text: &str, decoder_control: &str) -> Result<Self::Inputs>;

    /// Scores at the final position of the control sequence.
    fn forward_once(&self, inputs: &Self::Inputs) -> Result<Vec<f32>> {
        self.forward_step(inputs, &[])
    }

    /// Scores for the position after the control sequence followed by
    /// `history`.
    fn forward_step(&self, inputs: &Self::Inputs, history: &[u32]) -> Result<Vec<f32>>;
}
