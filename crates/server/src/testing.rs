//! Route-test fixtures: a scripted scorer behind a real pipeline.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use danbot_core::{
    DanbotError, Mode, ModelInputs, Pipeline, PipelineSettings, Result, Scorer,
};

use crate::state::AppState;

pub const TOKENS: &[&str] = &["<|bos|>", "</translation>", "<translation>", "cat", "black"];
const END_ID: u32 = 1;

/// Echoes the encoder words it knows, then ends.
pub struct EchoScorer {
    calls: Arc<AtomicUsize>,
    fail: bool,
}

impl Scorer for EchoScorer {
    type Inputs = ModelInputs;

    fn vocab_size(&self) -> usize {
        TOKENS.len()
    }

    fn vocab(&self) -> HashMap<String, u32> {
        TOKENS
            .iter()
            .enumerate()
            .map(|(i, t)| (t.to_string(), i as u32))
            .collect()
    }

    fn prepare_inputs(&self, encoder_text: &str, _decoder_control: &str) -> Result<ModelInputs> {
        let encoder_ids: Vec<i64> = encoder_text
            .split_whitespace()
            .filter_map(|w| TOKENS.iter().position(|t| *t == w))
            .map(|i| i as i64)
            .collect();
        Ok(ModelInputs {
            encoder_mask: vec![1; encoder_ids.len()],
            encoder_ids,
            decoder_ids: vec![0],
        })
    }

    fn forward_step(&self, inputs: &ModelInputs, history: &[u32]) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DanbotError::InferenceFailed("device lost".into()));
        }
        let target = inputs
            .encoder_ids
            .get(history.len())
            .map(|&id| id as u32)
            .unwrap_or(END_ID);
        let mut scores = vec![-1.0; TOKENS.len()];
        scores[target as usize] = 4.0;
        Ok(scores)
    }
}

/// App state over an [`EchoScorer`], plus its forward-pass counter.
pub fn test_state(mode: Mode, fail: bool) -> (AppState, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let scorer = EchoScorer {
        calls: calls.clone(),
        fail,
    };
    let pipeline = Pipeline::new(
        scorer,
        PipelineSettings {
            mode,
            max_steps: 8,
            ..Default::default()
        },
    )
    .unwrap();
    (AppState::new(Arc::new(pipeline)), calls)
}
