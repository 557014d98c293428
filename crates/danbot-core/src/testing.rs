//! Deterministic stand-in for a real model.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{DanbotError, Result};
use crate::scorer::{ModelInputs, Scorer};

pub const TOKENS: &[&str] = &[
    "<|bos|>",
    "<|eos|>",
    "</translation>",
    "<translation>",
    "cat",
    "black",
    "1girl",
    "solo",
];

pub const END_ID: u32 = 2;
const SOLO_ID: u32 = 7;

/// Emits the encoder words it knows, in order, then the end marker.
pub struct FakeScorer {
    pub never_ends: bool,
    pub fail_at_step: Option<usize>,
    pub width: usize,
    pub calls: AtomicUsize,
}

impl FakeScorer {
    pub fn new() -> Self {
        Self {
            never_ends: false,
            fail_at_step: None,
            width: TOKENS.len(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Scorer for FakeScorer {
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

    fn prepare_inputs(&self, encoder_text: &str, decoder_control: &str) -> Result<ModelInputs> {
        let encoder_ids: Vec<i64> = encoder_text
            .split_whitespace()
            .filter_map(|w| TOKENS.iter().position(|t| *t == w))
            .map(|i| i as i64)
            .collect();
        Ok(ModelInputs {
            encoder_mask: vec![1; encoder_ids.len()],
            encoder_ids,
            decoder_ids: vec![0; decoder_control.len().min(4)],
        })
    }

    fn forward_step(&self, inputs: &ModelInputs, history: &[u32]) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = history.len();
        if self.fail_at_step == Some(step) {
            return Err(DanbotError::InferenceFailed("out of memory".into()));
        }

        let target = if self.never_ends {
            SOLO_ID
        } else {
            inputs
                .encoder_ids
                .get(step)
                .map(|&id| id as u32)
                .unwrap_or(END_ID)
        };

        let mut scores: Vec<f32> = (0..self.width)
            .map(|j| -0.25 * j as f32 + 0.01 * (step as f32))
            .collect();
        if let Some(s) = scores.get_mut(target as usize) {
            *s = 6.0;
        }
        Ok(scores)
    }
}
