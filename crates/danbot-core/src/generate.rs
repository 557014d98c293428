//! Greedy scored generation and single-pass scoring.

use tracing::debug;

use crate::decoding::Mode;
use crate::error::{DanbotError, Result};
use crate::scorer::{ScoreSequence, Scorer};

/// Step cap used when none is configured.
pub const DEFAULT_MAX_STEPS: usize = 128;

/// Parameters for the autoregressive loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Hard upper bound on generated steps. Always ≥ 1.
    max_steps: usize,
    /// Token id that terminates generation.
    end_token_id: u32,
}

impl DecodeOptions {
    pub fn new(max_steps: usize, end_token_id: u32) -> Result<Self> {
        if max_steps == 0 {
            return Err(DanbotError::InvalidConfig(
                "max_steps must be at least 1".into(),
            ));
        }
        Ok(Self {
            max_steps,
            end_token_id,
        })
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub fn end_token_id(&self) -> u32 {
        self.end_token_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// The end-of-translation token was produced.
    Stop,
    /// Reached `max_steps`.
    Length,
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stop => write!(f, "stop"),
            Self::Length => write!(f, "length"),
        }
    }
}

/// Raw output of the decode engine for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub scores: ScoreSequence,
    /// Token chosen at each step (generative mode only).
    pub tokens: Vec<u32>,
    /// `None` in single-pass mode.
    pub finish_reason: Option<FinishReason>,
}

/// Run the decode engine in the given mode.
pub fn decode<S: Scorer>(
    scorer: &S,
    inputs: &S::Inputs,
    mode: Mode,
    options: &DecodeOptions,
) -> Result<Decoded> {
    match mode {
        Mode::Generative => generate(scorer, inputs, options),
        Mode::SinglePass => Ok(Decoded {
            scores: score_once(scorer, inputs)?,
            tokens: Vec::new(),
            finish_reason: None,
        }),
    }
}

/// Greedy decoding until the end token or the step cap.
///
/// The returned scores include the step that produced the end token.
pub fn generate<S: Scorer>(
    scorer: &S,
    inputs: &S::Inputs,
    options: &DecodeOptions,
) -> Result<Decoded> {
    let width = scorer.vocab_size();
    let mut scores = ScoreSequence::new();
    let mut history: Vec<u32> = Vec::new();

    let finish_reason = loop {
        if history.len() >= options.max_steps {
            break FinishReason::Length;
        }

        let step = scorer.forward_step(inputs, &history)?;
        check_width(&step, width)?;
        let next = argmax(&step)?;
        scores.push(step);
        history.push(next);

        if next == options.end_token_id {
            break FinishReason::Stop;
        }
    };

    debug!(steps = history.len(), %finish_reason, "Generation finished");
    Ok(Decoded {
        scores,
        tokens: history,
        finish_reason: Some(finish_reason),
    })
}

/// One forward pass; scores at the final decoder position.
pub fn score_once<S: Scorer>(scorer: &S, inputs: &S::Inputs) -> Result<ScoreSequence> {
    let step = scorer.forward_once(inputs)?;
    check_width(&step, scorer.vocab_size())?;
    Ok(ScoreSequence::from(vec![step]))
}

/// Index of the highest score; ties go to the lowest index, NaN never wins.
pub fn argmax(scores: &[f32]) -> Result<u32> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &s) in scores.iter().enumerate() {
        if s.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if s <= b => {}
            _ => best = Some((i, s)),
        }
    }
    best.map(|(i, _)| i as u32).ok_or(DanbotError::NonFiniteScores)
}

fn check_width(scores: &[f32], expected: usize) -> Result<()> {
    if scores.len() != expected {
        return Err(DanbotError::ScoreShape {
            expected,
            actual: scores.len(),
        });
    }
    Ok(())
}
