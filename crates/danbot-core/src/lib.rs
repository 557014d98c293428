//! Scored decoding pipeline for a natural-language → tag translation model.
//!
//! Builds the decoder control sequence, runs greedy generation (or a single
//! forward pass) against a [`Scorer`], normalizes the step scores and
//! packages them with the decoder vocabulary.

pub mod decoding;
pub mod error;
pub mod generate;
pub mod manifest;
pub mod normalize;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod pipeline;
pub mod prompt;
pub mod response;
pub mod scorer;
pub mod vocab;

#[cfg(test)]
mod testing;

pub use decoding::{AspectRatio, DecodingConfig, Length, Mode, Rating, TranslateMode};
pub use error::{DanbotError, Result};
pub use generate::{DecodeOptions, FinishReason};
pub use manifest::{ModelManifest, Precision};
#[cfg(feature = "onnx")]
pub use onnx::{OnnxParams, OnnxScorer};
pub use pipeline::{Pipeline, PipelineSettings, Prediction, Predictor};
pub use prompt::{ControlTemplate, PromptBuilder};
pub use response::ResponsePayload;
pub use scorer::{ModelInputs, ScoreSequence, Scorer};
pub use vocab::Vocabulary;
