//! Model directory manifest (`model.json`).
//!
//! Describes where a converted model came from and how its files are laid
//! out, so the backend can be loaded without guessing:
//!
//! ```json
//! {
//!   "repo": "dartags/DanbotNL-2408-260m",
//!   "revision": "827103c",
//!   "precision": "bf16"
//! }
//! ```
//!
//! Every other key has a default.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DanbotError, Result};

pub const MANIFEST_FILE: &str = "model.json";

/// Revision of the published checkpoint this server is built for.
pub const PINNED_REVISION: &str = "827103c";

/// Literal marker that ends a translation.
pub const DEFAULT_END_TOKEN: &str = "</translation>";

/// Compute precision the weights were exported with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    #[default]
    F32,
    F16,
    Bf16,
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::F32 => write!(f, "f32"),
            Self::F16 => write!(f, "f16"),
            Self::Bf16 => write!(f, "bf16"),
        }
    }
}

/// Tensor names of the exported graphs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IoNames {
    pub encoder_input_ids: String,
    pub encoder_attention_mask: String,
    pub encoder_hidden_states: String,
    pub decoder_input_ids: String,
    pub decoder_encoder_hidden_states: String,
    pub decoder_encoder_attention_mask: String,
    pub decoder_logits: String,
}

impl Default for IoNames {
    fn default() -> Self {
        Self {
            encoder_input_ids: "input_ids".into(),
            encoder_attention_mask: "attention_mask".into(),
            encoder_hidden_states: "last_hidden_state".into(),
            decoder_input_ids: "input_ids".into(),
            decoder_encoder_hidden_states: "encoder_hidden_states".into(),
            decoder_encoder_attention_mask: "encoder_attention_mask".into(),
            decoder_logits: "logits".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelManifest {
    /// Name of the pretrained artifact.
    pub repo: String,
    /// Immutable revision (commit hash or prefix).
    pub revision: String,
    #[serde(default)]
    pub precision: Precision,
    #[serde(default = "default_encoder")]
    pub encoder: PathBuf,
    #[serde(default = "default_decoder")]
    pub decoder: PathBuf,
    #[serde(default = "default_encoder_tokenizer")]
    pub encoder_tokenizer: PathBuf,
    #[serde(default = "default_decoder_tokenizer")]
    pub decoder_tokenizer: PathBuf,
    /// Overrides the built-in control template.
    #[serde(default)]
    pub control_template: Option<String>,
    #[serde(default = "default_end_token")]
    pub end_token: String,
    /// Width of the decoder logits when it differs from the tokenizer's
    /// vocabulary size (padded embeddings).
    #[serde(default)]
    pub vocab_size: Option<usize>,
    #[serde(default)]
    pub io: IoNames,
}

fn default_encoder() -> PathBuf {
    "encoder.onnx".into()
}
fn default_decoder() -> PathBuf {
    "decoder.onnx".into()
}
fn default_encoder_tokenizer() -> PathBuf {
    "encoder_tokenizer.json".into()
}
fn default_decoder_tokenizer() -> PathBuf {
    "decoder_tokenizer.json".into()
}
fn default_end_token() -> String {
    DEFAULT_END_TOKEN.into()
}

impl ModelManifest {
    /// Read `model.json` from `dir` and check that the files it names exist.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        let data = std::fs::read_to_string(&path).map_err(|e| DanbotError::ModelLoadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let manifest: Self = serde_json::from_str(&data)?;

        for file in manifest.files() {
            let full = dir.join(file);
            if !full.is_file() {
                return Err(DanbotError::ModelLoadFailed {
                    path: full.display().to_string(),
                    reason: "file named in manifest does not exist".into(),
                });
            }
        }

        debug!(
            repo = %manifest.repo,
            revision = %manifest.revision,
            precision = %manifest.precision,
            "Manifest loaded"
        );
        Ok(manifest)
    }

    /// Relative paths of all model files.
    pub fn files(&self) -> [&Path; 4] {
        [
            self.encoder.as_path(),
            self.decoder.as_path(),
            self.encoder_tokenizer.as_path(),
            self.decoder_tokenizer.as_path(),
        ]
    }

    /// Check the declared revision against a pinned one. Short hashes match
    /// their full form in either direction.
    pub fn verify_revision(&self, expected: &str) -> Result<()> {
        let found = self.revision.trim();
        let expected = expected.trim();
        let matches = !found.is_empty()
            && !expected.is_empty()
            && (found.starts_with(expected) || expected.starts_with(found));
        if matches {
            Ok(())
        } else {
            Err(DanbotError::RevisionMismatch {
                expected: expected.into(),
                found: found.into(),
            })
        }
    }
}
