use thiserror::Error;

#[derive(Error, Debug)]
pub enum DanbotError {
    #[error("Failed to load model from '{path}': {reason}")]
    ModelLoadFailed { path: String, reason: String },

    #[error("Model revision mismatch: expected '{expected}', manifest declares '{found}'")]
    RevisionMismatch { expected: String, found: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid control template: {0}")]
    InvalidTemplate(String),

    #[error("Invalid vocabulary: {0}")]
    InvalidVocabulary(String),

    #[error("Token '{0}' is not in the decoder vocabulary")]
    UnknownToken(String),

    #[error("Tokenization failed: {0}")]
    TokenizationFailed(String),

    #[error("Inference failed: {0}")]
    InferenceFailed(String),

    #[error("Score vector has {actual} entries, expected {expected}")]
    ScoreShape { expected: usize, actual: usize },

    #[error("Score vector contains no comparable value")]
    NonFiniteScores,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "onnx")]
    #[error("ONNX Runtime error: {0}")]
    Ort(#[from] ort::Error),
}

pub type Result<T> = std::result::Result<T, DanbotError>;
