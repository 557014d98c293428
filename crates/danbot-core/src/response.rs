//! Wire payload: `{ "vocab": {...}, "logits": [[...]] }`.

use serde::Serialize;

use crate::vocab::Vocabulary;

/// Response body for one prediction. Borrows the shared vocabulary so it is
/// never copied per request.
#[derive(Debug, Serialize)]
pub struct ResponsePayload<'a> {
    pub vocab: &'a Vocabulary,
    pub logits: Vec<Vec<f32>>,
}

pub fn assemble(vocab: &Vocabulary, logits: Vec<Vec<f32>>) -> ResponsePayload<'_> {
    ResponsePayload { vocab, logits }
}
