//! Decoder vocabulary: token string ↔ id.

use std::collections::HashMap;

use serde::{Serialize, Serializer};

use crate::error::{DanbotError, Result};

/// Validated, read-only vocabulary loaded once at startup.
///
/// Serializes as the plain `{token: id}` object.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    map: HashMap<String, u32>,
    /// id → token; `None` for ids the model has but the map does not name.
    tokens: Vec<Option<String>>,
}

impl Vocabulary {
    /// Build from a token → id map, checking it against the model's
    /// output width.
    pub fn new(map: HashMap<String, u32>, vocab_size: usize) -> Result<Self> {
        if map.is_empty() {
            return Err(DanbotError::InvalidVocabulary("vocabulary is empty".into()));
        }
        let mut tokens: Vec<Option<String>> = vec![None; vocab_size];
        for (token, &id) in &map {
            let slot = tokens.get_mut(id as usize).ok_or_else(|| {
                DanbotError::InvalidVocabulary(format!(
                    "token '{token}' has id {id}, outside vocabulary size {vocab_size}"
                ))
            })?;
            if let Some(existing) = slot {
                return Err(DanbotError::InvalidVocabulary(format!(
                    "id {id} is shared by '{existing}' and '{token}'"
                )));
            }
            *slot = Some(token.clone());
        }
        Ok(Self { map, tokens })
    }

    /// The full token → id mapping.
    pub fn get_vocab(&self) -> &HashMap<String, u32> {
        &self.map
    }

    /// Model output width (number of score entries per step).
    pub fn size(&self) -> usize {
        self.tokens.len()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn id(&self, token: &str) -> Option<u32> {
        self.map.get(token).copied()
    }

    pub fn token(&self, id: u32) -> Option<&str> {
        self.tokens.get(id as usize).and_then(|t| t.as_deref())
    }
}

impl Serialize for Vocabulary {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.map.serialize(serializer)
    }
}
