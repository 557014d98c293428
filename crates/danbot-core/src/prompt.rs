//! Decoder control-sequence formatting.

use crate::decoding::DecodingConfig;
use crate::error::{DanbotError, Result};

/// Control syntax understood by the tag decoder.
pub const DEFAULT_CONTROL_TEMPLATE: &str = "<|bos|><|aspect_ratio:{aspect_ratio}|><|rating:{rating}|><|length:{length}|><|translate:{translate_mode}|><translation>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    AspectRatio,
    Rating,
    Length,
    TranslateMode,
}

impl Field {
    fn parse(name: &str) -> Option<Self> {
        match name {
            "aspect_ratio" => Some(Self::AspectRatio),
            "rating" => Some(Self::Rating),
            "length" => Some(Self::Length),
            "translate_mode" => Some(Self::TranslateMode),
            _ => None,
        }
    }

    fn value(self, cfg: &DecodingConfig) -> &'static str {
        match self {
            Self::AspectRatio => cfg.aspect_ratio.as_str(),
            Self::Rating => cfg.rating.as_str(),
            Self::Length => cfg.length.as_str(),
            Self::TranslateMode => cfg.translate_mode.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Field),
}

/// A parsed control template.
///
/// Literal text with `{field}` placeholders for the four decoding
/// attributes. `{{` and `}}` produce literal braces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlTemplate {
    segments: Vec<Segment>,
}

impl ControlTemplate {
    pub fn parse(source: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' if chars.peek().map(|&(_, n)| n) == Some('{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek().map(|&(_, n)| n) == Some('}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, n) in chars.by_ref() {
                        if n == '}' {
                            closed = true;
                            break;
                        }
                        name.push(n);
                    }
                    if !closed {
                        return Err(DanbotError::InvalidTemplate(format!(
                            "unclosed placeholder at byte {pos}"
                        )));
                    }
                    let field = Field::parse(name.trim()).ok_or_else(|| {
                        DanbotError::InvalidTemplate(format!("unknown placeholder '{{{name}}}'"))
                    })?;
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(field));
                }
                '}' => {
                    return Err(DanbotError::InvalidTemplate(format!(
                        "unmatched '}}' at byte {pos}"
                    )));
                }
                _ => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        let blank = segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(l) if l.trim().is_empty()));
        if blank {
            return Err(DanbotError::InvalidTemplate(
                "template renders an empty control sequence".into(),
            ));
        }

        Ok(Self { segments })
    }

    /// Render the template for `cfg`. Never tokenizes.
    pub fn render(&self, cfg: &DecodingConfig) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Field(f) => out.push_str(f.value(cfg)),
            }
        }
        out
    }
}

impl Default for ControlTemplate {
    fn default() -> Self {
        Self::parse(DEFAULT_CONTROL_TEMPLATE).expect("built-in control template is valid")
    }
}

/// Encoder text and decoder control sequence for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub encoder_text: String,
    pub decoder_control: String,
}

/// Turns raw input into the two texts the model consumes.
///
/// The control sequence only depends on the fixed [`DecodingConfig`], so it
/// is rendered once at construction.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    config: DecodingConfig,
    decoder_control: String,
}

impl PromptBuilder {
    pub fn new(template: &ControlTemplate, config: DecodingConfig) -> Self {
        Self {
            config,
            decoder_control: template.render(&config),
        }
    }

    pub fn config(&self) -> &DecodingConfig {
        &self.config
    }

    pub fn decoder_control(&self) -> &str {
        &self.decoder_control
    }

    pub fn build(&self, input_text: &str) -> Prompt {
        Prompt {
            encoder_text: input_text.to_owned(),
            decoder_control: self.decoder_control.clone(),
        }
    }
}
