//! Decoding attributes and serving mode.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DanbotError;

/// Declares a closed-set attribute enum with its wire spelling.
macro_rules! attribute {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$(Self::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = DanbotError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(DanbotError::InvalidConfig(format!(
                        "unknown {} '{}', expected one of: {}",
                        stringify!($name),
                        other,
                        [$($text),+].join(", ")
                    ))),
                }
            }
        }
    };
}

attribute! {
    /// Target image aspect ratio.
    AspectRatio {
        UltraWide => "ultra_wide",
        Wide => "wide",
        Square => "square",
        Tall => "tall",
        UltraTall => "ultra_tall",
    }
}

attribute! {
    /// Content rating.
    Rating {
        General => "general",
        Sensitive => "sensitive",
        Questionable => "questionable",
        Explicit => "explicit",
    }
}

attribute! {
    /// Requested tag-list length.
    Length {
        VeryShort => "very_short",
        Short => "short",
        Medium => "medium",
        Long => "long",
        VeryLong => "very_long",
    }
}

attribute! {
    /// How literally the input is translated into tags.
    TranslateMode {
        Exact => "exact",
        Approx => "approx",
    }
}

/// Style attributes serialized into the decoder control sequence.
///
/// Fixed for the whole deployment; never derived from request input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodingConfig {
    pub aspect_ratio: AspectRatio,
    pub rating: Rating,
    pub length: Length,
    pub translate_mode: TranslateMode,
}

impl Default for DecodingConfig {
    fn default() -> Self {
        Self {
            aspect_ratio: AspectRatio::Tall,
            rating: Rating::General,
            length: Length::VeryShort,
            translate_mode: TranslateMode::Exact,
        }
    }
}

/// Serving variant, chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Greedy autoregressive decoding; responses carry probabilities.
    #[default]
    Generative,
    /// One forward pass; responses carry raw scores.
    SinglePass,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Generative => "generative",
            Self::SinglePass => "single_pass",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = DanbotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generative" => Ok(Self::Generative),
            "single_pass" | "single-pass" => Ok(Self::SinglePass),
            other => Err(DanbotError::InvalidConfig(format!(
                "unknown mode '{other}', expected 'generative' or 'single_pass'"
            ))),
        }
    }
}
