// src/tyres.rs
//
// Tyre compound name → integer code mapping. The compound travels through
// the resampler as a plain numeric channel, so each variant carries a fixed
// code and anything unrecognized maps to Unknown rather than failing.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TyreCompound {
    Unknown,
    Soft,
    Medium,
    Hard,
    Intermediate,
    Wet,
}

impl TyreCompound {
    /// Parse a compound name as reported by the acquisition layer.
    /// Case-insensitive; unrecognized names become `Unknown`.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_uppercase().as_str() {
            "SOFT" => Self::Soft,
            "MEDIUM" => Self::Medium,
            "HARD" => Self::Hard,
            "INTERMEDIATE" => Self::Intermediate,
            "WET" => Self::Wet,
            _ => Self::Unknown,
        }
    }

    /// Integer code used for the numeric tyre channel.
    pub fn code(self) -> i64 {
        match self {
            Self::Unknown => 0,
            Self::Soft => 1,
            Self::Medium => 2,
            Self::Hard => 3,
            Self::Intermediate => 4,
            Self::Wet => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Soft => "soft",
            Self::Medium => "medium",
            Self::Hard => "hard",
            Self::Intermediate => "intermediate",
            Self::Wet => "wet",
        }
    }
}
