//! CEFR proficiency levels and normalization of legacy labels.
//!
//! Persisted levels are always one of the six canonical CEFR codes. Earlier
//! app versions stored human-readable labels ("Beginner" etc.), so any value
//! crossing the persistence boundary goes through [`normalize`] first -- the
//! normalizer is the only writer of the level field.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A CEFR proficiency code, `a1` (lowest) through `c2` (highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProficiencyLevel {
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl ProficiencyLevel {
    /// The canonical lowercase code for this level.
    pub const fn as_str(self) -> &'static str {
        match self {
            ProficiencyLevel::A1 => "a1",
            ProficiencyLevel::A2 => "a2",
            ProficiencyLevel::B1 => "b1",
            ProficiencyLevel::B2 => "b2",
            ProficiencyLevel::C1 => "c1",
            ProficiencyLevel::C2 => "c2",
        }
    }

    /// Parse a canonical code (case-insensitive). Returns `None` for
    /// anything that is not exactly a CEFR code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "a1" => Some(ProficiencyLevel::A1),
            "a2" => Some(ProficiencyLevel::A2),
            "b1" => Some(ProficiencyLevel::B1),
            "b2" => Some(ProficiencyLevel::B2),
            "c1" => Some(ProficiencyLevel::C1),
            "c2" => Some(ProficiencyLevel::C2),
            _ => None,
        }
    }
}

impl fmt::Display for ProficiencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProficiencyLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s)
            .ok_or_else(|| CoreError::Validation(format!("Invalid CEFR level code '{s}'")))
    }
}

/// Non-fatal signal that [`normalize`] received input matching no known
/// level format and fell back to [`ProficiencyLevel::A1`]. Surfaced to logs
/// by callers, never raised as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizationWarning {
    /// The original input, verbatim.
    pub input: String,
}

/// Map a free-form or legacy proficiency label to a canonical CEFR code.
///
/// Lower-cases and trims the input, maps the legacy display names
/// (`Beginner` -> `a1`, `Intermediate` -> `b1`, `Advanced` -> `c1`), and
/// passes already-canonical codes through unchanged. Unknown input falls
/// back to `a1` with a [`NormalizationWarning`].
pub fn normalize(input: &str) -> (ProficiencyLevel, Option<NormalizationWarning>) {
    let lowered = input.trim().to_ascii_lowercase();

    let level = match lowered.as_str() {
        "beginner" => Some(ProficiencyLevel::A1),
        "intermediate" => Some(ProficiencyLevel::B1),
        "advanced" => Some(ProficiencyLevel::C1),
        code => ProficiencyLevel::from_code(code),
    };

    match level {
        Some(level) => (level, None),
        None => (
            ProficiencyLevel::A1,
            Some(NormalizationWarning {
                input: input.to_string(),
            }),
        ),
    }
}
