//! Result labels - the closed HUMAN / AI outcome of a classification
//!
//! Labels are persisted through the `results` table as fixed surrogate ids:
//! - `Human`: id 1, stored as "HUMAN"
//! - `Ai`: id 2, stored as "AI"

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Probability above which a sample is labelled AI.
///
/// The comparison is strict, so a probability of exactly 0.5 is HUMAN.
pub const AI_THRESHOLD: f64 = 0.5;

/// Outcome of a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Label {
    /// Written by a person
    Human,
    /// Generated by a model
    Ai,
}

impl Label {
    /// Surrogate key of this label in the `results` table
    pub fn id(&self) -> i64 {
        match self {
            Label::Human => 1,
            Label::Ai => 2,
        }
    }

    /// Get the string representation stored in `results.label_name`
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Human => "HUMAN",
            Label::Ai => "AI",
        }
    }

    /// Map a surrogate key back to its label
    pub fn from_id(id: i64) -> Option<Label> {
        match id {
            1 => Some(Label::Human),
            2 => Some(Label::Ai),
            _ => None,
        }
    }

    pub fn from_is_ai(is_ai: bool) -> Label {
        if is_ai { Label::Ai } else { Label::Human }
    }

    /// Apply the `p > AI_THRESHOLD` decision to an AI probability
    pub fn from_probability(ai_probability: f64) -> Label {
        Label::from_is_ai(ai_probability > AI_THRESHOLD)
    }

    pub fn is_ai(&self) -> bool {
        matches!(self, Label::Ai)
    }

    /// Get all labels, in seed order
    pub fn all() -> &'static [Label] {
        &[Label::Human, Label::Ai]
    }
}

impl FromStr for Label {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "HUMAN" => Ok(Label::Human),
            "AI" => Ok(Label::Ai),
            _ => Err(Error::InvalidLabel(s.to_string())),
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
