//! Core types for Pastecraft

use serde::{Deserialize, Serialize};

/// Outcome of running the rule chain over one paste
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    /// Whether the final text differs from the pasted text
    pub changed: bool,

    /// The final text (equal to the input when nothing changed)
    pub result: String,
}

impl RunResult {
    /// Build a result from the pasted input and the text the chain produced
    pub fn new(input: &str, result: String) -> Self {
        Self {
            changed: result != input,
            result,
        }
    }

    /// A result that leaves the paste untouched
    pub fn unchanged(input: impl Into<String>) -> Self {
        Self {
            changed: false,
            result: input.into(),
        }
    }

    /// The result used when the host hands over no text at all
    pub fn empty() -> Self {
        Self::unchanged(String::new())
    }
}
