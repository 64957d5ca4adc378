// src/classification/verdict.rs
//! Session verdict by majority vote over per-row predictions

use super::model::{ClassLabel, POSITIVE_CLASS};
use crate::error::{PureItError, PureItResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Screening outcome of one detection run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Verdict {
    Cts,
    NoCts,
    /// Equal votes with no tie-break preference
    Inconclusive,
}

impl Verdict {
    /// Text shown on the result screen
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Cts => "CTS",
            Verdict::NoCts => "No CTS",
            Verdict::Inconclusive => "Inconclusive",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rule for an exact 50/50 split
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    #[default]
    Inconclusive,
    PreferNegative,
    PreferPositive,
}

/// Verdict plus the vote counts behind it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictSummary {
    pub verdict: Verdict,
    pub positive: usize,
    pub negative: usize,
}

impl VerdictSummary {
    pub fn total(&self) -> usize {
        self.positive + self.negative
    }
}

impl fmt::Display for VerdictSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} CTS / {} No CTS)",
            self.verdict, self.positive, self.negative
        )
    }
}

/// Reduce row predictions to one verdict.
///
/// Label [`POSITIVE_CLASS`] votes CTS and every other label votes No CTS. The
/// class with strictly more votes wins, which also covers the unanimous case.
/// An exact tie is settled by `tie_break`. No predictions at all is an error.
pub fn reduce_predictions(predictions: &[ClassLabel], tie_break: TieBreak) -> PureItResult<VerdictSummary> {
    if predictions.is_empty() {
        return Err(PureItError::InsufficientData {
            operation: "verdict".to_string(),
            reason: "no predictions to vote on".to_string(),
        });
    }

    let positive = predictions.iter().filter(|&&label| label == POSITIVE_CLASS).count();
    let negative = predictions.len() - positive;

    let verdict = match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => Verdict::Cts,
        std::cmp::Ordering::Less => Verdict::NoCts,
        std::cmp::Ordering::Equal => match tie_break {
            TieBreak::Inconclusive => Verdict::Inconclusive,
            TieBreak::PreferNegative => Verdict::NoCts,
            TieBreak::PreferPositive => Verdict::Cts,
        },
    };

    Ok(VerdictSummary {
        verdict,
        positive,
        negative,
    })
}
