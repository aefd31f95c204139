//! Vote aggregation algorithms.
//!
//! One pure function per [`DecisionType`]. Each takes the option list and the
//! voter→option map of a vote and returns the winning option with a
//! confidence in [0, 1]. Ties resolve to the option listed first.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Result sentinel when no option meets the decision rule.
pub const NO_CONSENSUS: &str = "no_consensus";

/// Result sentinel when a vote closed without any votes.
pub const NO_VOTES: &str = "no_votes";

/// Aggregation algorithm used to finalize a vote.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum DecisionType {
    /// Every voter must pick the same option
    Unanimous,
    /// Most votes wins
    #[default]
    Majority,
    /// Most total voter weight wins
    Weighted,
    /// Weighted by each voter's declared role
    Hierarchical,
    /// An option needs a qualified share of the votes
    Consensus,
}

impl DecisionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionType::Unanimous => "unanimous",
            DecisionType::Majority => "majority",
            DecisionType::Weighted => "weighted",
            DecisionType::Hierarchical => "hierarchical",
            DecisionType::Consensus => "consensus",
        }
    }
}

/// Winning option and how strongly it was supported.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionResult {
    pub winner: String,
    pub confidence: f64,
}

impl DecisionResult {
    pub fn new(winner: impl Into<String>, confidence: f64) -> Self {
        Self {
            winner: winner.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub(crate) fn no_consensus() -> Self {
        Self::new(NO_CONSENSUS, 0.0)
    }

    pub(crate) fn no_votes() -> Self {
        Self::new(NO_VOTES, 0.0)
    }

    /// Whether a real option won.
    pub fn is_decided(&self) -> bool {
        self.winner != NO_CONSENSUS && self.winner != NO_VOTES
    }
}

/// Number of votes per option, in option order.
pub fn tally(options: &[String], votes: &BTreeMap<String, String>) -> Vec<(String, usize)> {
    options
        .iter()
        .map(|option| {
            let count = votes.values().filter(|choice| *choice == option).count();
            (option.clone(), count)
        })
        .collect()
}

/// Index of the largest value; the first one wins ties.
fn leader<T: PartialOrd + Copy>(values: &[T]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, value) in values.iter().enumerate() {
        if best.map_or(true, |b| *value > values[b]) {
            best = Some(i);
        }
    }
    best
}

/// Every one of `voter_count` voters chose the same option.
pub fn unanimous(
    options: &[String],
    votes: &BTreeMap<String, String>,
    voter_count: usize,
) -> DecisionResult {
    if votes.is_empty() {
        return DecisionResult::no_votes();
    }

    tally(options, votes)
        .into_iter()
        .find(|(_, count)| *count == voter_count)
        .map(|(option, _)| DecisionResult::new(option, 1.0))
        .unwrap_or_else(DecisionResult::no_consensus)
}

/// The option with the most votes; confidence is its share of the votes.
pub fn majority(options: &[String], votes: &BTreeMap<String, String>) -> DecisionResult {
    if votes.is_empty() {
        return DecisionResult::no_votes();
    }

    let counts = tally(options, votes);
    let values: Vec<usize> = counts.iter().map(|(_, c)| *c).collect();
    match leader(&values) {
        Some(i) => {
            let (option, count) = &counts[i];
            DecisionResult::new(option.clone(), *count as f64 / votes.len() as f64)
        }
        None => DecisionResult::no_consensus(),
    }
}

/// The option with the largest summed voter weight.
///
/// Confidence is the winner's share of the total weight. A total weight of
/// zero decides nothing.
pub fn weighted<F>(
    options: &[String],
    votes: &BTreeMap<String, String>,
    weight_of: F,
) -> DecisionResult
where
    F: Fn(&str) -> f64,
{
    if votes.is_empty() {
        return DecisionResult::no_votes();
    }

    let mut totals = vec![0.0_f64; options.len()];
    for (voter, choice) in votes {
        if let Some(i) = options.iter().position(|o| o == choice) {
            totals[i] += weight_of(voter).max(0.0);
        }
    }

    let total_weight: f64 = totals.iter().sum();
    if total_weight <= 0.0 {
        return DecisionResult::no_consensus();
    }

    match leader(&totals) {
        Some(i) => DecisionResult::new(options[i].clone(), totals[i] / total_weight),
        None => DecisionResult::no_consensus(),
    }
}

/// The option holding at least `threshold` of the votes.
///
/// When several qualify (thresholds of one half or below) the one with most
/// votes wins. Confidence is the winner's share of the votes.
pub fn consensus(
    options: &[String],
    votes: &BTreeMap<String, String>,
    threshold: f64,
) -> DecisionResult {
    if votes.is_empty() {
        return DecisionResult::no_votes();
    }

    let total = votes.len() as f64;
    let required = threshold * total - 1e-9;
    let counts = tally(options, votes);
    let qualifying: Vec<f64> = counts
        .iter()
        .map(|(_, c)| {
            let c = *c as f64;
            if c >= required {
                c
            } else {
                -1.0
            }
        })
        .collect();

    match leader(&qualifying) {
        Some(i) if qualifying[i] >= 0.0 && counts[i].1 > 0 => {
            DecisionResult::new(counts[i].0.clone(), counts[i].1 as f64 / total)
        }
        _ => DecisionResult::no_consensus(),
    }
}
