//! Puzzle verification shared by every room.
//!
//! Two modes cover the tomb: positional rooms compare a picked sequence against
//! a fixed solution slot by slot, and the balance scale compares the summed
//! weight of the picked tokens against a counterweight.
use serde::{Deserialize, Serialize};

/// Result of checking a (possibly partial) positional submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Every filled slot matches but the submission is still short.
    Incomplete,
    /// Full length and every slot matches.
    Matched,
    /// The slot at `index` differs from the solution.
    Mismatch { index: usize },
}

impl Verdict {
    #[must_use]
    pub const fn is_mismatch(self) -> bool {
        matches!(self, Self::Mismatch { .. })
    }
}

/// Full-length positional check.
#[must_use]
pub fn verify<T: PartialEq>(submission: &[T], target: &[T]) -> bool {
    submission.len() == target.len() && submission.iter().zip(target).all(|(a, b)| a == b)
}

/// Prefix check used after every pick. A wrong slot fails immediately rather
/// than waiting for the sequence to fill up.
#[must_use]
pub fn verify_prefix<T: PartialEq>(submission: &[T], target: &[T]) -> Verdict {
    if let Some(index) = submission
        .iter()
        .zip(target)
        .position(|(picked, expected)| picked != expected)
    {
        return Verdict::Mismatch { index };
    }
    if submission.len() > target.len() {
        return Verdict::Mismatch {
            index: target.len(),
        };
    }
    if submission.len() == target.len() {
        Verdict::Matched
    } else {
        Verdict::Incomplete
    }
}

/// Sum the weights of the submitted tokens and compare against `target`.
///
/// `weight_of` returns `None` for tokens without a weight, which count as zero.
#[must_use]
pub fn verify_weight_sum<T>(
    submission: &[T],
    weight_of: impl Fn(&T) -> Option<i32>,
    target: i32,
) -> bool {
    total_weight(submission, weight_of) == target
}

/// Summed weight of a selection, used by the scale to decide its tilt.
#[must_use]
pub fn total_weight<T>(submission: &[T], weight_of: impl Fn(&T) -> Option<i32>) -> i32 {
    submission
        .iter()
        .map(|token| weight_of(token).unwrap_or(0))
        .sum()
}

/// Verification strategy attached to a room definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Verification {
    /// Ordered sequence; slot `i` must equal `solution[i]`.
    Positional { solution: Vec<String> },
    /// Unordered set whose weights must add up to `target`.
    WeightSum { target: i32 },
}

impl Verification {
    /// Number of picks a full positional submission needs, if fixed.
    #[must_use]
    pub fn solution_len(&self) -> Option<usize> {
        match self {
            Self::Positional { solution } => Some(solution.len()),
            Self::WeightSum { .. } => None,
        }
    }

    /// Check a submission. Positional mode returns the prefix verdict; the
    /// weight mode is all-or-nothing.
    #[must_use]
    pub fn check(&self, submission: &[String], weight_of: impl Fn(&String) -> Option<i32>) -> Verdict {
        match self {
            Self::Positional { solution } => verify_prefix(submission, solution),
            Self::WeightSum { target } => {
                if verify_weight_sum(submission, weight_of, *target) {
                    Verdict::Matched
                } else {
                    Verdict::Mismatch {
                        index: submission.len().saturating_sub(1),
                    }
                }
            }
        }
    }
}
