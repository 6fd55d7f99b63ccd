use anyhow::{anyhow, Error};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

/// Value to use as a 'negative infinity' score.  Scores are `f64`, so this is a true negative
/// infinity: adding finite penalties to it leaves it unchanged and it never wins a `max`.
pub const MIN_SCORE: f64 = f64::NEG_INFINITY;

pub const DEFAULT_ALIGNER_CAPACITY: usize = 200;

/// The number of DP cells at or below which the divide-and-conquer traceback falls back to a full
/// quadratic-memory alignment.
pub const DEFAULT_HIRSCHBERG_CUTOFF: usize = 4096;

/// The character inserted into an aligned sequence opposite a symbol from the other sequence.
pub const GAP_CHAR: char = '-';

/// Alignment operations supported are match, substitution, insertion and deletion, with `x`
/// (the first sequence) considered the query and `y` (the second) the reference.
#[derive(Eq, PartialEq, Debug, Copy, Clone, Hash, Serialize, Deserialize)]
pub enum AlignmentOperation {
    Match, // Consumes one x and one y symbol
    Subst, // Consumes one x and one y symbol
    Del,   // Consumes a single y symbol
    Ins,   // Consumes a single x symbol
}

impl AlignmentOperation {
    pub fn as_str(&self) -> &'static str {
        match *self {
            AlignmentOperation::Match => "=",
            AlignmentOperation::Subst => "X",
            AlignmentOperation::Del => "D",
            AlignmentOperation::Ins => "I",
        }
    }

    pub fn length_on_x(&self) -> usize {
        use AlignmentOperation::{Del, Ins, Match, Subst};
        match *self {
            Match | Subst | Ins => 1,
            Del => 0,
        }
    }

    pub fn length_on_y(&self) -> usize {
        use AlignmentOperation::{Del, Ins, Match, Subst};
        match *self {
            Match | Subst | Del => 1,
            Ins => 0,
        }
    }
}

/// The modes of alignment supported by the aligners.
///
/// The default alignment mode is Global.
#[derive(Default, Debug, PartialEq, Eq, Copy, Clone, Hash, Serialize, Deserialize)]
pub enum AlignmentMode {
    /// Aligns the full x versus the full y (Needleman-Wunsch).
    #[default]
    Global,
    /// Aligns a sub-sequence of x versus a sub-sequence of y (Smith-Waterman).
    Local,
}

impl Display for AlignmentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Local => write!(f, "local"),
        }
    }
}

impl FromStr for AlignmentMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "global" | "nw" | "needleman-wunsch" => Ok(AlignmentMode::Global),
            "local" | "sw" | "smith-waterman" => Ok(AlignmentMode::Local),
            _ => Err(anyhow!("Invalid alignment mode: {}", s)),
        }
    }
}
