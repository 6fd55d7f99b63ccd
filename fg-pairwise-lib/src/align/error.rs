use thiserror::Error;

/// Errors raised while configuring or running an alignment.
///
/// Cancellation is deliberately absent: a cancelled alignment is reported as
/// [`Outcome::Cancelled`](crate::align::progress::Outcome::Cancelled).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlignError {
    /// Gap costs that are negative, non-finite, or whose extension exceeds the open cost.
    #[error("invalid gap costs: {0}")]
    InvalidGapCosts(String),

    /// Both sequences were empty, so there is nothing to align.
    #[error("cannot align two empty sequences")]
    EmptySequences,

    /// A score model (e.g. a substitution matrix) could not be built from its inputs.
    #[error("invalid score model: {0}")]
    InvalidScoreModel(String),

    /// An option combination the aligners do not support.
    #[error("unsupported configuration: {0}")]
    Unsupported(String),

    /// Options could not be built.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// The score model does not define a score for the symbol pair.
    #[error("no score defined for symbols '{a}' and '{b}'")]
    UnknownSymbol { a: char, b: char },

    /// Text containing a non-ASCII character, which cannot be aligned byte by byte.
    #[error("non-ASCII text at byte {position}: only ASCII text can be aligned")]
    NonAsciiText { position: usize },

    /// The score model returned NaN or an infinite score.
    #[error("non-finite score {score} for symbols '{a}' and '{b}'")]
    NonFiniteScore { a: char, b: char, score: f64 },

    /// The traceback walked into a cell whose predecessor does not match the recurrence.
    #[error("traceback inconsistency at cell ({i}, {j}): {reason}")]
    Inconsistent { i: usize, j: usize, reason: String },

    /// Aligner methods were called out of order (e.g. traceback before compute).
    #[error("aligner used out of order: {0}")]
    Lifecycle(String),
}

impl AlignError {
    /// True for errors caused by invalid parameters or inputs, detected before any work is done.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AlignError::InvalidGapCosts(_)
                | AlignError::EmptySequences
                | AlignError::InvalidScoreModel(_)
                | AlignError::Unsupported(_)
                | AlignError::InvalidOptions(_)
        )
    }

    /// True for errors raised at the score model boundary.
    pub fn is_alphabet(&self) -> bool {
        matches!(
            self,
            AlignError::UnknownSymbol { .. }
                | AlignError::NonAsciiText { .. }
                | AlignError::NonFiniteScore { .. }
        )
    }

    /// True for errors that indicate a defect in the aligner itself.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AlignError::Inconsistent { .. } | AlignError::Lifecycle(_)
        )
    }

    pub(crate) fn inconsistent(i: usize, j: usize, reason: impl Into<String>) -> Self {
        AlignError::Inconsistent {
            i,
            j,
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = AlignError> = std::result::Result<T, E>;
