use std::{rc::Rc, sync::Arc};

use bio::alignment::pairwise::{MatchFunc, MatchParams};
use serde::{Deserialize, Serialize};

use crate::align::{
    aligners::constants::AlignmentOperation,
    error::{AlignError, Result},
    sequence::{SequenceView, Symbol},
};

/// Scores the substitution of one symbol for another.
///
/// Implementations must be symmetric (`score(a, b) == score(b, a)`) and defined for every pair
/// of symbols the caller intends to align.  Symbols outside the model's alphabet are reported
/// with [`AlignError::UnknownSymbol`], which the aligners propagate unchanged.
pub trait ScoreModel {
    fn score(&self, a: Symbol, b: Symbol) -> Result<f64>;
}

impl<M: ScoreModel + ?Sized> ScoreModel for &M {
    fn score(&self, a: Symbol, b: Symbol) -> Result<f64> {
        (**self).score(a, b)
    }
}

impl<M: ScoreModel + ?Sized> ScoreModel for Box<M> {
    fn score(&self, a: Symbol, b: Symbol) -> Result<f64> {
        (**self).score(a, b)
    }
}

impl<M: ScoreModel + ?Sized> ScoreModel for Rc<M> {
    fn score(&self, a: Symbol, b: Symbol) -> Result<f64> {
        (**self).score(a, b)
    }
}

impl<M: ScoreModel + ?Sized> ScoreModel for Arc<M> {
    fn score(&self, a: Symbol, b: Symbol) -> Result<f64> {
        (**self).score(a, b)
    }
}

/// Returns the substitution score for `a` and `b`, rejecting non-finite scores.
#[inline]
pub(crate) fn checked_score<M: ScoreModel + ?Sized>(model: &M, a: Symbol, b: Symbol) -> Result<f64> {
    let score = model.score(a, b)?;
    if score.is_finite() {
        Ok(score)
    } else {
        Err(AlignError::NonFiniteScore {
            a: char::from(a),
            b: char::from(b),
            score,
        })
    }
}

/// A fixed score for identical symbols and another for differing symbols.  Accepts any symbol.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchMismatch {
    pub match_score: f64,
    pub mismatch_score: f64,
}

impl MatchMismatch {
    pub fn new(match_score: f64, mismatch_score: f64) -> Self {
        Self {
            match_score,
            mismatch_score,
        }
    }
}

impl Default for MatchMismatch {
    fn default() -> Self {
        Self::new(1.0, -1.0)
    }
}

impl ScoreModel for MatchMismatch {
    #[inline]
    fn score(&self, a: Symbol, b: Symbol) -> Result<f64> {
        Ok(if a == b {
            self.match_score
        } else {
            self.mismatch_score
        })
    }
}

/// Integer match/mismatch scores from rust-bio.
impl ScoreModel for MatchParams {
    #[inline]
    fn score(&self, a: Symbol, b: Symbol) -> Result<f64> {
        Ok(f64::from(MatchFunc::score(self, a, b)))
    }
}

/// The amino-acid symbols covered by [`Blosum62`].
pub const BLOSUM62_ALPHABET: &[u8] = b"ARNDCQEGHILKMFPSTWYVBZX";

/// The BLOSUM62 table from rust-bio.  Lower-case residues are accepted; anything outside
/// [`BLOSUM62_ALPHABET`] is an alphabet error.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Blosum62;

impl ScoreModel for Blosum62 {
    fn score(&self, a: Symbol, b: Symbol) -> Result<f64> {
        let (upper_a, upper_b) = (a.to_ascii_uppercase(), b.to_ascii_uppercase());
        if !BLOSUM62_ALPHABET.contains(&upper_a) || !BLOSUM62_ALPHABET.contains(&upper_b) {
            return Err(AlignError::UnknownSymbol {
                a: char::from(a),
                b: char::from(b),
            });
        }
        Ok(f64::from(bio::scores::blosum62(upper_a, upper_b)))
    }
}

/// A symmetric substitution table over an explicit alphabet.
#[derive(Clone, Debug, PartialEq)]
pub struct SubstitutionMatrix {
    alphabet: Vec<Symbol>,
    /// Maps a symbol to its row/column in `scores`.
    index: Vec<Option<usize>>,
    scores: Vec<f64>,
}

impl SubstitutionMatrix {
    /// Builds a matrix from an alphabet and a square table whose rows and columns follow the
    /// alphabet order.  The table must be symmetric and finite, and the alphabet may not repeat
    /// symbols.
    pub fn new(alphabet: &[Symbol], table: &[Vec<f64>]) -> Result<Self> {
        let size = alphabet.len();
        if size == 0 {
            return Err(AlignError::InvalidScoreModel("empty alphabet".to_string()));
        }
        if table.len() != size || table.iter().any(|row| row.len() != size) {
            return Err(AlignError::InvalidScoreModel(format!(
                "expected a {size}x{size} table for alphabet '{}'",
                String::from_utf8_lossy(alphabet)
            )));
        }

        let mut index = vec![None; 256];
        for (offset, &symbol) in alphabet.iter().enumerate() {
            if index[symbol as usize].replace(offset).is_some() {
                return Err(AlignError::InvalidScoreModel(format!(
                    "symbol '{}' appears more than once in the alphabet",
                    char::from(symbol)
                )));
            }
        }

        for (i, row) in table.iter().enumerate() {
            for (j, &score) in row.iter().enumerate() {
                if !score.is_finite() {
                    return Err(AlignError::InvalidScoreModel(format!(
                        "non-finite score for '{}' and '{}'",
                        char::from(alphabet[i]),
                        char::from(alphabet[j])
                    )));
                }
                if score != table[j][i] {
                    return Err(AlignError::InvalidScoreModel(format!(
                        "table is not symmetric for '{}' and '{}'",
                        char::from(alphabet[i]),
                        char::from(alphabet[j])
                    )));
                }
            }
        }

        Ok(Self {
            alphabet: alphabet.to_vec(),
            index,
            scores: table.iter().flatten().copied().collect(),
        })
    }

    /// Builds a matrix that scores `match_score` on the diagonal and `mismatch_score` elsewhere.
    pub fn from_match_mismatch(
        alphabet: &[Symbol],
        match_score: f64,
        mismatch_score: f64,
    ) -> Result<Self> {
        let table = (0..alphabet.len())
            .map(|i| {
                (0..alphabet.len())
                    .map(|j| if i == j { match_score } else { mismatch_score })
                    .collect()
            })
            .collect::<Vec<Vec<f64>>>();
        Self::new(alphabet, &table)
    }

    /// Also accepts the opposite case of every alphabetic symbol, unless that symbol is itself
    /// part of the alphabet.
    #[must_use]
    pub fn case_insensitive(mut self) -> Self {
        for (offset, &symbol) in self.alphabet.iter().enumerate() {
            let other = if symbol.is_ascii_uppercase() {
                symbol.to_ascii_lowercase()
            } else {
                symbol.to_ascii_uppercase()
            };
            if self.index[other as usize].is_none() {
                self.index[other as usize] = Some(offset);
            }
        }
        self
    }

    pub fn alphabet(&self) -> &[Symbol] {
        &self.alphabet
    }
}

impl ScoreModel for SubstitutionMatrix {
    #[inline]
    fn score(&self, a: Symbol, b: Symbol) -> Result<f64> {
        match (self.index[a as usize], self.index[b as usize]) {
            (Some(i), Some(j)) => Ok(self.scores[i * self.alphabet.len() + j]),
            _ => Err(AlignError::UnknownSymbol {
                a: char::from(a),
                b: char::from(b),
            }),
        }
    }
}

/// The cost of gaps, as non-negative penalties subtracted from the alignment score.
///
/// With affine costs the first column of a gap costs `open` and every further contiguous column
/// costs `extend`, so a gap of length `k` costs `open + (k - 1) * extend`.  Affine costs with
/// `open == extend` are equivalent to linear costs.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GapCosts {
    Linear { cost: f64 },
    Affine { open: f64, extend: f64 },
}

impl Default for GapCosts {
    fn default() -> Self {
        GapCosts::Linear { cost: 1.0 }
    }
}

impl GapCosts {
    pub fn linear(cost: f64) -> Self {
        GapCosts::Linear { cost }
    }

    pub fn affine(open: f64, extend: f64) -> Self {
        GapCosts::Affine { open, extend }
    }

    /// Checks the costs are finite, non-negative, and (for affine costs) that extending a gap
    /// costs no more than opening one.
    pub fn validate(&self) -> Result<()> {
        match *self {
            GapCosts::Linear { cost } => {
                if !cost.is_finite() || cost < 0.0 {
                    return Err(AlignError::InvalidGapCosts(format!(
                        "gap cost must be finite and non-negative, found {cost}"
                    )));
                }
            }
            GapCosts::Affine { open, extend } => {
                if !open.is_finite() || open < 0.0 || !extend.is_finite() || extend < 0.0 {
                    return Err(AlignError::InvalidGapCosts(format!(
                        "gap open and extend costs must be finite and non-negative, found \
                         open={open} extend={extend}"
                    )));
                }
                if extend > open {
                    return Err(AlignError::InvalidGapCosts(format!(
                        "gap extend cost ({extend}) may not exceed the gap open cost ({open})"
                    )));
                }
            }
        }
        Ok(())
    }

    /// The cost of the first column of a gap.
    pub fn open(&self) -> f64 {
        match *self {
            GapCosts::Linear { cost } => cost,
            GapCosts::Affine { open, .. } => open,
        }
    }

    /// The cost of every column after the first in a contiguous gap.
    pub fn extend(&self) -> f64 {
        match *self {
            GapCosts::Linear { cost } => cost,
            GapCosts::Affine { extend, .. } => extend,
        }
    }

    /// The per-column cost if these costs are (or reduce to) linear costs.
    pub fn as_linear(&self) -> Option<f64> {
        match *self {
            GapCosts::Linear { cost } => Some(cost),
            GapCosts::Affine { open, extend } if open == extend => Some(open),
            GapCosts::Affine { .. } => None,
        }
    }

    /// The cost of a single gap of `len` contiguous columns.
    pub fn gap_cost(&self, len: usize) -> f64 {
        if len == 0 {
            0.0
        } else {
            self.open() + (len - 1) as f64 * self.extend()
        }
    }
}

/// Scores a path of alignment operations starting at `xstart`/`ystart`.
///
/// Runs of the same gap operation are charged as one gap; an insertion directly followed by a
/// deletion (or vice versa) opens a new gap.
pub fn score_operations<X, Y, M>(
    x: &X,
    y: &Y,
    xstart: usize,
    ystart: usize,
    operations: &[AlignmentOperation],
    model: &M,
    gap_costs: &GapCosts,
) -> Result<f64>
where
    X: SequenceView + ?Sized,
    Y: SequenceView + ?Sized,
    M: ScoreModel + ?Sized,
{
    let (mut i, mut j) = (xstart, ystart);
    let mut score = 0.0;
    let mut last_op: Option<AlignmentOperation> = None;
    for &op in operations {
        match op {
            AlignmentOperation::Match | AlignmentOperation::Subst => {
                score += checked_score(model, x.symbol_at(i), y.symbol_at(j))?;
            }
            AlignmentOperation::Ins | AlignmentOperation::Del => {
                score -= if last_op == Some(op) {
                    gap_costs.extend()
                } else {
                    gap_costs.open()
                };
            }
        }
        i += op.length_on_x();
        j += op.length_on_y();
        last_op = Some(op);
    }
    Ok(score)
}

#[cfg(test)]
pub mod tests {
    use bio::alignment::pairwise::MatchParams;
    use rstest::rstest;

    use crate::align::{
        aligners::constants::AlignmentOperation::{Del, Ins, Match, Subst},
        error::AlignError,
    };

    use super::{
        checked_score, score_operations, Blosum62, GapCosts, MatchMismatch, ScoreModel,
        SubstitutionMatrix,
    };

    struct Broken;

    impl ScoreModel for Broken {
        fn score(&self, _a: u8, _b: u8) -> crate::align::error::Result<f64> {
            Ok(f64::NAN)
        }
    }

    #[rstest]
    fn test_match_mismatch() {
        let model = MatchMismatch::new(2.0, -3.0);
        assert_eq!(model.score(b'A', b'A').unwrap(), 2.0);
        assert_eq!(model.score(b'A', b'C').unwrap(), -3.0);
        assert_eq!(model.score(b'C', b'A').unwrap(), -3.0);
    }

    #[rstest]
    fn test_bio_match_params() {
        let model = MatchParams::new(1, -4);
        assert_eq!(ScoreModel::score(&model, b'G', b'G').unwrap(), 1.0);
        assert_eq!(ScoreModel::score(&model, b'G', b'T').unwrap(), -4.0);
    }

    #[rstest]
    #[case(b'A', b'A', 4.0)]
    #[case(b'W', b'W', 11.0)]
    #[case(b'A', b'R', -1.0)]
    #[case(b'a', b'r', -1.0)]
    fn test_blosum62(#[case] a: u8, #[case] b: u8, #[case] expected: f64) {
        assert_eq!(Blosum62.score(a, b).unwrap(), expected);
        assert_eq!(Blosum62.score(b, a).unwrap(), expected);
    }

    #[rstest]
    fn test_blosum62_unknown_symbol() {
        let err = Blosum62.score(b'A', b'J').unwrap_err();
        assert_eq!(err, AlignError::UnknownSymbol { a: 'A', b: 'J' });
        assert!(err.is_alphabet());
    }

    #[rstest]
    fn test_substitution_matrix() {
        let matrix = SubstitutionMatrix::new(
            b"AB",
            &[vec![5.0, -1.5], vec![-1.5, 3.0]],
        )
        .unwrap();
        assert_eq!(matrix.score(b'A', b'A').unwrap(), 5.0);
        assert_eq!(matrix.score(b'A', b'B').unwrap(), -1.5);
        assert_eq!(matrix.score(b'B', b'B').unwrap(), 3.0);
        assert!(matrix.score(b'a', b'B').unwrap_err().is_alphabet());

        let matrix = matrix.case_insensitive();
        assert_eq!(matrix.score(b'a', b'B').unwrap(), -1.5);
        assert_eq!(matrix.alphabet(), b"AB");
    }

    #[rstest]
    fn test_substitution_matrix_from_match_mismatch() {
        let matrix = SubstitutionMatrix::from_match_mismatch(b"ACGT", 1.0, -2.0).unwrap();
        assert_eq!(matrix.score(b'T', b'T').unwrap(), 1.0);
        assert_eq!(matrix.score(b'T', b'G').unwrap(), -2.0);
        assert!(matrix.score(b'N', b'G').is_err());
    }

    #[rstest]
    #[case(b"AB".to_vec(), vec![vec![1.0, 0.0]])]
    #[case(b"AB".to_vec(), vec![vec![1.0, 0.0], vec![2.0, 1.0]])]
    #[case(b"AA".to_vec(), vec![vec![1.0, 0.0], vec![0.0, 1.0]])]
    #[case(b"AB".to_vec(), vec![vec![1.0, f64::NAN], vec![f64::NAN, 1.0]])]
    #[case(Vec::new(), Vec::new())]
    fn test_invalid_substitution_matrix(#[case] alphabet: Vec<u8>, #[case] table: Vec<Vec<f64>>) {
        let err = SubstitutionMatrix::new(&alphabet, &table).unwrap_err();
        assert!(err.is_configuration(), "{err}");
    }

    #[rstest]
    fn test_checked_score_rejects_nan() {
        let err = checked_score(&Broken, b'A', b'C').unwrap_err();
        assert!(matches!(err, AlignError::NonFiniteScore { a: 'A', b: 'C', .. }));
    }

    #[rstest]
    fn test_boxed_models() {
        let boxed: Box<dyn ScoreModel> = Box::new(MatchMismatch::default());
        assert_eq!(boxed.score(b'A', b'A').unwrap(), 1.0);
        let shared: std::sync::Arc<dyn ScoreModel + Send + Sync> = std::sync::Arc::new(Blosum62);
        assert_eq!(shared.score(b'A', b'A').unwrap(), 4.0);
    }

    #[rstest]
    #[case(GapCosts::linear(0.0))]
    #[case(GapCosts::linear(2.5))]
    #[case(GapCosts::affine(5.0, 1.0))]
    #[case(GapCosts::affine(3.0, 3.0))]
    fn test_valid_gap_costs(#[case] costs: GapCosts) {
        assert!(costs.validate().is_ok());
    }

    #[rstest]
    #[case(GapCosts::linear(-1.0))]
    #[case(GapCosts::linear(f64::INFINITY))]
    #[case(GapCosts::affine(1.0, 2.0))]
    #[case(GapCosts::affine(-2.0, -3.0))]
    #[case(GapCosts::affine(f64::NAN, 1.0))]
    fn test_invalid_gap_costs(#[case] costs: GapCosts) {
        let err = costs.validate().unwrap_err();
        assert!(err.is_configuration(), "{err}");
    }

    #[rstest]
    #[case(GapCosts::linear(2.0), 0, 0.0)]
    #[case(GapCosts::linear(2.0), 3, 6.0)]
    #[case(GapCosts::affine(5.0, 1.0), 1, 5.0)]
    #[case(GapCosts::affine(5.0, 1.0), 4, 8.0)]
    fn test_gap_cost(#[case] costs: GapCosts, #[case] len: usize, #[case] expected: f64) {
        assert_eq!(costs.gap_cost(len), expected);
    }

    #[rstest]
    fn test_as_linear() {
        assert_eq!(GapCosts::linear(2.0).as_linear(), Some(2.0));
        assert_eq!(GapCosts::affine(2.0, 2.0).as_linear(), Some(2.0));
        assert_eq!(GapCosts::affine(3.0, 2.0).as_linear(), None);
    }

    #[rstest]
    fn test_score_operations() {
        // x: AC--GT
        // y: A-TTGA
        let x = b"ACGT";
        let y = b"ATTGA";
        let ops = [Match, Ins, Del, Del, Match, Subst];
        let model = MatchMismatch::new(1.0, -1.0);
        let affine = GapCosts::affine(3.0, 1.0);
        // 1 - 3 - 3 - 1 + 1 - 1
        assert_eq!(
            score_operations(&x[..], &y[..], 0, 0, &ops, &model, &affine).unwrap(),
            -6.0
        );
        let linear = GapCosts::linear(2.0);
        // 1 - 2 - 2 - 2 + 1 - 1
        assert_eq!(
            score_operations(&x[..], &y[..], 0, 0, &ops, &model, &linear).unwrap(),
            -5.0
        );
    }
}
