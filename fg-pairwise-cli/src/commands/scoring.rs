use anyhow::{anyhow, bail, Error, Result};
use clap::{
    builder::{PossibleValuesParser, TypedValueParser as _},
    Args,
};
use pairwise::align::{
    AlignmentMode, Blosum62, Builder, GapCosts, MatchMismatch, Options, ScoreModel,
};
use std::{fmt::Display, str::FromStr};

use super::command::ValueEnum;

/// The substitution scores to align with.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Matrix {
    /// `--match-score` for identical symbols, `--mismatch-score` otherwise.
    MatchMismatch,
    /// The BLOSUM62 amino-acid table.
    Blosum62,
}

impl Display for Matrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MatchMismatch => write!(f, "match-mismatch"),
            Self::Blosum62 => write!(f, "blosum62"),
        }
    }
}

impl FromStr for Matrix {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "match-mismatch" => Ok(Matrix::MatchMismatch),
            "blosum62" => Ok(Matrix::Blosum62),
            _ => Err(anyhow!("Invalid substitution matrix: {}", s)),
        }
    }
}

impl ValueEnum for Matrix {
    fn variants<'a>() -> &'a [Self] {
        &[Self::MatchMismatch, Self::Blosum62]
    }
}

/// Scoring and alignment options shared by the commands.
#[derive(Args, Debug, Clone)]
pub struct ScoringArgs {
    /// The alignment mode:
    /// - Global: aligns the full x versus the full y.
    /// - Local: aligns a sub-sequence of x versus a sub-sequence of y.
    #[clap(
        long,
        short = 'm',
        value_parser = PossibleValuesParser::new(AlignmentMode::possible_values())
            .map(|s| s.parse::<AlignmentMode>().unwrap()),
        default_value_t = AlignmentMode::Global,
        ignore_case = true,
        display_order = 10,
        verbatim_doc_comment
    )]
    pub mode: AlignmentMode,

    /// The substitution scores to use.
    #[clap(
        long,
        short = 'M',
        value_parser = PossibleValuesParser::new(Matrix::possible_values())
            .map(|s| s.parse::<Matrix>().unwrap()),
        default_value_t = Matrix::MatchMismatch,
        ignore_case = true,
        display_order = 11
    )]
    pub matrix: Matrix,

    /// Score for a match, with `--matrix match-mismatch`.
    #[clap(long, short = 'A', default_value = "1", display_order = 12)]
    pub match_score: f64,

    /// Score for a mismatch, with `--matrix match-mismatch`.
    #[clap(
        long,
        short = 'B',
        default_value = "-1",
        allow_hyphen_values = true,
        display_order = 13
    )]
    pub mismatch_score: f64,

    /// Cost of every gap column (linear gaps).  Used when neither `--gap-open` nor
    /// `--gap-extend` is given.
    #[clap(
        long,
        short = 'g',
        default_value = "1",
        conflicts_with_all = ["gap_open", "gap_extend"],
        display_order = 14
    )]
    pub gap_cost: f64,

    /// Cost of the first column of a gap (affine gaps); a gap of length k costs
    /// '{O} + {E}*(k-1)'.
    #[clap(long, short = 'O', requires = "gap_extend", display_order = 15)]
    pub gap_open: Option<f64>,

    /// Cost of every further column of a gap (affine gaps).
    #[clap(long, short = 'E', requires = "gap_open", display_order = 16)]
    pub gap_extend: Option<f64>,

    /// Reconstruct alignments in memory linear in the sequence lengths (linear gaps only).
    #[clap(long, short = 'l', default_value = "false", display_order = 17)]
    pub linear_space: bool,
}

impl ScoringArgs {
    pub fn gap_costs(&self) -> Result<GapCosts> {
        let costs = match (self.gap_open, self.gap_extend) {
            (Some(open), Some(extend)) => GapCosts::affine(open, extend),
            (None, None) => GapCosts::linear(self.gap_cost),
            _ => bail!("--gap-open and --gap-extend must be given together"),
        };
        costs.validate()?;
        Ok(costs)
    }

    pub fn score_model(&self) -> Box<dyn ScoreModel + Send + Sync> {
        match self.matrix {
            Matrix::MatchMismatch => {
                Box::new(MatchMismatch::new(self.match_score, self.mismatch_score))
            }
            Matrix::Blosum62 => Box::new(Blosum62),
        }
    }

    /// The aligner builder for these options.
    pub fn builder(&self) -> Result<Builder> {
        let mut builder = Builder::default();
        builder
            .mode(self.mode)
            .gap_costs(self.gap_costs()?)
            .linear_space(self.linear_space);
        Ok(builder)
    }

    pub fn options(&self) -> Result<Options> {
        let opts = self.builder()?.build_options()?;
        opts.validate()?;
        Ok(opts)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use pairwise::align::{AlignmentMode, GapCosts};

    use super::{Matrix, ScoringArgs};

    #[derive(Parser, Debug)]
    struct Wrapper {
        #[clap(flatten)]
        scoring: ScoringArgs,
    }

    #[test]
    fn test_defaults() {
        let args = Wrapper::parse_from(["test"]).scoring;
        assert_eq!(args.mode, AlignmentMode::Global);
        assert_eq!(args.matrix, Matrix::MatchMismatch);
        assert_eq!(args.gap_costs().unwrap(), GapCosts::linear(1.0));
    }

    #[test]
    fn test_affine_and_local() {
        let args = Wrapper::parse_from(["test", "-m", "LOCAL", "-O", "3", "-E", "0.5", "-B", "-2"])
            .scoring;
        assert_eq!(args.mode, AlignmentMode::Local);
        assert_eq!(args.mismatch_score, -2.0);
        assert_eq!(args.gap_costs().unwrap(), GapCosts::affine(3.0, 0.5));
    }

    #[test]
    fn test_gap_open_requires_extend() {
        assert!(Wrapper::try_parse_from(["test", "--gap-open", "3"]).is_err());
    }

    #[test]
    fn test_linear_space_with_affine_gaps_is_rejected() {
        let args = Wrapper::parse_from(["test", "-O", "3", "-E", "1", "--linear-space"]).scoring;
        assert!(args.options().is_err());
    }

    #[test]
    fn test_invalid_gap_costs() {
        let args = Wrapper::parse_from(["test", "-O", "1", "-E", "2"]).scoring;
        assert!(args.gap_costs().is_err());
    }
}
