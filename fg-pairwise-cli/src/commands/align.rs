use super::{command::Command, scoring::ScoringArgs};
use anyhow::Result;
use clap::Parser;
use log::info;
use pairwise::{
    align::{Aligner, ScoreModel},
    util::version::built_info,
};

/// Aligns two sequences given on the command line and prints the optimal alignment.
///
/// The output is the score, the CIGAR (using `=`, `X`, `I` and `D`), the aligned ranges of x and
/// y (0-based, half-open), and the alignment itself with `|` between identical symbols and `.`
/// between substituted ones.  An insertion consumes a symbol of x, a deletion a symbol of y.
///
/// With `--score-only` only the optimal score is printed, computed in memory linear in the
/// shorter sequence.
#[derive(Parser, Debug, Clone)]
#[clap(version = built_info::VERSION.as_str(), term_width=0)]
pub struct Align {
    /// The first sequence (x).
    #[clap(long, short = 'x', allow_hyphen_values = true, display_order = 1)]
    x: String,

    /// The second sequence (y).
    #[clap(long, short = 'y', allow_hyphen_values = true, display_order = 2)]
    y: String,

    #[clap(flatten)]
    scoring: ScoringArgs,

    /// Print only the optimal score.
    #[clap(long, short = 's', default_value = "false", display_order = 20)]
    score_only: bool,
}

impl Align {
    /// The aligner for these options.  Score-only runs never fill a full DP matrix, so nothing is
    /// pre-allocated for one.
    fn aligner(&self) -> Result<Aligner<Box<dyn ScoreModel + Send + Sync>>> {
        let mut builder = self.scoring.builder()?;
        if self.score_only {
            builder.capacity(0);
        }
        Ok(builder.build_aligner(self.scoring.score_model())?)
    }

    /// Executes the align command
    pub fn execute(&self) -> Result<()> {
        info!(
            "Aligning sequences of length {} and {} ({} mode)",
            self.x.len(),
            self.y.len(),
            self.scoring.mode
        );
        let mut aligner = self.aligner()?;

        if self.score_only {
            println!("{}", aligner.score_only(&self.x, &self.y)?);
            return Ok(());
        }

        let alignment = aligner.align(&self.x, &self.y)?;
        println!("score\t{}", alignment.score);
        println!("cigar\t{}", alignment.cigar());
        println!("x\t{}-{}", alignment.xstart, alignment.xend);
        println!("y\t{}-{}", alignment.ystart, alignment.yend);
        println!("identity\t{:.4}", alignment.identity());
        println!("{alignment}");
        Ok(())
    }
}

impl Command for Align {
    fn execute(&self) -> anyhow::Result<()> {
        Align::execute(self)
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::Align;

    /// Check that the argument parser works
    #[test]
    fn test_parse() {
        Align::parse_from(["align", "-x", "GATTACA", "-y", "GCATGCU"]);
        Align::parse_from([
            "align", "-x", "ACGT", "-y", "AGT", "-m", "local", "-O", "3", "-E", "1", "-s",
        ]);
    }

    #[test]
    fn test_execute() {
        let align = Align::parse_from(["align", "-x", "GATTACA", "-y", "GCATGCU", "-l"]);
        align.execute().unwrap();
        let align = Align::parse_from(["align", "-x", "HEAGAWGHEE", "-y", "PAWHEAE", "-M", "blosum62"]);
        align.execute().unwrap();
    }

    #[test]
    fn test_score_only_long_versus_short() {
        let x = "ACGT".repeat(25_000);
        let align = Align::parse_from(["align", "-x", &x, "-y", "ACGTACGTAC", "-m", "local", "-s"]);
        align.execute().unwrap();

        let mut aligner = align.aligner().unwrap();
        assert_eq!(aligner.score_only(&align.x, &align.y).unwrap(), 10.0);
        assert_eq!(aligner.workspace().capacity(), 0);
        assert!(aligner.workspace().rolling_capacity() <= 11);
    }

    #[test]
    fn test_execute_both_empty_fails() {
        let align = Align::parse_from(["align", "-x", "", "-y", ""]);
        assert!(align.execute().is_err());
    }
}
