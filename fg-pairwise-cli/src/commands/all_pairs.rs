use super::{command::Command, scoring::ScoringArgs};
use anyhow::{bail, ensure, Result};
use clap::Parser;
use itertools::Itertools;
use log::info;
use pairwise::{
    align::{batch::all_pairs, Outcome},
    util::version::built_info,
};
use proglog::{CountFormatterKind, ProgLogBuilder};

/// Scores every pair of the given sequences and prints a tab-separated score matrix.
///
/// Row and column `i` of the matrix belong to the i-th sequence (named `seq{i}`, starting at 1);
/// the diagonal holds each sequence aligned to itself.  Scores are computed in memory linear in
/// the shorter sequence of each pair, on `--threads` worker threads.
#[derive(Parser, Debug, Clone)]
#[clap(version = built_info::VERSION.as_str(), term_width=0)]
pub struct AllPairs {
    /// The sequences to score.
    #[clap(required = true, num_args = 1.., display_order = 1)]
    sequences: Vec<String>,

    #[clap(flatten)]
    scoring: ScoringArgs,

    /// The number of threads to use (defaults to the number of CPUs).
    #[clap(long, short = 't', display_order = 20)]
    threads: Option<usize>,
}

impl AllPairs {
    /// Executes the all-pairs command
    pub fn execute(&self) -> Result<()> {
        ensure!(self.threads != Some(0), "--threads must be at least 1");
        let opts = self.scoring.options()?;
        let model = self.scoring.score_model();
        let n = self.sequences.len();
        info!("Scoring all pairs of {} sequences ({} mode)", n, opts.mode());

        let progress_logger = ProgLogBuilder::new()
            .name("pairwise-progress")
            .noun("pairs")
            .verb("Scored")
            .unit(1000)
            .count_formatter(CountFormatterKind::Comma)
            .build();
        let total = n * (n + 1) / 2;
        let mut recorded = 0usize;
        let mut listener = |fraction: f64| {
            let done = (fraction * total as f64).round() as usize;
            while recorded < done {
                progress_logger.record();
                recorded += 1;
            }
            false
        };

        let outcome = all_pairs(
            self.sequences.as_slice(),
            &model,
            &opts,
            self.threads,
            &mut listener,
        )?;
        let scores = match outcome {
            Outcome::Completed(scores) => scores,
            Outcome::Cancelled => bail!("Scoring was cancelled"),
        };

        let names = (1..=n).map(|i| format!("seq{i}")).collect_vec();
        println!("\t{}", names.iter().join("\t"));
        for (i, name) in names.iter().enumerate() {
            println!("{name}\t{}", scores.row(i).iter().join("\t"));
        }
        Ok(())
    }
}

impl Command for AllPairs {
    fn execute(&self) -> anyhow::Result<()> {
        AllPairs::execute(self)
    }
}
