//! Scores every pair in a set of sequences on a pool of worker threads.
//!
//! Each worker owns its own [`Aligner`] and so its own workspace, which only holds rolling rows;
//! the score model and the sequences are shared.  Pairs are handed out over a `flume` channel
//! and their scores collected on the calling thread, which also reports progress.  Cancelling stops workers from taking new
//! pairs and interrupts the alignments in flight at their next row.

use std::sync::atomic::{AtomicBool, Ordering};

use derive_getters::Getters;
use flume::unbounded;
use itertools::Itertools;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::align::{
    error::{AlignError, Result},
    progress::{Outcome, ProgressListener},
    scoring::ScoreModel,
    sequence::SequenceView,
    workspace::Workspace,
    Aligner, Options,
};

/// A symmetric matrix of pairwise alignment scores, self-alignments on the diagonal.
#[derive(Clone, Debug, PartialEq, Getters, Serialize, Deserialize)]
pub struct PairwiseScores {
    /// The number of sequences scored.
    size: usize,
    /// Row-major `size x size` scores.
    scores: Vec<f64>,
}

impl PairwiseScores {
    fn new(size: usize) -> Self {
        PairwiseScores {
            size,
            scores: vec![0.0; size * size],
        }
    }

    fn set(&mut self, i: usize, j: usize, score: f64) {
        self.scores[i * self.size + j] = score;
        self.scores[j * self.size + i] = score;
    }

    /// The score of aligning sequence `i` to sequence `j`.
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.scores[i * self.size + j]
    }

    /// The scores of sequence `i` against every sequence.
    pub fn row(&self, i: usize) -> &[f64] {
        &self.scores[i * self.size..(i + 1) * self.size]
    }
}

/// One scored pair, sent from a worker back to the collecting thread.
struct Scored {
    i: usize,
    j: usize,
    result: Result<Outcome<f64>>,
}

/// Aligns every pair `(i, j)` with `i <= j` and returns the optimal scores.
///
/// Uses `threads` workers (all CPUs when `None`).  Scores are computed in linear space, in the
/// mode and with the gap costs in `opts`.  A pair of two empty sequences scores zero.  The first
/// error from any pair stops the batch and is returned.
pub fn all_pairs<S, M, L>(
    sequences: &[S],
    model: &M,
    opts: &Options,
    threads: Option<usize>,
    progress: &mut L,
) -> Result<Outcome<PairwiseScores>>
where
    S: SequenceView + Sync,
    M: ScoreModel + Sync + ?Sized,
    L: ProgressListener + ?Sized,
{
    opts.validate()?;
    let threads = threads.unwrap_or_else(num_cpus::get).max(1);
    let pairs = (0..sequences.len())
        .tuple_combinations()
        .chain((0..sequences.len()).map(|i| (i, i)))
        .collect_vec();
    let total = pairs.len();
    info!(
        "Scoring {} pairs from {} sequences with {} threads",
        total,
        sequences.len(),
        threads
    );

    let (job_tx, job_rx) = unbounded::<(usize, usize)>();
    let (result_tx, result_rx) = unbounded::<Scored>();
    for pair in pairs {
        job_tx.send(pair).map_err(|e| {
            AlignError::Lifecycle(format!("batch job queue closed early: {e}"))
        })?;
    }
    drop(job_tx);

    let cancel = AtomicBool::new(false);
    let mut scores = PairwiseScores::new(sequences.len());
    let mut first_error: Option<AlignError> = None;

    std::thread::scope(|scope| {
        for _ in 0..threads {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let cancel = &cancel;
            let opts = *opts;
            scope.spawn(move || {
                let mut aligner = Aligner::with_valid_options(model, opts, Workspace::default());
                let mut listener = |_fraction: f64| cancel.load(Ordering::Relaxed);
                for (i, j) in job_rx.iter() {
                    if cancel.load(Ordering::Relaxed) {
                        break;
                    }
                    let (x, y) = (&sequences[i], &sequences[j]);
                    let result = if x.is_empty() && y.is_empty() {
                        Ok(Outcome::Completed(0.0))
                    } else {
                        aligner
                            .score_only_with_progress(x, y, &mut listener)
                            .map(|outcome| outcome.map(|scored| scored.score))
                    };
                    if result_tx.send(Scored { i, j, result }).is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        let mut done = 0usize;
        for Scored { i, j, result } in result_rx.iter() {
            match result {
                Ok(Outcome::Completed(score)) => scores.set(i, j, score),
                Ok(Outcome::Cancelled) => (),
                Err(e) => {
                    cancel.store(true, Ordering::Relaxed);
                    first_error.get_or_insert(e);
                }
            }
            done += 1;
            if !cancel.load(Ordering::Relaxed) && progress.report(done as f64 / total as f64) {
                debug!("Batch cancelled after {} of {} pairs", done, total);
                cancel.store(true, Ordering::Relaxed);
            }
        }
    });

    if let Some(e) = first_error {
        return Err(e);
    }
    if cancel.load(Ordering::Relaxed) {
        return Ok(Outcome::Cancelled);
    }
    info!("Scored {} pairs", total);
    Ok(Outcome::Completed(scores))
}
