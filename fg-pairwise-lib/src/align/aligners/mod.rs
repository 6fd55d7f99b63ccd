pub mod affine;
pub mod constants;
pub mod linear;
pub mod space_reduced;

pub use affine::AffineGap;
pub use constants::AlignmentMode;
pub use linear::LinearGap;

use log::debug;

use crate::align::{
    alignment::Alignment,
    error::{AlignError, Result},
    progress::{completed, Outcome, ProgressListener},
    scoring::{checked_score, score_operations, GapCosts, ScoreModel},
    sequence::SequenceView,
    traceback::{trace, State},
    workspace::Workspace,
};

/// The cell-level strategy of a dynamic-programming aligner.
///
/// [`DpAligner`] owns the lifecycle and the row-major sweep; a recurrence only decides how the
/// matrix borders are initialized, how one interior cell is filled (including which predecessor
/// wins a tie) and where a global alignment terminates.
pub trait Recurrence {
    /// The number of score planes: 1 for a single matrix, 3 for match/insertion/deletion.
    fn planes(&self) -> usize;

    fn mode(&self) -> AlignmentMode;

    fn gap_costs(&self) -> GapCosts;

    /// Fails if the recurrence was configured with invalid parameters.
    fn validate(&self) -> Result<()> {
        self.gap_costs().validate()
    }

    /// Initializes row 0 and column 0 of every plane for an `m x n` problem.
    fn init_borders(&self, workspace: &mut Workspace, m: usize, n: usize);

    /// Fills cell `(i, j)` (with `i, j >= 1`) given the substitution score of `x[i-1]` and
    /// `y[j-1]`, recording its predecessors in the traceback.  Returns the score of the cell as
    /// the end of a local alignment.
    fn fill_cell(&self, workspace: &mut Workspace, i: usize, j: usize, substitution: f64) -> f64;

    /// The best-scoring plane of cell `(m, n)`.
    fn global_terminal(&self, workspace: &Workspace, m: usize, n: usize) -> Terminal;
}

/// The cell (and plane) where the optimal alignment ends.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Terminal {
    pub i: usize,
    pub j: usize,
    pub state: State,
    pub score: f64,
}

/// Full dynamic-programming aligner: keeps every score plane and the full traceback arena.
///
/// The lifecycle is `prepare` (size the workspace and fill the borders), `compute` (fill the
/// matrices row by row), then `score`/`terminal` and `traceback`.  [`DpAligner::align`] runs all
/// of them.  Calling a step before its predecessor is a lifecycle error.
pub struct DpAligner<'w, R: Recurrence> {
    recurrence: R,
    workspace: &'w mut Workspace,
    prepared: Option<(usize, usize)>,
    terminal: Option<Terminal>,
}

pub type LinearGapAligner<'w> = DpAligner<'w, LinearGap>;
pub type AffineGapAligner<'w> = DpAligner<'w, AffineGap>;

impl<'w, R: Recurrence> DpAligner<'w, R> {
    pub fn new(recurrence: R, workspace: &'w mut Workspace) -> Self {
        DpAligner {
            recurrence,
            workspace,
            prepared: None,
            terminal: None,
        }
    }

    pub fn recurrence(&self) -> &R {
        &self.recurrence
    }

    pub fn workspace(&self) -> &Workspace {
        &*self.workspace
    }

    /// Validates the configuration and sizes the workspace for x of length `m` and y of
    /// length `n`.
    pub fn prepare(&mut self, m: usize, n: usize) -> Result<()> {
        self.prepared = None;
        self.terminal = None;
        self.recurrence.validate()?;
        if m == 0 && n == 0 {
            return Err(AlignError::EmptySequences);
        }
        self.workspace.prepare(m, n, self.recurrence.planes());
        self.recurrence.init_borders(self.workspace, m, n);
        self.prepared = Some((m, n));
        Ok(())
    }

    /// Fills the matrices in row-major order, polling `progress` at the start of every row.
    pub fn compute<X, Y, M, L>(
        &mut self,
        x: &X,
        y: &Y,
        model: &M,
        progress: &mut L,
    ) -> Result<Outcome<()>>
    where
        X: SequenceView + ?Sized,
        Y: SequenceView + ?Sized,
        M: ScoreModel + ?Sized,
        L: ProgressListener + ?Sized,
    {
        let (m, n) = (x.len(), y.len());
        if self.prepared != Some((m, n)) {
            return Err(AlignError::Lifecycle(format!(
                "compute called for a {m}x{n} problem without a matching prepare"
            )));
        }
        x.check_symbols()?;
        y.check_symbols()?;
        self.terminal = None;

        let local = self.recurrence.mode() == AlignmentMode::Local;
        let mut best = Terminal {
            i: 0,
            j: 0,
            state: State::Match,
            score: 0.0,
        };
        for i in 1..=m {
            if progress.report((i - 1) as f64 / m as f64) {
                debug!("Alignment cancelled before row {} of {}", i, m);
                return Ok(Outcome::Cancelled);
            }
            let xi = x.symbol_at(i - 1);
            for j in 1..=n {
                let substitution = checked_score(model, xi, y.symbol_at(j - 1))?;
                let score = self
                    .recurrence
                    .fill_cell(self.workspace, i, j, substitution);
                if local && score > best.score {
                    best = Terminal {
                        i,
                        j,
                        state: State::Match,
                        score,
                    };
                }
            }
        }

        self.terminal = Some(if local {
            best
        } else {
            self.recurrence.global_terminal(self.workspace, m, n)
        });
        Ok(Outcome::Completed(()))
    }

    /// The optimal cell found by the last `compute`.
    pub fn terminal(&self) -> Result<Terminal> {
        self.terminal
            .ok_or_else(|| AlignError::Lifecycle("no completed compute to read from".to_string()))
    }

    /// The optimal alignment score found by the last `compute`.
    pub fn score(&self) -> Result<f64> {
        Ok(self.terminal()?.score)
    }

    /// Walks back from the terminal cell and rebuilds the alignment.  The path is re-scored
    /// against the matrices; a path that does not reproduce the optimal score is an internal
    /// inconsistency.
    pub fn traceback<X, Y, M>(&self, x: &X, y: &Y, model: &M) -> Result<Alignment>
    where
        X: SequenceView + ?Sized,
        Y: SequenceView + ?Sized,
        M: ScoreModel + ?Sized,
    {
        let terminal = self.terminal()?;
        let mode = self.recurrence.mode();
        let path = trace(
            self.workspace.traceback(),
            mode,
            terminal.i,
            terminal.j,
            terminal.state,
        )?;
        let alignment = Alignment::from_trace(x, y, terminal.score, &path, mode);

        let rescored = score_operations(
            x,
            y,
            alignment.xstart,
            alignment.ystart,
            &alignment.operations,
            model,
            &self.recurrence.gap_costs(),
        )?;
        let tolerance = 1e-9 * terminal.score.abs().max(1.0);
        if (rescored - terminal.score).abs() > tolerance {
            return Err(AlignError::inconsistent(
                terminal.i,
                terminal.j,
                format!(
                    "traceback path scores {rescored} but the matrix holds {}",
                    terminal.score
                ),
            ));
        }
        Ok(alignment)
    }

    /// Runs the whole lifecycle for one pair of sequences.
    pub fn align<X, Y, M, L>(
        &mut self,
        x: &X,
        y: &Y,
        model: &M,
        progress: &mut L,
    ) -> Result<Outcome<Alignment>>
    where
        X: SequenceView + ?Sized,
        Y: SequenceView + ?Sized,
        M: ScoreModel + ?Sized,
        L: ProgressListener + ?Sized,
    {
        self.prepare(x.len(), y.len())?;
        completed!(self.compute(x, y, model, progress)?);
        self.traceback(x, y, model).map(Outcome::Completed)
    }
}
