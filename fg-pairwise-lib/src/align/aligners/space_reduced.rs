//! Alignment in memory linear in the sequence lengths.
//!
//! Two separate capabilities live here:
//!
//! - [`SpaceReducedAligner::score`]: the optimal score and end cell from a single rolling-row
//!   pass, in `O(min(m, n))` memory, for linear or affine gap costs.
//! - [`SpaceReducedAligner::align`]: the full alignment path via Hirschberg's divide and conquer,
//!   which re-runs forward and reverse score-only passes to find where the optimal path crosses
//!   the middle row, recursing until the sub-problems are small enough for a full DP.  Linear
//!   gap costs only.

use std::ops::Range;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::align::{
    aligners::{
        affine::affine_border,
        constants::{
            AlignmentMode,
            AlignmentOperation::{self, Del, Ins},
            DEFAULT_HIRSCHBERG_CUTOFF, MIN_SCORE,
        },
        linear::linear_border,
        LinearGap, LinearGapAligner,
    },
    alignment::Alignment,
    error::{AlignError, Result},
    progress::{completed, Outcome, ProgressListener, SubProgress},
    scoring::{checked_score, score_operations, GapCosts, ScoreModel},
    sequence::{Reversed, SequenceView, Window},
    workspace::Workspace,
};

/// The optimal score and the (exclusive) end of the optimal alignment on x and y.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoreOnly {
    pub score: f64,
    pub xend: usize,
    pub yend: usize,
}

/// What a linear rolling-row pass computes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Pass {
    /// Needleman-Wunsch; the row holds the last DP row when done.
    Global,
    /// Smith-Waterman; tracks the first maximal cell.
    Local,
    /// Global borders with no floor, tracking the first maximal interior cell: the best
    /// alignment that starts exactly at the origin.
    Anchored,
}

/// Spreads the progress of a sequence of passes over the parent listener's `[0, 1]` range.
struct Budget<'a, L: ProgressListener + ?Sized> {
    parent: &'a mut L,
    done: f64,
    total: f64,
}

impl<'a, L: ProgressListener + ?Sized> Budget<'a, L> {
    fn new(parent: &'a mut L, total: usize) -> Self {
        Self {
            parent,
            done: 0.0,
            total: total.max(1) as f64,
        }
    }

    /// The listener for the next pass, which will fill `cells` cells.
    fn pass(&mut self, cells: usize) -> SubProgress<'_, L> {
        let offset = self.done / self.total;
        self.done += cells as f64;
        SubProgress::new(&mut *self.parent, offset, cells as f64 / self.total)
    }
}

/// Runs one linear-gap pass over `row` (of length `y.len() + 1`), one DP row at a time.
fn linear_pass<X, Y, M, L>(
    row: &mut [f64],
    x: &X,
    y: &Y,
    model: &M,
    cost: f64,
    pass: Pass,
    progress: &mut L,
) -> Result<Outcome<ScoreOnly>>
where
    X: SequenceView + ?Sized,
    Y: SequenceView + ?Sized,
    M: ScoreModel + ?Sized,
    L: ProgressListener + ?Sized,
{
    let (m, n) = (x.len(), y.len());
    debug_assert_eq!(row.len(), n + 1);
    let local = pass == Pass::Local;

    row[0] = 0.0;
    for (j, cell) in row.iter_mut().enumerate().skip(1) {
        *cell = if local { 0.0 } else { linear_border(cost, j) };
    }

    let mut best = ScoreOnly {
        score: if pass == Pass::Anchored { MIN_SCORE } else { 0.0 },
        xend: 0,
        yend: 0,
    };
    for i in 1..=m {
        if progress.report((i - 1) as f64 / m as f64) {
            return Ok(Outcome::Cancelled);
        }
        let xi = x.symbol_at(i - 1);
        let mut diag = row[0];
        row[0] = if local { 0.0 } else { linear_border(cost, i) };
        for j in 1..=n {
            let substitution = diag + checked_score(model, xi, y.symbol_at(j - 1))?;
            let up = row[j] - cost;
            let left = row[j - 1] - cost;

            let mut score = if local { 0.0 } else { substitution };
            if substitution > score {
                score = substitution;
            }
            if up > score {
                score = up;
            }
            if left > score {
                score = left;
            }

            diag = row[j];
            row[j] = score;
            if pass != Pass::Global && score > best.score {
                best = ScoreOnly {
                    score,
                    xend: i,
                    yend: j,
                };
            }
        }
    }

    if pass == Pass::Global {
        best = ScoreOnly {
            score: row[n],
            xend: m,
            yend: n,
        };
    }
    Ok(Outcome::Completed(best))
}

/// Runs one affine-gap (Gotoh) pass over three rows (match, insertion, deletion) laid out back
/// to back in `rows`, each of length `y.len() + 1`.
fn affine_pass<X, Y, M, L>(
    rows: &mut [f64],
    x: &X,
    y: &Y,
    model: &M,
    open: f64,
    extend: f64,
    mode: AlignmentMode,
    progress: &mut L,
) -> Result<Outcome<ScoreOnly>>
where
    X: SequenceView + ?Sized,
    Y: SequenceView + ?Sized,
    M: ScoreModel + ?Sized,
    L: ProgressListener + ?Sized,
{
    let (m, n) = (x.len(), y.len());
    let (m_row, rest) = rows.split_at_mut(n + 1);
    let (ix_row, iy_row) = rest.split_at_mut(n + 1);
    debug_assert_eq!(iy_row.len(), n + 1);
    let local = mode == AlignmentMode::Local;

    m_row[0] = 0.0;
    ix_row[0] = MIN_SCORE;
    iy_row[0] = MIN_SCORE;
    for j in 1..=n {
        m_row[j] = if local { 0.0 } else { MIN_SCORE };
        ix_row[j] = MIN_SCORE;
        iy_row[j] = if local {
            MIN_SCORE
        } else {
            affine_border(open, extend, j)
        };
    }

    let mut best = ScoreOnly {
        score: 0.0,
        xend: 0,
        yend: 0,
    };
    for i in 1..=m {
        if progress.report((i - 1) as f64 / m as f64) {
            return Ok(Outcome::Cancelled);
        }
        let xi = x.symbol_at(i - 1);
        let (mut diag_m, mut diag_ix, mut diag_iy) = (m_row[0], ix_row[0], iy_row[0]);
        m_row[0] = if local { 0.0 } else { MIN_SCORE };
        ix_row[0] = if local {
            MIN_SCORE
        } else {
            affine_border(open, extend, i)
        };
        iy_row[0] = MIN_SCORE;
        for j in 1..=n {
            let ix = (m_row[j] - open).max_first(ix_row[j] - extend);
            let iy = (m_row[j - 1] - open).max_first(iy_row[j - 1] - extend);
            let mut score = diag_m.max_first(diag_ix).max_first(diag_iy)
                + checked_score(model, xi, y.symbol_at(j - 1))?;
            if local && !(score > 0.0) {
                score = 0.0;
            }

            diag_m = m_row[j];
            diag_ix = ix_row[j];
            diag_iy = iy_row[j];
            m_row[j] = score;
            ix_row[j] = ix;
            iy_row[j] = iy;
            if local && score > best.score {
                best = ScoreOnly {
                    score,
                    xend: i,
                    yend: j,
                };
            }
        }
    }

    if !local {
        best = ScoreOnly {
            score: m_row[n].max_first(ix_row[n]).max_first(iy_row[n]),
            xend: m,
            yend: n,
        };
    }
    Ok(Outcome::Completed(best))
}

/// `max` that keeps the receiver on ties.
trait MaxFirst {
    fn max_first(self, other: Self) -> Self;
}

impl MaxFirst for f64 {
    #[inline(always)]
    fn max_first(self, other: f64) -> f64 {
        if other > self {
            other
        } else {
            self
        }
    }
}

/// Aligner that never holds a full `(m + 1) x (n + 1)` score matrix.
pub struct SpaceReducedAligner<'w> {
    gap_costs: GapCosts,
    mode: AlignmentMode,
    cutoff: usize,
    workspace: &'w mut Workspace,
}

impl<'w> SpaceReducedAligner<'w> {
    pub fn new(gap_costs: GapCosts, mode: AlignmentMode, workspace: &'w mut Workspace) -> Self {
        Self {
            gap_costs,
            mode,
            cutoff: DEFAULT_HIRSCHBERG_CUTOFF,
            workspace,
        }
    }

    /// Sets the number of DP cells at or below which a sub-problem is solved with a full DP.
    #[must_use]
    pub fn cutoff(mut self, cutoff: usize) -> Self {
        self.cutoff = cutoff;
        self
    }

    fn validate<X, Y>(&self, x: &X, y: &Y) -> Result<()>
    where
        X: SequenceView + ?Sized,
        Y: SequenceView + ?Sized,
    {
        self.gap_costs.validate()?;
        if x.is_empty() && y.is_empty() {
            return Err(AlignError::EmptySequences);
        }
        x.check_symbols()?;
        y.check_symbols()
    }

    /// The optimal score, and where the optimal alignment ends, using rolling rows over the
    /// shorter sequence.  For local alignments with several optimal end cells, the end reported
    /// may differ from the full aligner's when y is longer than x.
    pub fn score<X, Y, M, L>(
        &mut self,
        x: &X,
        y: &Y,
        model: &M,
        progress: &mut L,
    ) -> Result<Outcome<ScoreOnly>>
    where
        X: SequenceView + ?Sized,
        Y: SequenceView + ?Sized,
        M: ScoreModel + ?Sized,
        L: ProgressListener + ?Sized,
    {
        self.validate(x, y)?;
        if y.len() > x.len() {
            let flipped = completed!(self.score_rows(y, x, model, progress)?);
            return Ok(Outcome::Completed(ScoreOnly {
                score: flipped.score,
                xend: flipped.yend,
                yend: flipped.xend,
            }));
        }
        self.score_rows(x, y, model, progress)
    }

    fn score_rows<X, Y, M, L>(
        &mut self,
        x: &X,
        y: &Y,
        model: &M,
        progress: &mut L,
    ) -> Result<Outcome<ScoreOnly>>
    where
        X: SequenceView + ?Sized,
        Y: SequenceView + ?Sized,
        M: ScoreModel + ?Sized,
        L: ProgressListener + ?Sized,
    {
        let n = y.len();
        let mode = self.mode;
        match self.gap_costs.as_linear() {
            Some(cost) => {
                let pass = match mode {
                    AlignmentMode::Global => Pass::Global,
                    AlignmentMode::Local => Pass::Local,
                };
                let row = self.workspace.rolling_rows(1, n + 1);
                linear_pass(row, x, y, model, cost, pass, progress)
            }
            None => {
                let (open, extend) = (self.gap_costs.open(), self.gap_costs.extend());
                let rows = self.workspace.rolling_rows(3, n + 1);
                affine_pass(rows, x, y, model, open, extend, mode, progress)
            }
        }
    }

    /// The optimal alignment, reconstructed with Hirschberg's algorithm.
    ///
    /// Affine costs are accepted only when they reduce to linear costs (`open == extend`).  When
    /// several alignments are optimal the one returned may differ from the full aligner's, but
    /// its score is the same.
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
        self.validate(x, y)?;
        let (m, n) = (x.len(), y.len());
        let cost = self.gap_costs.as_linear().ok_or_else(|| {
            AlignError::Unsupported(format!(
                "linear-space alignment requires linear gap costs, found {:?}",
                self.gap_costs
            ))
        })?;

        // The forward and reverse passes of every level of the recursion fill about 2mn cells;
        // local alignments first run two passes to find the ends.
        let mut budget = match self.mode {
            AlignmentMode::Global => Budget::new(progress, 2 * m * n),
            AlignmentMode::Local => Budget::new(progress, 4 * m * n),
        };
        let (xs, ys) = match self.mode {
            AlignmentMode::Global => (0..m, 0..n),
            AlignmentMode::Local => {
                let row = self.workspace.rolling_rows(1, n + 1);
                let end = completed!(linear_pass(
                    row,
                    x,
                    y,
                    model,
                    cost,
                    Pass::Local,
                    &mut budget.pass(m * n)
                )?);
                if end.score <= 0.0 {
                    let empty = Alignment::from_operations(
                        x,
                        y,
                        0.0,
                        0,
                        0,
                        Vec::new(),
                        AlignmentMode::Local,
                    );
                    return Ok(Outcome::Completed(empty));
                }

                let row = self.workspace.rolling_rows(1, end.yend + 1);
                let start = completed!(linear_pass(
                    row,
                    &Reversed(Window::new(x, 0..end.xend)),
                    &Reversed(Window::new(y, 0..end.yend)),
                    model,
                    cost,
                    Pass::Anchored,
                    &mut budget.pass(end.xend * end.yend)
                )?);
                (
                    end.xend - start.xend..end.xend,
                    end.yend - start.yend..end.yend,
                )
            }
        };

        let (xstart, ystart) = (xs.start, ys.start);
        let mut operations = Vec::with_capacity(xs.len() + ys.len());
        completed!(self.hirschberg(x, y, model, cost, xs, ys, &mut operations, &mut budget)?);

        let score = score_operations(
            x,
            y,
            xstart,
            ystart,
            &operations,
            model,
            &self.gap_costs,
        )?;
        Ok(Outcome::Completed(Alignment::from_operations(
            x, y, score, xstart, ystart, operations, self.mode,
        )))
    }

    /// Appends the operations of an optimal global alignment of `x[xs]` and `y[ys]`.
    fn hirschberg<X, Y, M, L>(
        &mut self,
        x: &X,
        y: &Y,
        model: &M,
        cost: f64,
        xs: Range<usize>,
        ys: Range<usize>,
        operations: &mut Vec<AlignmentOperation>,
        budget: &mut Budget<'_, L>,
    ) -> Result<Outcome<()>>
    where
        X: SequenceView + ?Sized,
        Y: SequenceView + ?Sized,
        M: ScoreModel + ?Sized,
        L: ProgressListener + ?Sized,
    {
        let (m, n) = (xs.len(), ys.len());
        if m == 0 || n == 0 {
            operations.extend(std::iter::repeat(Del).take(n));
            operations.extend(std::iter::repeat(Ins).take(m));
            return Ok(Outcome::Completed(()));
        }

        let x_window = Window::new(x, xs.clone());
        let y_window = Window::new(y, ys.clone());
        if m == 1 || (m + 1) * (n + 1) <= self.cutoff {
            debug!(
                "Solving {}x{} sub-problem at x={} y={} with a full DP",
                m, n, xs.start, ys.start
            );
            let mut aligner = LinearGapAligner::new(
                LinearGap::new(cost, AlignmentMode::Global),
                &mut *self.workspace,
            );
            let alignment = completed!(aligner.align(
                &x_window,
                &y_window,
                model,
                &mut budget.pass(m * n)
            )?);
            operations.extend(alignment.operations);
            return Ok(Outcome::Completed(()));
        }

        // Best score of x[xs.start..mid] against every prefix of y[ys], and of x[mid..xs.end]
        // against every suffix of y[ys].
        let mid = xs.start + m / 2;
        let rows = self.workspace.rolling_rows(2, n + 1);
        let (forward, reverse) = rows.split_at_mut(n + 1);
        completed!(linear_pass(
            forward,
            &Window::new(x, xs.start..mid),
            &y_window,
            model,
            cost,
            Pass::Global,
            &mut budget.pass((mid - xs.start) * n)
        )?);
        completed!(linear_pass(
            reverse,
            &Reversed(Window::new(x, mid..xs.end)),
            &Reversed(y_window),
            model,
            cost,
            Pass::Global,
            &mut budget.pass((xs.end - mid) * n)
        )?);

        let mut split = 0;
        let mut best = forward[0] + reverse[n];
        for k in 1..=n {
            let score = forward[k] + reverse[n - k];
            if score > best {
                best = score;
                split = k;
            }
        }

        let y_split = ys.start + split;
        completed!(self.hirschberg(
            x,
            y,
            model,
            cost,
            xs.start..mid,
            ys.start..y_split,
            operations,
            budget
        )?);
        self.hirschberg(
            x,
            y,
            model,
            cost,
            mid..xs.end,
            y_split..ys.end,
            operations,
            budget,
        )
    }
}
