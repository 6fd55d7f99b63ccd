use crate::align::{
    aligners::{constants::AlignmentMode, Recurrence, Terminal},
    scoring::GapCosts,
    traceback::{State, TracebackCell, TB_DEL, TB_INS, TB_MATCH, TB_START},
    workspace::Workspace,
};

/// The score of a border cell reached by `k` gap columns at `cost` each.
#[inline(always)]
pub(crate) fn linear_border(cost: f64, k: usize) -> f64 {
    -(k as f64 * cost)
}

/// Single-plane recurrence with a constant cost per gap column.
///
/// Global mode (Needleman-Wunsch):
/// `F[i][j] = max(F[i-1][j-1] + s, F[i-1][j] - cost, F[i][j-1] - cost)` with borders
/// `F[i][0] = -i * cost` and `F[0][j] = -j * cost`.
///
/// Local mode (Smith-Waterman) adds a zero floor, and zeroes the borders.  A cell that takes the
/// floor has no predecessor and starts a fresh alignment.
///
/// Ties go to the first candidate in the order floor, diagonal, up (insertion), left (deletion).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LinearGap {
    cost: f64,
    mode: AlignmentMode,
}

impl LinearGap {
    pub fn new(cost: f64, mode: AlignmentMode) -> Self {
        Self { cost, mode }
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }
}

impl Recurrence for LinearGap {
    fn planes(&self) -> usize {
        1
    }

    fn mode(&self) -> AlignmentMode {
        self.mode
    }

    fn gap_costs(&self) -> GapCosts {
        GapCosts::linear(self.cost)
    }

    fn init_borders(&self, workspace: &mut Workspace, m: usize, n: usize) {
        workspace.set_score(State::Match, 0, 0, 0.0);
        let local = self.mode == AlignmentMode::Local;
        for i in 1..=m {
            let score = if local { 0.0 } else { linear_border(self.cost, i) };
            workspace.set_score(State::Match, i, 0, score);
            if !local {
                workspace
                    .traceback_mut()
                    .get_mut(i, 0)
                    .set(State::Match, TB_INS);
            }
        }
        for j in 1..=n {
            let score = if local { 0.0 } else { linear_border(self.cost, j) };
            workspace.set_score(State::Match, 0, j, score);
            if !local {
                workspace
                    .traceback_mut()
                    .get_mut(0, j)
                    .set(State::Match, TB_DEL);
            }
        }
    }

    #[inline]
    fn fill_cell(&self, workspace: &mut Workspace, i: usize, j: usize, substitution: f64) -> f64 {
        let diag = workspace.score(State::Match, i - 1, j - 1) + substitution;
        let up = workspace.score(State::Match, i - 1, j) - self.cost;
        let left = workspace.score(State::Match, i, j - 1) - self.cost;

        let (mut score, mut tb) = match self.mode {
            AlignmentMode::Local => (0.0, TB_START),
            AlignmentMode::Global => (diag, TB_MATCH),
        };
        if diag > score {
            score = diag;
            tb = TB_MATCH;
        }
        if up > score {
            score = up;
            tb = TB_INS;
        }
        if left > score {
            score = left;
            tb = TB_DEL;
        }

        workspace.set_score(State::Match, i, j, score);
        workspace.traceback_mut().get_mut(i, j).set(State::Match, tb);
        score
    }

    fn global_terminal(&self, workspace: &Workspace, m: usize, n: usize) -> Terminal {
        Terminal {
            i: m,
            j: n,
            state: State::Match,
            score: workspace.score(State::Match, m, n),
        }
    }
}
