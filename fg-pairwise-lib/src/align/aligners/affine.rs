use crate::align::{
    aligners::{
        constants::{AlignmentMode, MIN_SCORE},
        Recurrence, Terminal,
    },
    scoring::GapCosts,
    traceback::{Cell, State, TracebackCell, TB_DEL, TB_INS, TB_MATCH, TB_START},
    workspace::Workspace,
};

/// The score of a border cell reached by one gap of `k >= 1` columns.
#[inline(always)]
pub(crate) fn affine_border(open: f64, extend: f64, k: usize) -> f64 {
    -(open + (k - 1) as f64 * extend)
}

/// Three-plane recurrence with separate gap open and extend costs (Gotoh).
///
/// - `M[i][j] = s + max(M[i-1][j-1], Ix[i-1][j-1], Iy[i-1][j-1])`
/// - `Ix[i][j] = max(M[i-1][j] - open, Ix[i-1][j] - extend)` (gap in y, consumes x)
/// - `Iy[i][j] = max(M[i][j-1] - open, Iy[i][j-1] - extend)` (gap in x, consumes y)
///
/// Ties prefer the match plane, then `Ix`, then `Iy`.  In local mode the match plane is floored
/// at zero (the floor winning ties), gap planes are not, and a floored cell starts a fresh
/// alignment.  Each plane's traceback slot records the plane of the predecessor cell.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AffineGap {
    open: f64,
    extend: f64,
    mode: AlignmentMode,
}

impl AffineGap {
    pub fn new(open: f64, extend: f64, mode: AlignmentMode) -> Self {
        Self { open, extend, mode }
    }
}

impl Recurrence for AffineGap {
    fn planes(&self) -> usize {
        3
    }

    fn mode(&self) -> AlignmentMode {
        self.mode
    }

    fn gap_costs(&self) -> GapCosts {
        GapCosts::affine(self.open, self.extend)
    }

    fn init_borders(&self, workspace: &mut Workspace, m: usize, n: usize) {
        workspace.set_score(State::Match, 0, 0, 0.0);
        if self.mode == AlignmentMode::Local {
            for i in 1..=m {
                workspace.set_score(State::Match, i, 0, 0.0);
            }
            for j in 1..=n {
                workspace.set_score(State::Match, 0, j, 0.0);
            }
            return;
        }
        for i in 1..=m {
            workspace.set_score(State::Ins, i, 0, affine_border(self.open, self.extend, i));
            let tb = if i == 1 { TB_MATCH } else { TB_INS };
            workspace.traceback_mut().get_mut(i, 0).set(State::Ins, tb);
        }
        for j in 1..=n {
            workspace.set_score(State::Del, 0, j, affine_border(self.open, self.extend, j));
            let tb = if j == 1 { TB_MATCH } else { TB_DEL };
            workspace.traceback_mut().get_mut(0, j).set(State::Del, tb);
        }
    }

    #[inline]
    fn fill_cell(&self, workspace: &mut Workspace, i: usize, j: usize, substitution: f64) -> f64 {
        let mut cell = Cell::default();

        // Ix: open from M above, or extend Ix above
        let open = workspace.score(State::Match, i - 1, j) - self.open;
        let extend = workspace.score(State::Ins, i - 1, j) - self.extend;
        let ix = if extend > open {
            cell.set(State::Ins, TB_INS);
            extend
        } else {
            cell.set(State::Ins, TB_MATCH);
            open
        };

        // Iy: open from M to the left, or extend Iy to the left
        let open = workspace.score(State::Match, i, j - 1) - self.open;
        let extend = workspace.score(State::Del, i, j - 1) - self.extend;
        let iy = if extend > open {
            cell.set(State::Del, TB_DEL);
            extend
        } else {
            cell.set(State::Del, TB_MATCH);
            open
        };

        // M: the best plane on the diagonal, plus the substitution
        let mut previous = workspace.score(State::Match, i - 1, j - 1);
        let mut tb = TB_MATCH;
        let diag_ix = workspace.score(State::Ins, i - 1, j - 1);
        if diag_ix > previous {
            previous = diag_ix;
            tb = TB_INS;
        }
        let diag_iy = workspace.score(State::Del, i - 1, j - 1);
        if diag_iy > previous {
            previous = diag_iy;
            tb = TB_DEL;
        }
        let mut m = previous + substitution;
        if self.mode == AlignmentMode::Local && !(m > 0.0) {
            m = 0.0;
            tb = TB_START;
        }
        cell.set(State::Match, tb);

        workspace.set_score(State::Match, i, j, m);
        workspace.set_score(State::Ins, i, j, ix);
        workspace.set_score(State::Del, i, j, iy);
        workspace.traceback_mut().set(i, j, cell);
        m
    }

    fn global_terminal(&self, workspace: &Workspace, m: usize, n: usize) -> Terminal {
        let mut terminal = Terminal {
            i: m,
            j: n,
            state: State::Match,
            score: MIN_SCORE,
        };
        for state in [State::Match, State::Ins, State::Del] {
            let score = workspace.score(state, m, n);
            if score > terminal.score {
                terminal.score = score;
                terminal.state = state;
            }
        }
        terminal
    }
}
