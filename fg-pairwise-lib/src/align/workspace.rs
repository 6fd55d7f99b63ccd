use log::debug;

use crate::align::{
    aligners::constants::{DEFAULT_ALIGNER_CAPACITY, MIN_SCORE},
    traceback::{State, Traceback},
};

/// Index of a state's score plane.
#[inline(always)]
const fn plane(state: State) -> usize {
    match state {
        State::Match => 0,
        State::Ins => 1,
        State::Del => 2,
    }
}

/// Scratch matrices for one alignment at a time.
///
/// A workspace holds the DP score planes, the traceback arena and the rolling rows used by the
/// space-reduced passes.  It is owned by the caller and lent mutably to one aligner per call, so
/// a workspace can never be shared by two alignments running at once.  Every buffer only ever
/// grows: aligning a same-size or smaller problem reuses the existing allocations.
#[derive(Debug, Default, Clone)]
pub struct Workspace {
    rows: usize,
    cols: usize,
    planes: usize,
    scores: Vec<f64>,
    traceback: Traceback,
    rolling: Vec<f64>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_ALIGNER_CAPACITY, DEFAULT_ALIGNER_CAPACITY)
    }

    /// Pre-allocates single-plane matrices for sequences of length `m` and `n`.
    pub fn with_capacity(m: usize, n: usize) -> Self {
        Workspace {
            rows: 0,
            cols: 0,
            planes: 0,
            scores: Vec::with_capacity((m + 1) * (n + 1)),
            traceback: Traceback::with_capacity(m, n),
            rolling: Vec::with_capacity(n + 1),
        }
    }

    /// Sizes the score planes and traceback for x of length `m` and y of length `n`.  Scores
    /// start at [`MIN_SCORE`] and traceback cells have no predecessor.
    pub fn prepare(&mut self, m: usize, n: usize, planes: usize) {
        let cells = planes * (m + 1) * (n + 1);
        if cells > self.scores.capacity() {
            debug!(
                "Growing workspace from {} to {} score cells for a {}x{} problem",
                self.scores.capacity(),
                cells,
                m,
                n
            );
        }
        self.rows = m + 1;
        self.cols = n + 1;
        self.planes = planes;
        self.scores.clear();
        self.scores.resize(cells, MIN_SCORE);
        self.traceback.init(m, n, planes);
    }

    /// Returns `count` rolling rows of `len` values each, laid out back to back.
    pub fn rolling_rows(&mut self, count: usize, len: usize) -> &mut [f64] {
        if count * len > self.rolling.capacity() {
            debug!(
                "Growing rolling rows from {} to {} cells",
                self.rolling.capacity(),
                count * len
            );
        }
        self.rolling.clear();
        self.rolling.resize(count * len, MIN_SCORE);
        &mut self.rolling
    }

    #[inline(always)]
    fn index(&self, state: State, i: usize, j: usize) -> usize {
        debug_assert!(plane(state) < self.planes);
        debug_assert!(i < self.rows);
        debug_assert!(j < self.cols);
        (plane(state) * self.rows + i) * self.cols + j
    }

    #[inline(always)]
    pub fn score(&self, state: State, i: usize, j: usize) -> f64 {
        self.scores[self.index(state, i, j)]
    }

    #[inline(always)]
    pub fn set_score(&mut self, state: State, i: usize, j: usize, score: f64) {
        let index = self.index(state, i, j);
        self.scores[index] = score;
    }

    pub fn traceback(&self) -> &Traceback {
        &self.traceback
    }

    pub fn traceback_mut(&mut self) -> &mut Traceback {
        &mut self.traceback
    }

    /// The `(rows, cols, planes)` the workspace was last prepared for.
    pub fn dims(&self) -> (usize, usize, usize) {
        (self.rows, self.cols, self.planes)
    }

    /// The number of score cells that fit without reallocating.
    pub fn capacity(&self) -> usize {
        self.scores.capacity()
    }

    /// The number of rolling-row cells that fit without reallocating.
    pub fn rolling_capacity(&self) -> usize {
        self.rolling.capacity()
    }
}
