use serde::{Deserialize, Serialize};

use crate::align::{
    aligners::constants::AlignmentMode,
    error::{AlignError, Result},
};

pub mod cell;

/// The DP plane a cell belongs to, which is also the move that enters it:
///
/// - `Match`: `x[i-1]` aligned to `y[j-1]` (a diagonal move)
/// - `Ins`: `x[i-1]` aligned to a gap (a vertical move, consumes x only)
/// - `Del`: `y[j-1]` aligned to a gap (a horizontal move, consumes y only)
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub enum State {
    Match,
    Ins,
    Del,
}

impl State {
    /// The state encoded by a traceback value, or `None` for [`TB_START`].
    pub fn from_tb(tb: u8) -> Option<State> {
        match tb {
            TB_MATCH => Some(State::Match),
            TB_INS => Some(State::Ins),
            TB_DEL => Some(State::Del),
            _ => None,
        }
    }

    pub fn tb(self) -> u8 {
        match self {
            State::Match => TB_MATCH,
            State::Ins => TB_INS,
            State::Del => TB_DEL,
        }
    }
}

// Traceback moves.  In a single-plane matrix the value stored in the match slot is the move that
// entered the cell; in a three-plane matrix the value stored in a plane's slot is the plane of the
// predecessor cell.
pub const TB_START: u8 = 0b00; // No predecessor: the cell is an alignment origin
pub const TB_MATCH: u8 = 0b01; // Match or substitution (diagonal)
pub const TB_INS: u8 = 0b10; // Insertion (vertical)
pub const TB_DEL: u8 = 0b11; // Deletion (horizontal)
pub const TB_MAX: u8 = 0b11; // Useful in checking that the TB value we got is a valid one

pub trait TracebackCell: Copy + Default {
    fn set(&mut self, plane: State, tb: u8);
    fn get(self, plane: State) -> u8;

    /// Set all planes to the same value.
    fn set_all(&mut self, tb: u8) {
        self.set(State::Match, tb);
        self.set(State::Ins, tb);
        self.set(State::Del, tb);
    }
}

pub type Cell = cell::PackedCell;

/// Traceback matrix of `(m + 1) x (n + 1)` cells stored in one flat row-major arena.
///
/// The backing storage only ever grows: re-initializing for a smaller problem reuses the existing
/// allocation.
#[derive(Default, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct Traceback {
    rows: usize,
    cols: usize,
    planes: usize,
    matrix: Vec<Cell>,
}

impl Traceback {
    pub fn with_capacity(m: usize, n: usize) -> Self {
        let rows = m + 1;
        let cols = n + 1;
        Traceback {
            rows,
            cols,
            planes: 1,
            matrix: Vec::with_capacity(rows * cols),
        }
    }

    /// Sizes the matrix for `x` of length `m` and `y` of length `n`, with every cell set to start.
    pub fn init(&mut self, m: usize, n: usize, planes: usize) {
        debug_assert!(planes == 1 || planes == 3);
        self.matrix.clear();
        self.rows = m + 1;
        self.cols = n + 1;
        self.planes = planes;
        let mut start = Cell::default();
        start.set_all(TB_START);
        self.matrix.resize(self.rows * self.cols, start);
    }

    #[inline(always)]
    pub fn set(&mut self, i: usize, j: usize, v: Cell) {
        debug_assert!(i < self.rows);
        debug_assert!(j < self.cols);
        self.matrix[i * self.cols + j] = v;
    }

    #[inline(always)]
    pub fn get(&self, i: usize, j: usize) -> &Cell {
        debug_assert!(i < self.rows);
        debug_assert!(j < self.cols);
        &self.matrix[i * self.cols + j]
    }

    #[inline(always)]
    pub fn get_mut(&mut self, i: usize, j: usize) -> &mut Cell {
        debug_assert!(i < self.rows);
        debug_assert!(j < self.cols);
        &mut self.matrix[i * self.cols + j]
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn planes(&self) -> usize {
        self.planes
    }

    /// The number of cells that can be stored without reallocating.
    pub fn capacity(&self) -> usize {
        self.matrix.capacity()
    }
}

/// One move of a traceback walk: the state (move) that entered the cell the cursor left, and the
/// predecessor cell `(i, j)` the cursor moved to.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Step {
    pub state: State,
    pub i: usize,
    pub j: usize,
}

/// Walks the optimal path from a terminal cell back to an origin cell.
///
/// Each call to [`TracebackCursor::next_step`] moves to the predecessor of the current cell and
/// returns the move taken.  `Match` steps consume `x[i]` and `y[j]`, `Ins` steps consume `x[i]`
/// and `Del` steps consume `y[j]` (with `(i, j)` the coordinates after the step), so the moves
/// read in reverse order are the alignment.  The walk ends at `(0, 0)` in global mode and at a
/// cell with no predecessor in local mode.
pub struct TracebackCursor<'a> {
    traceback: &'a Traceback,
    mode: AlignmentMode,
    i: usize,
    j: usize,
    state: State,
    done: bool,
}

impl<'a> TracebackCursor<'a> {
    /// Starts a walk at cell `(i, j)`.  `state` is the plane of the terminal cell and is ignored
    /// for single-plane matrices.
    pub fn new(
        traceback: &'a Traceback,
        mode: AlignmentMode,
        i: usize,
        j: usize,
        state: State,
    ) -> Self {
        debug_assert!(i < traceback.rows());
        debug_assert!(j < traceback.cols());
        TracebackCursor {
            traceback,
            mode,
            i,
            j,
            state,
            done: false,
        }
    }

    /// The cell the cursor is currently on.
    pub fn position(&self) -> (usize, usize) {
        (self.i, self.j)
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Moves to the predecessor cell, or returns `None` once the current cell is an origin.
    pub fn next_step(&mut self) -> Result<Option<Step>> {
        if self.done {
            return Ok(None);
        }
        let (i, j) = (self.i, self.j);
        let cell = *self.traceback.get(i, j);

        let (state, next_state) = if self.traceback.planes() == 1 {
            match State::from_tb(cell.get(State::Match)) {
                None => return self.finish(),
                Some(state) => (state, state),
            }
        } else {
            match State::from_tb(cell.get(self.state)) {
                None => return self.finish(),
                Some(previous) => (self.state, previous),
            }
        };

        let predecessor = match state {
            State::Match => i.checked_sub(1).zip(j.checked_sub(1)),
            State::Ins => i.checked_sub(1).map(|i| (i, j)),
            State::Del => j.checked_sub(1).map(|j| (i, j)),
        };
        let (i, j) = predecessor.ok_or_else(|| {
            AlignError::inconsistent(i, j, format!("{state:?} move leaves the matrix"))
        })?;

        self.i = i;
        self.j = j;
        self.state = next_state;
        Ok(Some(Step { state, i, j }))
    }

    fn finish(&mut self) -> Result<Option<Step>> {
        self.done = true;
        if self.traceback.planes() == 3 && self.state != State::Match {
            return Err(AlignError::inconsistent(
                self.i,
                self.j,
                format!("{:?} plane cell has no predecessor", self.state),
            ));
        }
        if self.mode == AlignmentMode::Global && (self.i, self.j) != (0, 0) {
            return Err(AlignError::inconsistent(
                self.i,
                self.j,
                "global alignment traceback stopped before the origin",
            ));
        }
        Ok(None)
    }
}

impl Iterator for TracebackCursor<'_> {
    type Item = Result<Step>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_step() {
            Ok(Some(step)) => Some(Ok(step)),
            Ok(None) => None,
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

/// The result of a full traceback walk: the origin cell and the states along the path, in
/// forward (origin to terminal) order.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Trace {
    pub xstart: usize,
    pub ystart: usize,
    pub states: Vec<State>,
}

/// Walks the traceback from `(i, j)` in plane `state` to its origin.
pub fn trace(
    traceback: &Traceback,
    mode: AlignmentMode,
    i: usize,
    j: usize,
    state: State,
) -> Result<Trace> {
    let mut cursor = TracebackCursor::new(traceback, mode, i, j, state);
    let mut states = Vec::with_capacity(i + j);
    for step in cursor.by_ref() {
        states.push(step?.state);
    }
    states.reverse();
    let (xstart, ystart) = cursor.position();
    Ok(Trace {
        xstart,
        ystart,
        states,
    })
}
