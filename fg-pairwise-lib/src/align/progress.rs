/// Receives the fraction of work done during a long-running alignment.
///
/// Aligners poll the listener at the start of every DP row.  Returning `true` requests
/// cancellation: the aligner stops filling and returns [`Outcome::Cancelled`].
pub trait ProgressListener {
    fn report(&mut self, fraction: f64) -> bool;
}

impl<F: FnMut(f64) -> bool> ProgressListener for F {
    fn report(&mut self, fraction: f64) -> bool {
        self(fraction)
    }
}

/// A listener that ignores progress and never cancels.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoProgress;

impl ProgressListener for NoProgress {
    #[inline(always)]
    fn report(&mut self, _fraction: f64) -> bool {
        false
    }
}

/// Maps the `[0, 1]` progress of one step onto the `[offset, offset + scale]` slice of a parent
/// listener's progress.
pub struct SubProgress<'a, L: ProgressListener + ?Sized> {
    parent: &'a mut L,
    offset: f64,
    scale: f64,
}

impl<'a, L: ProgressListener + ?Sized> SubProgress<'a, L> {
    pub fn new(parent: &'a mut L, offset: f64, scale: f64) -> Self {
        Self {
            parent,
            offset,
            scale,
        }
    }
}

impl<L: ProgressListener + ?Sized> ProgressListener for SubProgress<'_, L> {
    fn report(&mut self, fraction: f64) -> bool {
        self.parent
            .report((self.offset + self.scale * fraction).min(1.0))
    }
}

/// The result of an operation that may be cancelled through a [`ProgressListener`].
///
/// Cancellation is neither success nor failure, so it is kept out of the error type.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Completed(T),
    Cancelled,
}

impl<T> Outcome<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled)
    }

    /// The completed value, or `None` if cancelled.
    pub fn completed(self) -> Option<T> {
        match self {
            Outcome::Completed(value) => Some(value),
            Outcome::Cancelled => None,
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U> {
        match self {
            Outcome::Completed(value) => Outcome::Completed(f(value)),
            Outcome::Cancelled => Outcome::Cancelled,
        }
    }
}

/// Unwraps a completed [`Outcome`], or returns `Ok(Outcome::Cancelled)` from the enclosing
/// function.
macro_rules! completed {
    ($outcome:expr) => {
        match $outcome {
            $crate::align::progress::Outcome::Completed(value) => value,
            $crate::align::progress::Outcome::Cancelled => {
                return Ok($crate::align::progress::Outcome::Cancelled)
            }
        }
    };
}

pub(crate) use completed;
