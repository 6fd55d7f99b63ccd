use std::ops::Range;

use crate::align::error::{AlignError, Result};

/// A single sequence symbol (a residue, base, or state index).
pub type Symbol = u8;

/// Read-only access to a sequence of symbols.
///
/// The aligners only ever borrow a view for the duration of one call.  Symbols are single
/// bytes: `str` and `String` are viewed as their UTF-8 bytes, so only ASCII text can be aligned
/// and rendered back unchanged.  [`SequenceView::check_symbols`] rejects anything else before an
/// alignment starts.
pub trait SequenceView {
    fn len(&self) -> usize;

    /// The symbol at the 0-based position `i`.
    fn symbol_at(&self, i: usize) -> Symbol;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fails if the view holds symbols that cannot be aligned one byte at a time.
    fn check_symbols(&self) -> Result<()> {
        Ok(())
    }

    /// The character used for position `i` when rendering an aligned sequence.
    fn char_at(&self, i: usize) -> char {
        char::from(self.symbol_at(i))
    }
}

impl<T: SequenceView + ?Sized> SequenceView for &T {
    #[inline(always)]
    fn len(&self) -> usize {
        (**self).len()
    }

    #[inline(always)]
    fn symbol_at(&self, i: usize) -> Symbol {
        (**self).symbol_at(i)
    }

    fn char_at(&self, i: usize) -> char {
        (**self).char_at(i)
    }

    fn check_symbols(&self) -> Result<()> {
        (**self).check_symbols()
    }
}

/// Text is aligned byte by byte, which only round-trips for ASCII.
fn check_ascii(bytes: &[u8]) -> Result<()> {
    match bytes.iter().position(|b| !b.is_ascii()) {
        Some(position) => Err(AlignError::NonAsciiText { position }),
        None => Ok(()),
    }
}

impl SequenceView for [u8] {
    #[inline(always)]
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    #[inline(always)]
    fn symbol_at(&self, i: usize) -> Symbol {
        self[i]
    }
}

impl SequenceView for Vec<u8> {
    #[inline(always)]
    fn len(&self) -> usize {
        Vec::len(self)
    }

    #[inline(always)]
    fn symbol_at(&self, i: usize) -> Symbol {
        self[i]
    }
}

impl SequenceView for str {
    #[inline(always)]
    fn len(&self) -> usize {
        str::len(self)
    }

    #[inline(always)]
    fn symbol_at(&self, i: usize) -> Symbol {
        self.as_bytes()[i]
    }

    fn check_symbols(&self) -> Result<()> {
        check_ascii(self.as_bytes())
    }
}

impl SequenceView for String {
    #[inline(always)]
    fn len(&self) -> usize {
        String::len(self)
    }

    #[inline(always)]
    fn symbol_at(&self, i: usize) -> Symbol {
        self.as_bytes()[i]
    }

    fn check_symbols(&self) -> Result<()> {
        check_ascii(self.as_bytes())
    }
}

/// A view over the half-open range `[start, end)` of another sequence.
#[derive(Debug)]
pub struct Window<'a, S: ?Sized> {
    seq: &'a S,
    start: usize,
    len: usize,
}

impl<S: ?Sized> Clone for Window<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: ?Sized> Copy for Window<'_, S> {}

impl<'a, S: SequenceView + ?Sized> Window<'a, S> {
    pub fn new(seq: &'a S, range: Range<usize>) -> Self {
        debug_assert!(range.start <= range.end);
        debug_assert!(range.end <= seq.len());
        Self {
            seq,
            start: range.start,
            len: range.end - range.start,
        }
    }

    /// The offset of this window in the underlying sequence.
    pub fn start(&self) -> usize {
        self.start
    }
}

impl<S: SequenceView + ?Sized> SequenceView for Window<'_, S> {
    #[inline(always)]
    fn len(&self) -> usize {
        self.len
    }

    #[inline(always)]
    fn symbol_at(&self, i: usize) -> Symbol {
        debug_assert!(i < self.len);
        self.seq.symbol_at(self.start + i)
    }

    fn char_at(&self, i: usize) -> char {
        self.seq.char_at(self.start + i)
    }

    fn check_symbols(&self) -> Result<()> {
        self.seq.check_symbols()
    }
}

/// A view of another sequence read back to front.
#[derive(Debug, Clone, Copy)]
pub struct Reversed<S>(pub S);

impl<S: SequenceView> SequenceView for Reversed<S> {
    #[inline(always)]
    fn len(&self) -> usize {
        self.0.len()
    }

    #[inline(always)]
    fn symbol_at(&self, i: usize) -> Symbol {
        self.0.symbol_at(self.0.len() - 1 - i)
    }

    fn char_at(&self, i: usize) -> char {
        self.0.char_at(self.0.len() - 1 - i)
    }

    fn check_symbols(&self) -> Result<()> {
        self.0.check_symbols()
    }
}
