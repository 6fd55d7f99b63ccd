use std::fmt;

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

use crate::align::{
    aligners::constants::{
        AlignmentMode,
        AlignmentOperation::{self, Del, Ins, Match, Subst},
        GAP_CHAR,
    },
    sequence::SequenceView,
    traceback::{State, Trace},
};

/// We consider alignment between two sequences x and y, where x is the first sequence given to
/// the aligner and y the second.  An alignment consists of a score, the start and end position
/// of the alignment on sequence x and sequence y, the lengths of sequences x and y, the alignment
/// edit operations, and the two gapped strings the operations produce.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct Alignment {
    /// Alignment score
    pub score: f64,

    /// x with gap characters inserted, restricted to `xstart..xend`
    pub x_aligned: String,

    /// y with gap characters inserted, restricted to `ystart..yend`
    pub y_aligned: String,

    /// Start position of alignment in x (0-based)
    pub xstart: usize,

    /// End position of alignment in x (0-based exclusive)
    pub xend: usize,

    /// Start position of alignment in y (0-based)
    pub ystart: usize,

    /// End position of alignment in y (0-based exclusive)
    pub yend: usize,

    /// Length of x (not the aligned length, the original length of x!)
    pub xlen: usize,

    /// Length of y (not the aligned length, the original length of y!)
    pub ylen: usize,

    /// Vector of alignment operations
    pub operations: Vec<AlignmentOperation>,
    pub mode: AlignmentMode,

    /// Alignment length, equal to the number of columns in the aligned strings
    pub length: usize,
}

impl Alignment {
    /// Builds the alignment described by a traceback path through x and y.  Diagonal steps over
    /// identical symbols become matches, all other diagonal steps substitutions.
    pub fn from_trace<X, Y>(
        x: &X,
        y: &Y,
        score: f64,
        trace: &Trace,
        mode: AlignmentMode,
    ) -> Alignment
    where
        X: SequenceView + ?Sized,
        Y: SequenceView + ?Sized,
    {
        let (mut i, mut j) = (trace.xstart, trace.ystart);
        let operations = trace
            .states
            .iter()
            .map(|state| {
                let op = match state {
                    State::Match if x.symbol_at(i) == y.symbol_at(j) => Match,
                    State::Match => Subst,
                    State::Ins => Ins,
                    State::Del => Del,
                };
                i += op.length_on_x();
                j += op.length_on_y();
                op
            })
            .collect::<Vec<_>>();
        Self::from_operations(x, y, score, trace.xstart, trace.ystart, operations, mode)
    }

    /// Builds the alignment of the given operations starting at `xstart` in x and `ystart` in y.
    pub fn from_operations<X, Y>(
        x: &X,
        y: &Y,
        score: f64,
        xstart: usize,
        ystart: usize,
        operations: Vec<AlignmentOperation>,
        mode: AlignmentMode,
    ) -> Alignment
    where
        X: SequenceView + ?Sized,
        Y: SequenceView + ?Sized,
    {
        let mut x_aligned = String::with_capacity(operations.len());
        let mut y_aligned = String::with_capacity(operations.len());
        let (mut i, mut j) = (xstart, ystart);
        for op in &operations {
            match op {
                Match | Subst => {
                    x_aligned.push(x.char_at(i));
                    y_aligned.push(y.char_at(j));
                }
                Ins => {
                    x_aligned.push(x.char_at(i));
                    y_aligned.push(GAP_CHAR);
                }
                Del => {
                    x_aligned.push(GAP_CHAR);
                    y_aligned.push(y.char_at(j));
                }
            }
            i += op.length_on_x();
            j += op.length_on_y();
        }
        Alignment {
            score,
            x_aligned,
            y_aligned,
            xstart,
            xend: i,
            ystart,
            yend: j,
            xlen: x.len(),
            ylen: y.len(),
            length: operations.len(),
            operations,
            mode,
        }
    }

    /// Checks that the coordinates, aligned strings, and length agree with the operations.
    pub fn validate(&self) -> Result<()> {
        if self.mode == AlignmentMode::Global {
            ensure!(self.xstart == 0, "global alignment starts at x={}", self.xstart);
            ensure!(self.ystart == 0, "global alignment starts at y={}", self.ystart);
            ensure!(self.xend == self.xlen, "global alignment ends at x={}", self.xend);
            ensure!(self.yend == self.ylen, "global alignment ends at y={}", self.yend);
        }
        let xend = self.xstart
            + self
                .operations
                .iter()
                .map(AlignmentOperation::length_on_x)
                .sum::<usize>();
        let yend = self.ystart
            + self
                .operations
                .iter()
                .map(AlignmentOperation::length_on_y)
                .sum::<usize>();
        ensure!(self.xend == xend, "xend: {} != {}", self.xend, xend);
        ensure!(self.yend == yend, "yend: {} != {}", self.yend, yend);
        ensure!(self.xend <= self.xlen, "xend {} > xlen {}", self.xend, self.xlen);
        ensure!(self.yend <= self.ylen, "yend {} > ylen {}", self.yend, self.ylen);
        ensure!(self.length == self.operations.len(), "length: {}", self.length);
        ensure!(
            self.x_aligned.chars().count() == self.length
                && self.y_aligned.chars().count() == self.length,
            "aligned strings are not {} columns long",
            self.length
        );
        Ok(())
    }

    /// The extended CIGAR of the operations (`=`, `X`, `I` and `D`, each run-length encoded).
    pub fn cigar(&self) -> String {
        self.operations
            .iter()
            .fold(Vec::<(AlignmentOperation, usize)>::new(), |mut runs, &op| {
                match runs.last_mut() {
                    Some((last, len)) if *last == op => *len += 1,
                    _ => runs.push((op, 1)),
                }
                runs
            })
            .into_iter()
            .map(|(op, len)| format!("{}{}", len, op.as_str()))
            .collect()
    }

    /// The fraction of alignment columns that are matches, or zero for an empty alignment.
    pub fn identity(&self) -> f64 {
        if self.length == 0 {
            0.0
        } else {
            let matches = self.operations.iter().filter(|op| **op == Match).count();
            matches as f64 / self.length as f64
        }
    }

    /// The x symbols covered by the alignment, with gaps removed.
    pub fn x_ungapped(&self) -> String {
        self.x_aligned.chars().filter(|c| *c != GAP_CHAR).collect()
    }

    /// The y symbols covered by the alignment, with gaps removed.
    pub fn y_ungapped(&self) -> String {
        self.y_aligned.chars().filter(|c| *c != GAP_CHAR).collect()
    }

    /// The middle line of the pretty-printed alignment: `|` for matches, `.` for substitutions
    /// and a space opposite gaps.
    pub fn match_line(&self) -> String {
        self.operations
            .iter()
            .map(|op| match op {
                Match => '|',
                Subst => '.',
                Ins | Del => ' ',
            })
            .collect()
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.x_aligned)?;
        writeln!(f, "{}", self.match_line())?;
        write!(f, "{}", self.y_aligned)
    }
}

#[cfg(test)]
pub mod tests {
    use rstest::rstest;

    use crate::align::{
        aligners::constants::{
            AlignmentMode,
            AlignmentOperation::{Del, Ins, Match, Subst},
        },
        traceback::{State, Trace},
    };

    use super::Alignment;

    fn empty_alignment() -> Alignment {
        Alignment::from_operations("", "", 0.0, 0, 0, Vec::new(), AlignmentMode::Global)
    }

    /// x: GCATG-CA
    /// y: G-ATTACA
    fn gapped_alignment() -> Alignment {
        Alignment::from_operations(
            "GCATGCA",
            "GATTACA",
            0.0,
            0,
            0,
            vec![Match, Ins, Match, Match, Subst, Del, Match, Match],
            AlignmentMode::Global,
        )
    }

    fn local_alignment() -> Alignment {
        Alignment::from_operations(
            "TTACGTT",
            "GGACGGG",
            3.0,
            2,
            2,
            vec![Match, Match, Match],
            AlignmentMode::Local,
        )
    }

    #[rstest]
    #[case(&empty_alignment())]
    #[case(&gapped_alignment())]
    #[case(&local_alignment())]
    fn test_valid_alignments(#[case] alignment: &Alignment) {
        assert!(alignment.validate().is_ok());
    }

    #[rstest]
    fn test_invalid_alignments() {
        let mut alignment = gapped_alignment();
        alignment.yend -= 1;
        assert!(alignment.validate().is_err());

        let mut alignment = local_alignment();
        alignment.mode = AlignmentMode::Global;
        assert!(alignment.validate().is_err());

        let mut alignment = gapped_alignment();
        alignment.x_aligned.pop();
        assert!(alignment.validate().is_err());
    }

    #[rstest]
    fn test_from_operations() {
        let alignment = gapped_alignment();
        assert_eq!(alignment.x_aligned, "GCATG-CA");
        assert_eq!(alignment.y_aligned, "G-ATTACA");
        assert_eq!((alignment.xend, alignment.yend), (7, 7));
        assert_eq!(alignment.length, 8);
        assert_eq!(alignment.x_ungapped(), "GCATGCA");
        assert_eq!(alignment.y_ungapped(), "GATTACA");
    }

    #[rstest]
    fn test_from_trace() {
        let trace = Trace {
            xstart: 1,
            ystart: 0,
            states: vec![State::Match, State::Del, State::Match, State::Ins],
        };
        let alignment = Alignment::from_trace("AACG", "ATG", -1.0, &trace, AlignmentMode::Local);
        assert_eq!(alignment.operations, vec![Match, Del, Subst, Ins]);
        assert_eq!(alignment.x_aligned, "A-CG");
        assert_eq!(alignment.y_aligned, "ATG-");
        assert_eq!((alignment.xstart, alignment.xend), (1, 4));
        assert_eq!((alignment.ystart, alignment.yend), (0, 3));
        assert!(alignment.validate().is_ok());
    }

    #[rstest]
    #[case(&empty_alignment(), "")]
    #[case(&gapped_alignment(), "1=1I2=1X1D2=")]
    #[case(&local_alignment(), "3=")]
    fn test_cigar(#[case] alignment: &Alignment, #[case] cigar: &str) {
        assert_eq!(alignment.cigar(), cigar);
    }

    #[rstest]
    #[case(&empty_alignment(), 0.0)]
    #[case(&gapped_alignment(), 0.625)]
    #[case(&local_alignment(), 1.0)]
    fn test_identity(#[case] alignment: &Alignment, #[case] identity: f64) {
        assert_eq!(alignment.identity(), identity);
    }

    #[rstest]
    fn test_display() {
        assert_eq!(
            gapped_alignment().to_string(),
            "GCATG-CA\n| ||. ||\nG-ATTACA"
        );
    }
}
