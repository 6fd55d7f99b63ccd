pub mod aligners;
pub mod alignment;
pub mod batch;
pub mod error;
pub mod progress;
pub mod scoring;
pub mod sequence;
pub mod traceback;
pub mod workspace;

pub use aligners::{
    constants::{AlignmentMode, AlignmentOperation},
    space_reduced::{ScoreOnly, SpaceReducedAligner},
};
pub use alignment::Alignment;
pub use error::{AlignError, Result};
pub use progress::{NoProgress, Outcome, ProgressListener};
pub use scoring::{Blosum62, GapCosts, MatchMismatch, ScoreModel, SubstitutionMatrix};
pub use sequence::{SequenceView, Symbol};
pub use workspace::Workspace;

use derive_builder::Builder;
use derive_getters::Getters;

use crate::align::aligners::{
    constants::{DEFAULT_ALIGNER_CAPACITY, DEFAULT_HIRSCHBERG_CUTOFF},
    AffineGap, DpAligner, LinearGap,
};

/// Alignment options.  Build with [`Builder`]; every field has a default.
#[derive(Copy, Clone, Debug, PartialEq, Builder, Getters)]
#[builder(name = "Builder", build_fn(name = "build_options"))]
pub struct Options {
    #[builder(default)]
    mode: AlignmentMode,
    #[builder(default)]
    gap_costs: GapCosts,
    /// Reconstruct alignments with Hirschberg's algorithm instead of a full traceback matrix.
    #[builder(default = "false")]
    linear_space: bool,
    /// Sub-problems of at most this many cells are solved with a full DP in linear-space mode.
    #[builder(default = "DEFAULT_HIRSCHBERG_CUTOFF")]
    hirschberg_cutoff: usize,
    /// The sequence length the full DP matrices are initially sized for.  Zero, or linear-space
    /// mode, sizes everything on demand.  Score-only and linear-space runs only ever grow rows.
    #[builder(default = "DEFAULT_ALIGNER_CAPACITY")]
    capacity: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            mode: AlignmentMode::default(),
            gap_costs: GapCosts::default(),
            linear_space: false,
            hirschberg_cutoff: DEFAULT_HIRSCHBERG_CUTOFF,
            capacity: DEFAULT_ALIGNER_CAPACITY,
        }
    }
}

impl Options {
    /// Checks the gap costs, and that linear-space alignment is only requested with gap costs it
    /// supports.
    pub fn validate(&self) -> Result<()> {
        self.gap_costs.validate()?;
        if self.linear_space && self.gap_costs.as_linear().is_none() {
            return Err(AlignError::Unsupported(format!(
                "linear-space alignment requires linear gap costs (or open == extend), found {:?}",
                self.gap_costs
            )));
        }
        Ok(())
    }
}

impl Builder {
    /// Builds and validates the options, then an aligner that scores with `model`.
    pub fn build_aligner<M: ScoreModel>(&self, model: M) -> Result<Aligner<M>> {
        let opts = self
            .build_options()
            .map_err(|e| AlignError::InvalidOptions(e.to_string()))?;
        Aligner::new(model, opts)
    }
}

/// Aligns pairs of sequences with one score model and set of options, reusing its workspace
/// from one call to the next.
///
/// An aligner is mutable scratch space: share the score model, not the aligner, between
/// threads.
pub struct Aligner<M: ScoreModel> {
    model: M,
    opts: Options,
    workspace: Workspace,
}

impl<M: ScoreModel> Aligner<M> {
    pub fn new(model: M, opts: Options) -> Result<Self> {
        let workspace = if opts.linear_space || opts.capacity == 0 {
            Workspace::default()
        } else {
            Workspace::with_capacity(opts.capacity, opts.capacity)
        };
        Self::with_workspace(model, opts, workspace)
    }

    /// An aligner that reuses `workspace`, e.g. one taken back from an earlier aligner.
    pub fn with_workspace(model: M, opts: Options, workspace: Workspace) -> Result<Self> {
        opts.validate()?;
        Ok(Self::with_valid_options(model, opts, workspace))
    }

    pub(crate) fn with_valid_options(model: M, opts: Options, workspace: Workspace) -> Self {
        Aligner {
            model,
            opts,
            workspace,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn into_workspace(self) -> Workspace {
        self.workspace
    }

    pub fn options(&self) -> &Options {
        &self.opts
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Aligns x to y.
    pub fn align<X, Y>(&mut self, x: &X, y: &Y) -> Result<Alignment>
    where
        X: SequenceView + ?Sized,
        Y: SequenceView + ?Sized,
    {
        match self.align_with_progress(x, y, &mut NoProgress)? {
            Outcome::Completed(alignment) => Ok(alignment),
            Outcome::Cancelled => Err(cancelled_without_listener()),
        }
    }

    /// Aligns x to y, reporting progress to (and accepting cancellation from) `progress`.
    pub fn align_with_progress<X, Y, L>(
        &mut self,
        x: &X,
        y: &Y,
        progress: &mut L,
    ) -> Result<Outcome<Alignment>>
    where
        X: SequenceView + ?Sized,
        Y: SequenceView + ?Sized,
        L: ProgressListener + ?Sized,
    {
        let (mode, gap_costs) = (self.opts.mode, self.opts.gap_costs);
        if self.opts.linear_space {
            return SpaceReducedAligner::new(gap_costs, mode, &mut self.workspace)
                .cutoff(self.opts.hirschberg_cutoff)
                .align(x, y, &self.model, progress);
        }
        match gap_costs {
            GapCosts::Linear { cost } => {
                DpAligner::new(LinearGap::new(cost, mode), &mut self.workspace)
                    .align(x, y, &self.model, progress)
            }
            GapCosts::Affine { open, extend } => {
                DpAligner::new(AffineGap::new(open, extend, mode), &mut self.workspace)
                    .align(x, y, &self.model, progress)
            }
        }
    }

    /// The optimal score of aligning x to y, computed in memory linear in the shorter sequence.
    pub fn score_only<X, Y>(&mut self, x: &X, y: &Y) -> Result<f64>
    where
        X: SequenceView + ?Sized,
        Y: SequenceView + ?Sized,
    {
        match self.score_only_with_progress(x, y, &mut NoProgress)? {
            Outcome::Completed(result) => Ok(result.score),
            Outcome::Cancelled => Err(cancelled_without_listener()),
        }
    }

    /// The optimal score and alignment end, computed in memory linear in the shorter sequence.
    pub fn score_only_with_progress<X, Y, L>(
        &mut self,
        x: &X,
        y: &Y,
        progress: &mut L,
    ) -> Result<Outcome<ScoreOnly>>
    where
        X: SequenceView + ?Sized,
        Y: SequenceView + ?Sized,
        L: ProgressListener + ?Sized,
    {
        SpaceReducedAligner::new(self.opts.gap_costs, self.opts.mode, &mut self.workspace)
            .score(x, y, &self.model, progress)
    }
}

fn cancelled_without_listener() -> AlignError {
    AlignError::Lifecycle("alignment reported cancelled without a progress listener".to_string())
}

/// Aligns `x` to `y` with a fresh aligner.
pub fn align<X, Y, M>(
    x: &X,
    y: &Y,
    model: &M,
    gap_costs: GapCosts,
    mode: AlignmentMode,
) -> Result<Alignment>
where
    X: SequenceView + ?Sized,
    Y: SequenceView + ?Sized,
    M: ScoreModel + ?Sized,
{
    Builder::default()
        .mode(mode)
        .gap_costs(gap_costs)
        .capacity(0)
        .build_aligner(model)?
        .align(x, y)
}

/// The optimal global alignment score of `x` and `y`, computed with rolling rows.
pub fn align_score_only<X, Y, M>(x: &X, y: &Y, model: &M, gap_costs: GapCosts) -> Result<f64>
where
    X: SequenceView + ?Sized,
    Y: SequenceView + ?Sized,
    M: ScoreModel + ?Sized,
{
    Builder::default()
        .gap_costs(gap_costs)
        .capacity(0)
        .build_aligner(model)?
        .score_only(x, y)
}

#[cfg(test)]
pub mod tests {
    use bio::alignment::pairwise::{Aligner as BioAligner, MatchParams};
    use itertools::Itertools;
    use rstest::rstest;

    use super::{
        align, align_score_only, AlignError, Aligner, Alignment, AlignmentMode, Builder, GapCosts,
        MatchMismatch, Outcome, ScoreModel,
    };
    use crate::align::aligners::constants::{
        AlignmentMode::{Global, Local},
        DEFAULT_HIRSCHBERG_CUTOFF,
    };

    /// Small deterministic generator of DNA sequences.
    struct Sequences(u64);

    impl Sequences {
        fn next(&mut self, max_len: usize) -> Vec<u8> {
            let len = (self.step() % (max_len as u64 + 1)) as usize;
            (0..len).map(|_| b"ACGT"[(self.step() % 4) as usize]).collect_vec()
        }

        fn step(&mut self) -> u64 {
            self.0 ^= self.0 << 13;
            self.0 ^= self.0 >> 7;
            self.0 ^= self.0 << 17;
            self.0
        }
    }

    fn pairs(count: usize) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut sequences = Sequences(0x9E37_79B9_7F4A_7C15);
        (0..count)
            .map(|_| (sequences.next(40), sequences.next(40)))
            .filter(|(x, y)| !(x.is_empty() && y.is_empty()))
            .collect_vec()
    }

    fn assert_round_trip(alignment: &Alignment, x: &[u8], y: &[u8]) {
        assert_eq!(
            alignment.x_ungapped().as_bytes(),
            &x[alignment.xstart..alignment.xend]
        );
        assert_eq!(
            alignment.y_ungapped().as_bytes(),
            &y[alignment.ystart..alignment.yend]
        );
        alignment.validate().unwrap();
    }

    #[rstest]
    fn test_gattaca() {
        let alignment = align(
            "GATTACA",
            "GCATGCU",
            &MatchMismatch::new(1.0, -1.0),
            GapCosts::linear(1.0),
            Global,
        )
        .unwrap();
        assert_eq!(alignment.score, 0.0);
        // The two textbook optimal alignments
        let known = [("G-ATTACA", "GCA-TGCU"), ("G-ATTACA", "GCAT-GCU")];
        assert!(known.contains(&(alignment.x_aligned.as_str(), alignment.y_aligned.as_str())));
    }

    #[rstest]
    #[case(GapCosts::linear(1.0))]
    #[case(GapCosts::linear(2.5))]
    #[case(GapCosts::affine(3.0, 1.0))]
    fn test_empty_y(#[case] gap_costs: GapCosts) {
        let model = MatchMismatch::default();
        let alignment = align("ACGTACGT", "", &model, gap_costs, Global).unwrap();
        assert_eq!(alignment.score, -gap_costs.gap_cost(8));
        assert_eq!(alignment.y_aligned, "--------");
        assert_eq!(alignment.x_aligned, "ACGTACGT");
        assert_eq!(
            align_score_only("ACGTACGT", "", &model, gap_costs).unwrap(),
            -gap_costs.gap_cost(8)
        );
    }

    #[rstest]
    fn test_both_empty() {
        let model = MatchMismatch::default();
        let err = align("", "", &model, GapCosts::default(), Global).unwrap_err();
        assert_eq!(err, AlignError::EmptySequences);
        let err = align_score_only("", "", &model, GapCosts::default()).unwrap_err();
        assert_eq!(err, AlignError::EmptySequences);
    }

    #[rstest]
    #[case(GapCosts::linear(1.0), false)]
    #[case(GapCosts::linear(1.0), true)]
    #[case(GapCosts::affine(4.0, 1.0), false)]
    fn test_identity(#[case] gap_costs: GapCosts, #[case] linear_space: bool) {
        let mut aligner = Builder::default()
            .gap_costs(gap_costs)
            .linear_space(linear_space)
            .build_aligner(MatchMismatch::new(3.0, -2.0))
            .unwrap();
        for (x, _) in pairs(20).into_iter().filter(|(x, _)| !x.is_empty()) {
            let alignment = aligner.align(&x, &x).unwrap();
            assert_eq!(alignment.score, 3.0 * x.len() as f64);
            assert!(alignment.operations.iter().all(|op| op.as_str() == "="));
            assert_eq!(alignment.x_aligned, alignment.y_aligned);
        }
    }

    #[rstest]
    #[case(Global, GapCosts::linear(1.0), false)]
    #[case(Local, GapCosts::linear(1.0), false)]
    #[case(Global, GapCosts::affine(3.0, 1.0), false)]
    #[case(Local, GapCosts::affine(3.0, 1.0), false)]
    #[case(Global, GapCosts::linear(1.0), true)]
    #[case(Local, GapCosts::linear(1.0), true)]
    fn test_symmetry_and_round_trip(
        #[case] mode: AlignmentMode,
        #[case] gap_costs: GapCosts,
        #[case] linear_space: bool,
    ) {
        let mut aligner = Builder::default()
            .mode(mode)
            .gap_costs(gap_costs)
            .linear_space(linear_space)
            .hirschberg_cutoff(8)
            .build_aligner(MatchMismatch::new(2.0, -1.0))
            .unwrap();
        for (x, y) in pairs(50) {
            let forward = aligner.align(&x, &y).unwrap();
            let reverse = aligner.align(&y, &x).unwrap();
            assert_eq!(forward.score, reverse.score);
            assert_round_trip(&forward, &x, &y);
            assert_round_trip(&reverse, &y, &x);
            assert_eq!(forward.score, aligner.score_only(&x, &y).unwrap());
        }
    }

    #[rstest]
    fn test_idempotence() {
        let mut aligner = Builder::default()
            .gap_costs(GapCosts::affine(2.0, 1.0))
            .build_aligner(MatchMismatch::default())
            .unwrap();
        for (x, y) in pairs(20) {
            let first = aligner.align(&x, &y).unwrap();
            let second = aligner.align(&x, &y).unwrap();
            assert_eq!(first.score.to_bits(), second.score.to_bits());
            assert_eq!(first, second);
        }
    }

    #[rstest]
    fn test_local_bounds() {
        let model = MatchMismatch::new(1.0, -2.0);
        for (x, y) in pairs(10) {
            let local = align(&x, &y, &model, GapCosts::linear(1.5), Local).unwrap();
            let global = align(&x, &y, &model, GapCosts::linear(1.5), Global).unwrap();
            assert!(local.score >= 0.0);
            assert!(local.score >= global.score);
            // No pair of (short) substrings aligns better globally than the local alignment
            for (xs, xe) in (0..=x.len().min(6)).tuple_combinations() {
                for (ys, ye) in (0..=y.len().min(6)).tuple_combinations() {
                    let sub = align(&x[xs..xe], &y[ys..ye], &model, GapCosts::linear(1.5), Global)
                        .unwrap();
                    assert!(local.score >= sub.score);
                }
            }
        }
    }

    #[rstest]
    fn test_affine_equal_costs_matches_linear() {
        let model = MatchMismatch::new(2.0, -1.0);
        for mode in [Global, Local] {
            for (x, y) in pairs(30) {
                let affine = align(&x, &y, &model, GapCosts::affine(1.5, 1.5), mode).unwrap();
                let linear = align(&x, &y, &model, GapCosts::linear(1.5), mode).unwrap();
                assert_eq!(affine.score, linear.score);
            }
        }
    }

    #[rstest]
    fn test_cancellation() {
        let mut calls = 0;
        let mut listener = |_fraction: f64| {
            calls += 1;
            true
        };
        let mut aligner = Builder::default()
            .build_aligner(MatchMismatch::default())
            .unwrap();
        let outcome = aligner
            .align_with_progress("GATTACA", "GCATGCU", &mut listener)
            .unwrap();
        assert_eq!(outcome, Outcome::Cancelled);
        assert_eq!(calls, 1);
    }

    #[rstest]
    fn test_invalid_options() {
        let err = Builder::default()
            .gap_costs(GapCosts::affine(3.0, 1.0))
            .linear_space(true)
            .build_aligner(MatchMismatch::default())
            .err()
            .unwrap();
        assert!(matches!(err, AlignError::Unsupported(_)));
        let err = Builder::default()
            .gap_costs(GapCosts::linear(-1.0))
            .build_aligner(MatchMismatch::default())
            .err()
            .unwrap();
        assert!(err.is_configuration());
    }

    #[rstest]
    fn test_options_defaults() {
        let opts = Builder::default().build_options().unwrap();
        assert_eq!(opts, super::Options::default());
        assert_eq!(*opts.mode(), Global);
        assert_eq!(*opts.gap_costs(), GapCosts::linear(1.0));
        assert!(!*opts.linear_space());
    }

    #[rstest]
    fn test_dynamic_score_model() {
        let model: Box<dyn ScoreModel> = Box::new(MatchMismatch::new(1.0, -1.0));
        let alignment = align("ACGT", "ACGT", &model, GapCosts::default(), Global).unwrap();
        assert_eq!(alignment.score, 4.0);
    }

    /// rust-bio charges `gap_open + k * gap_extend` for a gap of length `k`.
    fn bio_aligner(gap_costs: GapCosts, match_score: i32, mismatch_score: i32) -> BioAligner<MatchParams> {
        let (open, extend) = (gap_costs.open() as i32, gap_costs.extend() as i32);
        BioAligner::new(
            -(open - extend),
            -extend,
            MatchParams::new(match_score, mismatch_score),
        )
    }

    #[rstest]
    #[case(GapCosts::linear(1.0), 1, -1)]
    #[case(GapCosts::linear(2.0), 2, -3)]
    #[case(GapCosts::affine(3.0, 1.0), 1, -1)]
    #[case(GapCosts::affine(5.0, 2.0), 2, -3)]
    fn test_scores_agree_with_rust_bio(
        #[case] gap_costs: GapCosts,
        #[case] match_score: i32,
        #[case] mismatch_score: i32,
    ) {
        let model = MatchParams::new(match_score, mismatch_score);
        let mut bio = bio_aligner(gap_costs, match_score, mismatch_score);
        for (x, y) in pairs(40)
            .into_iter()
            .filter(|(x, y)| !x.is_empty() && !y.is_empty())
        {
            let global = align(&x, &y, &model, gap_costs, Global).unwrap();
            assert_eq!(global.score, f64::from(bio.global(&x, &y).score));
            let local = align(&x, &y, &model, gap_costs, Local).unwrap();
            assert_eq!(local.score, f64::from(bio.local(&x, &y).score));
            assert_eq!(
                align_score_only(&x, &y, &model, gap_costs).unwrap(),
                global.score
            );
        }
    }

    /// A 100kb x against a 10bp y that occurs in it.
    fn long_and_short() -> (Vec<u8>, Vec<u8>) {
        (b"ACGT".repeat(25_000), b"ACGTACGTAC".to_vec())
    }

    #[rstest]
    #[case(Global, GapCosts::linear(1.0), 10.0 - 99_990.0)]
    #[case(Local, GapCosts::linear(1.0), 10.0)]
    #[case(Global, GapCosts::affine(2.0, 1.0), 10.0 - 99_991.0)]
    #[case(Local, GapCosts::affine(2.0, 1.0), 10.0)]
    fn test_long_versus_short(
        #[case] mode: AlignmentMode,
        #[case] gap_costs: GapCosts,
        #[case] expected: f64,
    ) {
        let (x, y) = long_and_short();
        let model = MatchMismatch::new(1.0, -1.0);
        let alignment = align(&x, &y, &model, gap_costs, mode).unwrap();
        assert_eq!(alignment.score, expected);
        assert_eq!(alignment.yend - alignment.ystart, y.len());
        assert_round_trip(&alignment, &x, &y);

        let swapped = align(&y, &x, &model, gap_costs, mode).unwrap();
        assert_eq!(swapped.score, expected);
        assert_round_trip(&swapped, &y, &x);
    }

    #[rstest]
    #[case(Global, GapCosts::linear(1.0), 10.0 - 99_990.0, 1)]
    #[case(Local, GapCosts::linear(1.0), 10.0, 1)]
    #[case(Global, GapCosts::affine(2.0, 1.0), 10.0 - 99_991.0, 3)]
    #[case(Local, GapCosts::affine(2.0, 1.0), 10.0, 3)]
    fn test_score_only_memory_is_linear_in_the_shorter_sequence(
        #[case] mode: AlignmentMode,
        #[case] gap_costs: GapCosts,
        #[case] expected: f64,
        #[case] rows: usize,
    ) {
        let (x, y) = long_and_short();
        let mut aligner = Builder::default()
            .mode(mode)
            .gap_costs(gap_costs)
            .capacity(0)
            .build_aligner(MatchMismatch::new(1.0, -1.0))
            .unwrap();
        assert_eq!(aligner.score_only(&x, &y).unwrap(), expected);
        assert_eq!(aligner.score_only(&y, &x).unwrap(), expected);
        assert_eq!(aligner.workspace().capacity(), 0);
        assert!(aligner.workspace().rolling_capacity() <= rows * (y.len() + 1));
    }

    #[rstest]
    #[case(Global, 10.0 - 99_990.0)]
    #[case(Local, 10.0)]
    fn test_linear_space_long_versus_short(#[case] mode: AlignmentMode, #[case] expected: f64) {
        let (x, y) = long_and_short();
        let mut aligner = Builder::default()
            .mode(mode)
            .gap_costs(GapCosts::linear(1.0))
            .linear_space(true)
            .build_aligner(MatchMismatch::new(1.0, -1.0))
            .unwrap();
        let alignment = aligner.align(&x, &y).unwrap();
        assert_eq!(alignment.score, expected);
        assert_eq!(alignment.yend - alignment.ystart, y.len());
        assert_round_trip(&alignment, &x, &y);

        // Only the base cases fill a full DP, and the split passes hold two rows over y.
        let workspace = aligner.workspace();
        assert!(workspace.capacity() <= 2 * DEFAULT_HIRSCHBERG_CUTOFF);
        assert!(workspace.rolling_capacity() <= 4 * (y.len() + 1));
    }

    #[rstest]
    fn test_non_ascii_text_is_rejected() {
        let model = MatchMismatch::default();
        let err = align("ACéT", "ACT", &model, GapCosts::default(), Global).unwrap_err();
        assert_eq!(err, AlignError::NonAsciiText { position: 2 });
        assert!(align_score_only("ACT", "ACéT", &model, GapCosts::default()).is_err());
        let mut aligner = Builder::default()
            .linear_space(true)
            .build_aligner(&model)
            .unwrap();
        assert!(aligner.align("ACéT", "ACT").unwrap_err().is_alphabet());
        // Byte sequences are aligned as they are.
        assert!(align(&b"AC\xe9T"[..], &b"ACT"[..], &model, GapCosts::default(), Global).is_ok());
    }

    #[rstest]
    fn test_workspace_is_reused() {
        let model = MatchMismatch::default();
        let opts = Builder::default().capacity(0).build_options().unwrap();
        let mut aligner = Aligner::new(&model, opts).unwrap();
        aligner.align("GATTACA", "GCATGCU").unwrap();
        let capacity = aligner.workspace().capacity();
        assert!(capacity >= 8 * 8);

        let mut aligner = Aligner::with_workspace(&model, opts, aligner.into_workspace()).unwrap();
        aligner.align("GATT", "GCAT").unwrap();
        assert_eq!(aligner.workspace().capacity(), capacity);
    }
}
