//! The Viterbi decoding engine.
//!
//! One generic implementation covers every variant in the benchmark matrix:
//! the numeric width comes from [`MetricPrecision`], the branch values from
//! a pluggable [`BranchMetrics`] strategy, and the lane width parameterizes
//! how many butterfly pairs each inner-loop pass touches. Lane width is a
//! pure throughput knob: it drives the autovectorizer, and every width
//! produces bit-identical metrics and decisions.
//!
//! The per-bit step is the classic add-compare-select over butterfly pairs
//! `(s, s + 2^(k-2))`: both predecessors of successors `(2s, 2s+1)` share
//! one branch error and its complement, so half the branch computations are
//! folded away. Decisions land in a packed per-step record; the chainback
//! walks those records backward from the tail-terminated state to emit the
//! maximum-likelihood input bytes.
use crate::{
    branch::BranchMetrics,
    code::ConvolutionalCode,
    decisions::DecisionHistory,
    errors::{Error, Result},
    metrics::{PathMetrics, renormalize},
    precision::{DecoderConfig, MetricPrecision},
};

/// Lane widths the engine accepts. `1` is the scalar reference; the wider
/// widths mirror 64/128/256-bit registers over 8-bit lanes.
pub const LANE_WIDTHS: [usize; 4] = [1, 8, 16, 32];

/// A decoder session over one symbol stream.
///
/// Lifecycle: construct, [`set_traceback_length`](Self::set_traceback_length)
/// once per stream shape, then any number of
/// [`reset`](Self::reset) → [`update`](Self::update)* →
/// [`chainback`](Self::chainback) rounds. History storage is allocated once
/// and reused across rounds.
pub struct ViterbiDecoder<P: MetricPrecision, B: BranchMetrics<P>> {
    code: ConvolutionalCode,
    config: DecoderConfig<P>,
    branches: B,
    lane_width: usize,
    metrics: PathMetrics<P::Error>,
    decisions: DecisionHistory,
    traceback_length: usize,
    current_decoded_bit: usize,
    // lane scratch, sized once so the hot loop never allocates
    expected: Vec<P::Soft>,
    totals: Vec<P::Error>,
}

impl<P: MetricPrecision, B: BranchMetrics<P>> ViterbiDecoder<P, B> {
    /// Creates a decoder for `code` with the given scaling, branch strategy
    /// and lane width.
    ///
    /// # Errors
    /// Returns `Error::Config` when the lane width is unsupported or wider
    /// than the butterfly pair space (`2^(k-2)`), the contract that replaces
    /// the SIMD stride arithmetic of hand-vectorized decoders.
    pub fn new(
        code: &ConvolutionalCode,
        config: DecoderConfig<P>,
        branches: B,
        lane_width: usize,
    ) -> Result<Self> {
        if !LANE_WIDTHS.contains(&lane_width) {
            return Err(Error::config(format!(
                "Unsupported lane width {} (expected one of {:?})",
                lane_width, LANE_WIDTHS
            )));
        }
        if code.pair_states() % lane_width != 0 {
            return Err(Error::config(format!(
                "Lane width {} exceeds the {} butterfly pairs of K={}",
                lane_width,
                code.pair_states(),
                code.k()
            )));
        }

        let num_states = code.num_states();
        let mut decoder = ViterbiDecoder {
            metrics: PathMetrics::new(num_states, config.initial_non_start_error),
            decisions: DecisionHistory::new(num_states),
            expected: vec![config.soft_decision_low; lane_width],
            totals: vec![P::ZERO_ERROR; lane_width],
            traceback_length: 0,
            current_decoded_bit: 0,
            code: code.clone(),
            config,
            branches,
            lane_width,
        };
        decoder.reset();
        Ok(decoder)
    }

    /// Sizes the decision history for a stream of `bits` data bits plus the
    /// `k-1` tail bits that drain the trellis.
    pub fn set_traceback_length(&mut self, bits: usize) {
        self.traceback_length = bits;
        self.decisions.resize_steps(bits + self.code.k() - 1);
    }

    /// Rewinds the session: start state biased to 0, everything else at the
    /// non-start error, decoded-bit counter cleared. History storage is
    /// reused in place.
    pub fn reset(&mut self) {
        self.metrics.reset(
            0,
            self.config.initial_start_error,
            self.config.initial_non_start_error,
        );
        self.current_decoded_bit = 0;
    }

    /// Number of bits decoded since the last reset.
    pub fn decoded_bits(&self) -> usize {
        self.current_decoded_bit
    }

    pub fn code(&self) -> &ConvolutionalCode {
        &self.code
    }

    pub fn config(&self) -> &DecoderConfig<P> {
        &self.config
    }

    /// Runs the metric update over `symbols`, one trellis step per group of
    /// `r` symbols. Returns the cumulative amount subtracted by
    /// renormalization, for callers tracking absolute path cost.
    ///
    /// # Panics
    /// The symbol count must be a multiple of the code rate and the stream
    /// must fit the allocated traceback capacity; violations are caller
    /// bugs, not runtime conditions.
    pub fn update(&mut self, symbols: &[P::Soft]) -> u64 {
        let r = self.code.rate();
        assert!(
            symbols.len() % r == 0,
            "symbol count must be a multiple of the code rate"
        );
        let steps = symbols.len() / r;
        assert!(
            self.current_decoded_bit + steps <= self.decisions.capacity_steps(),
            "decoding past the allocated traceback capacity"
        );

        let half = self.code.pair_states();
        let max_error = self.config.soft_decision_max_error;
        let threshold = self.config.renormalization_threshold;
        let mut renorm_offset = 0u64;

        for step_symbols in symbols.chunks_exact(r) {
            {
                let Self {
                    branches,
                    lane_width,
                    metrics,
                    decisions,
                    current_decoded_bit,
                    expected,
                    totals,
                    ..
                } = self;
                let record = decisions.record_mut(*current_decoded_bit);
                let (old, new) = metrics.split();
                butterfly_step::<P, B>(
                    branches,
                    *lane_width,
                    half,
                    max_error,
                    step_symbols,
                    old,
                    new,
                    record,
                    expected,
                    totals,
                );
            }

            let new = self.metrics.new_mut();
            if new[0] >= threshold {
                renorm_offset += P::error_as_u64(renormalize::<P>(new));
            }
            self.metrics.swap();
            self.current_decoded_bit += 1;
        }
        renorm_offset
    }

    /// Reconstructs `num_bits` input bits into `out`, walking the decision
    /// history backward from the tail-terminated state 0.
    ///
    /// Read-only: rerunning it on the same completed session gives the same
    /// bytes. The register-alignment shifts keep byte assembly exact for
    /// constraint lengths on either side of 8.
    ///
    /// # Panics
    /// `num_bits` must be byte-aligned, fully decoded (including the `k-1`
    /// tail steps) and must fit in `out`.
    pub fn chainback(&self, out: &mut [u8], num_bits: usize) {
        let k = self.code.k();
        assert!(num_bits % 8 == 0, "output must be byte aligned");
        assert!(
            num_bits + k - 1 <= self.current_decoded_bit,
            "chainback before the full window was decoded"
        );
        assert!(out.len() >= num_bits / 8, "output buffer too short");

        let (add_shift, sub_shift) = if k - 1 < 8 {
            (8 - (k - 1), 0)
        } else {
            (0, (k - 1) - 8)
        };

        let mut state: u32 = 0;
        for n in (0..num_bits).rev() {
            let bit = self.decisions.bit(n + k - 1, (state >> add_shift) as usize);
            state = (state >> 1) | (bit << (k - 2 + add_shift));
            out[n >> 3] = (state >> sub_shift) as u8;
        }
    }

    #[cfg(test)]
    pub(crate) fn decision(&self, step: usize, state: usize) -> u32 {
        self.decisions.bit(step, state)
    }
}

/// One add-compare-select pass over all butterfly pairs.
///
/// For pair `s`: `error` is the 0-input branch cost out of `s` summed over
/// the step's `r` symbols; the three sibling branches of the butterfly are
/// its complement by the top-tap/input-tap structure of the polynomials.
#[allow(clippy::too_many_arguments)]
fn butterfly_step<P: MetricPrecision, B: BranchMetrics<P>>(
    branches: &B,
    lane_width: usize,
    half: usize,
    max_error: P::Error,
    symbols: &[P::Soft],
    old: &[P::Error],
    new: &mut [P::Error],
    record: &mut [u64],
    expected: &mut [P::Soft],
    totals: &mut [P::Error],
) {
    for base in (0..half).step_by(lane_width) {
        let totals = &mut totals[..lane_width];
        totals.fill(P::ZERO_ERROR);
        for (poly_index, &symbol) in symbols.iter().enumerate() {
            let expected = &mut expected[..lane_width];
            branches.fill_group(poly_index, base, expected);
            for lane in 0..lane_width {
                totals[lane] = P::add_sat(totals[lane], P::abs_diff(expected[lane], symbol));
            }
        }

        let mut bits: u64 = 0;
        for lane in 0..lane_width {
            let s = base + lane;
            let error = totals[lane];
            let complement = P::sub_sat(max_error, error);

            let low_0 = P::add_sat(old[s], error);
            let high_0 = P::add_sat(old[s + half], complement);
            let low_1 = P::add_sat(old[s], complement);
            let high_1 = P::add_sat(old[s + half], error);

            // Ties go to the high predecessor, uniformly across every
            // variant; the comparison direction is load-bearing for
            // bit-exact agreement between strategies and lane widths.
            let d0 = high_0 <= low_0;
            let d1 = high_1 <= low_1;
            new[2 * s] = if d0 { high_0 } else { low_0 };
            new[2 * s + 1] = if d1 { high_1 } else { low_1 };
            bits |= (u64::from(d0) | (u64::from(d1) << 1)) << (2 * lane);
        }
        DecisionHistory::store_bits(record, 2 * base, bits, 2 * lane_width);
    }
}
