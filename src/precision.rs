//! Metric precision abstraction.
//!
//! The engine runs in one of two numeric widths: 8-bit path metrics with
//! `i8` soft symbols, or 16-bit path metrics with `i16` soft symbols. The
//! narrow width doubles the number of states processed per register at the
//! cost of earlier renormalization; both widths share one algorithm through
//! the [`MetricPrecision`] trait and must produce identical decoded output.
use std::{
    collections::HashMap,
    fmt::Debug,
    sync::{Arc, Mutex, OnceLock},
};

use crate::branch::TableKey;

/// Numeric width of a decoder instance: soft symbol type, accumulated error
/// type, saturating arithmetic, and default scaling.
///
/// Implemented by the marker types [`Soft8`] and [`Soft16`].
pub trait MetricPrecision: Copy + Debug + Send + Sync + 'static {
    /// Received/ideal symbol type.
    type Soft: Copy + PartialEq + Into<i32> + Debug + Send + Sync + 'static;
    /// Accumulated path/branch error type.
    type Error: Copy + Ord + Debug + Send + Sync + 'static;

    /// Additive identity for errors.
    const ZERO_ERROR: Self::Error;
    /// Short name used in variant labels.
    const NAME: &'static str;

    /// Saturating absolute difference between two soft symbols.
    fn abs_diff(a: Self::Soft, b: Self::Soft) -> Self::Error;

    /// Saturating error addition.
    fn add_sat(a: Self::Error, b: Self::Error) -> Self::Error;

    /// Saturating error subtraction.
    fn sub_sat(a: Self::Error, b: Self::Error) -> Self::Error;

    /// Widen an error for cumulative accounting.
    fn error_as_u64(e: Self::Error) -> u64;

    /// Default decoder scaling for this width and the given code rate.
    fn default_config(code_rate: usize) -> DecoderConfig<Self>;

    /// Process-wide registry of precomputed branch tables for this width.
    ///
    /// Built lazily, guarded, and kept for the process lifetime; see
    /// [`crate::branch::BranchTable`].
    fn table_registry() -> &'static Mutex<HashMap<TableKey, Arc<[Self::Soft]>>>;
}

/// Scaling and thresholds of a decoder instance.
///
/// All variants being compared against each other must share one config:
/// the renormalization threshold decides *when* metrics shrink, and a
/// mismatch there desynchronizes otherwise identical decoders.
#[derive(Clone, Copy, Debug)]
pub struct DecoderConfig<P: MetricPrecision> {
    /// Symbol value transmitted for an encoder output of 1.
    pub soft_decision_high: P::Soft,
    /// Symbol value transmitted for an encoder output of 0.
    pub soft_decision_low: P::Soft,
    /// Largest possible branch error over one transition:
    /// `(high - low) * r`. Also the complement base for 1-input branches.
    pub soft_decision_max_error: P::Error,
    /// Initial metric of the known start state.
    pub initial_start_error: P::Error,
    /// Initial metric of every other state; biases the survivor search
    /// toward the known start until real evidence accumulates.
    pub initial_non_start_error: P::Error,
    /// When the representative metric reaches this value after a step, the
    /// global minimum is subtracted from every state.
    pub renormalization_threshold: P::Error,
}

/// 8-bit metrics over `i8` soft symbols.
#[derive(Clone, Copy, Debug)]
pub struct Soft8;

/// 16-bit metrics over `i16` soft symbols.
#[derive(Clone, Copy, Debug)]
pub struct Soft16;

impl MetricPrecision for Soft8 {
    type Soft = i8;
    type Error = u8;

    const ZERO_ERROR: u8 = 0;
    const NAME: &'static str = "u8";

    fn abs_diff(a: i8, b: i8) -> u8 {
        (i32::from(a) - i32::from(b))
            .unsigned_abs()
            .min(u32::from(u8::MAX)) as u8
    }

    fn add_sat(a: u8, b: u8) -> u8 {
        a.saturating_add(b)
    }

    fn sub_sat(a: u8, b: u8) -> u8 {
        a.saturating_sub(b)
    }

    fn error_as_u64(e: u8) -> u64 {
        u64::from(e)
    }

    fn default_config(code_rate: usize) -> DecoderConfig<Self> {
        DecoderConfig {
            soft_decision_high: 3,
            soft_decision_low: -3,
            soft_decision_max_error: (6 * code_rate).min(usize::from(u8::MAX)) as u8,
            initial_start_error: 0,
            initial_non_start_error: 63,
            renormalization_threshold: 127,
        }
    }

    fn table_registry() -> &'static Mutex<HashMap<TableKey, Arc<[i8]>>> {
        static REGISTRY: OnceLock<Mutex<HashMap<TableKey, Arc<[i8]>>>> = OnceLock::new();
        REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
    }
}

impl MetricPrecision for Soft16 {
    type Soft = i16;
    type Error = u16;

    const ZERO_ERROR: u16 = 0;
    const NAME: &'static str = "u16";

    fn abs_diff(a: i16, b: i16) -> u16 {
        (i32::from(a) - i32::from(b))
            .unsigned_abs()
            .min(u32::from(u16::MAX)) as u16
    }

    fn add_sat(a: u16, b: u16) -> u16 {
        a.saturating_add(b)
    }

    fn sub_sat(a: u16, b: u16) -> u16 {
        a.saturating_sub(b)
    }

    fn error_as_u64(e: u16) -> u64 {
        u64::from(e)
    }

    fn default_config(code_rate: usize) -> DecoderConfig<Self> {
        DecoderConfig {
            soft_decision_high: 127,
            soft_decision_low: -127,
            soft_decision_max_error: (254 * code_rate).min(usize::from(u16::MAX)) as u16,
            initial_start_error: 0,
            // 10.5 transitions of per-symbol error, the same relative start
            // bias as the 8-bit scaling (63 / 6): 10.5 * 254 = 2667.
            initial_non_start_error: 2667,
            renormalization_threshold: 32767,
        }
    }

    fn table_registry() -> &'static Mutex<HashMap<TableKey, Arc<[i16]>>> {
        static REGISTRY: OnceLock<Mutex<HashMap<TableKey, Arc<[i16]>>>> = OnceLock::new();
        REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abs_diff_saturates() {
        assert_eq!(Soft8::abs_diff(3, -3), 6);
        assert_eq!(Soft8::abs_diff(-3, 3), 6);
        assert_eq!(Soft8::abs_diff(127, -128), 255);
        assert_eq!(Soft16::abs_diff(127, -127), 254);
        assert_eq!(Soft16::abs_diff(i16::MAX, i16::MIN), u16::MAX);
    }

    #[test]
    fn default_configs_scale_with_rate() {
        let c8 = Soft8::default_config(2);
        assert_eq!(c8.soft_decision_max_error, 12);
        assert_eq!(
            Soft8::abs_diff(c8.soft_decision_high, c8.soft_decision_low) as usize * 2,
            c8.soft_decision_max_error as usize
        );

        let c16 = Soft16::default_config(6);
        assert_eq!(c16.soft_decision_max_error, 254 * 6);
        assert!(c16.initial_non_start_error < c16.renormalization_threshold);
    }
}
