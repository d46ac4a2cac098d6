//! Branch metric providers.
//!
//! During the butterfly update the engine needs, for every pair-state `s` in
//! `0..2^(k-2)` and every polynomial, the ideal symbol of the 0-input
//! transition out of `s`. Two interchangeable strategies supply it:
//!
//! - [`BranchTable`]: the values are computed once per distinct
//!   `(k, polynomials, scaling)` into a process-wide registry and shared
//!   between all decoder instances for the process lifetime.
//! - [`Tableless`]: the parity is recomputed on the fly by XOR folding,
//!   trading a little arithmetic for the cache traffic of table loads at
//!   large constraint lengths.
//!
//! Both strategies are bit-exact equivalents; the equivalence is pinned down
//! by the tests at the bottom of this module.
use std::sync::Arc;

use crate::{
    code::{ConvolutionalCode, parity},
    errors::{Error, Result},
    precision::{DecoderConfig, MetricPrecision},
};

/// Identity of a shared branch table: code shape plus soft scaling.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct TableKey {
    k: usize,
    polynomials: Vec<u32>,
    high: i32,
    low: i32,
}

/// Source of ideal 0-input-transition symbols for a run of pair-states.
pub trait BranchMetrics<P: MetricPrecision>: Send + Sync {
    /// Writes the ideal symbol for polynomial `poly_index` of each of the
    /// `out.len()` consecutive pair-states starting at `group_start`.
    fn fill_group(&self, poly_index: usize, group_start: usize, out: &mut [P::Soft]);
}

/// Precomputed branch values, shared process-wide.
///
/// The first construction for a given `(code, scaling)` builds the table;
/// later constructions, including concurrent ones from other threads, get
/// the same `Arc`. Nothing is ever torn down.
pub struct BranchTable<P: MetricPrecision> {
    pair_states: usize,
    values: Arc<[P::Soft]>,
}

impl<P: MetricPrecision> BranchTable<P> {
    /// Looks up or builds the shared table for `code` under `config`'s
    /// soft-decision scaling.
    pub fn new(code: &ConvolutionalCode, config: &DecoderConfig<P>) -> Self {
        let key = TableKey {
            k: code.k(),
            polynomials: code.polynomials().to_vec(),
            high: config.soft_decision_high.into(),
            low: config.soft_decision_low.into(),
        };
        let mut registry = P::table_registry()
            .lock()
            .expect("branch table registry poisoned");
        let values = registry
            .entry(key)
            .or_insert_with(|| build_values(code, config))
            .clone();
        BranchTable {
            pair_states: code.pair_states(),
            values,
        }
    }

    /// Whether two handles share one underlying table.
    pub fn shares_storage_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.values, &other.values)
    }
}

fn build_values<P: MetricPrecision>(
    code: &ConvolutionalCode,
    config: &DecoderConfig<P>,
) -> Arc<[P::Soft]> {
    let half = code.pair_states();
    let mut values = Vec::with_capacity(code.rate() * half);
    for &g in code.polynomials() {
        for state in 0..half {
            let one = parity((2 * state as u32) & g);
            values.push(if one {
                config.soft_decision_high
            } else {
                config.soft_decision_low
            });
        }
    }
    values.into()
}

impl<P: MetricPrecision> BranchMetrics<P> for BranchTable<P> {
    fn fill_group(&self, poly_index: usize, group_start: usize, out: &mut [P::Soft]) {
        let base = poly_index * self.pair_states + group_start;
        out.copy_from_slice(&self.values[base..base + out.len()]);
    }
}

/// Branch values computed on the fly from the polynomials.
///
/// Uses `state & (g >> 1)` rather than `(2*state) & g`; bit 0 of `g` never
/// meets a set bit for a 0-input transition, so the two forms reduce to the
/// same parity.
pub struct Tableless<P: MetricPrecision> {
    shifted: Vec<u32>,
    high: P::Soft,
    low: P::Soft,
}

impl<P: MetricPrecision> Tableless<P> {
    pub fn new(code: &ConvolutionalCode, config: &DecoderConfig<P>) -> Self {
        Tableless {
            shifted: code.polynomials().iter().map(|&g| g >> 1).collect(),
            high: config.soft_decision_high,
            low: config.soft_decision_low,
        }
    }
}

impl<P: MetricPrecision> BranchMetrics<P> for Tableless<P> {
    fn fill_group(&self, poly_index: usize, group_start: usize, out: &mut [P::Soft]) {
        let g = self.shifted[poly_index];
        for (i, slot) in out.iter_mut().enumerate() {
            let state = (group_start + i) as u32;
            *slot = if parity(state & g) { self.high } else { self.low };
        }
    }
}

/// Strategy selector exposed through the harness configuration surface.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BranchStrategy {
    /// Precomputed shared lookup table.
    Table,
    /// On-the-fly parity reduction.
    Tableless,
}

impl BranchStrategy {
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "table" => Ok(BranchStrategy::Table),
            "tableless" => Ok(BranchStrategy::Tableless),
            other => Err(Error::parse(format!("Unknown branch strategy '{}'", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::precision::{Soft8, Soft16};

    fn assert_strategies_agree<P: MetricPrecision>(code: &ConvolutionalCode) {
        let config = P::default_config(code.rate());
        let table = BranchTable::<P>::new(code, &config);
        let tableless = Tableless::<P>::new(code, &config);

        let mut a = vec![config.soft_decision_low; 16];
        let mut b = vec![config.soft_decision_low; 16];
        for poly_index in 0..code.rate() {
            for group_start in (0..code.pair_states()).step_by(16) {
                let n = 16.min(code.pair_states() - group_start);
                table.fill_group(poly_index, group_start, &mut a[..n]);
                tableless.fill_group(poly_index, group_start, &mut b[..n]);
                assert_eq!(a[..n], b[..n], "poly {} group {}", poly_index, group_start);
            }
        }
    }

    #[test]
    fn table_and_tableless_agree_for_every_state() {
        let k7 = ConvolutionalCode::new(7, vec![0x6D, 0x4F]).unwrap();
        assert_strategies_agree::<Soft8>(&k7);
        assert_strategies_agree::<Soft16>(&k7);

        let k9 = ConvolutionalCode::new(9, vec![0x1AF, 0x11D]).unwrap();
        assert_strategies_agree::<Soft8>(&k9);
        assert_strategies_agree::<Soft16>(&k9);
    }

    #[test]
    fn registry_hands_out_shared_storage() {
        let code = ConvolutionalCode::new(9, vec![501, 441, 331, 315]).unwrap();
        let config = Soft8::default_config(code.rate());
        let first = BranchTable::<Soft8>::new(&code, &config);
        let second = BranchTable::<Soft8>::new(&code, &config);
        assert!(first.shares_storage_with(&second));

        // A different scaling is a different table.
        let other = DecoderConfig::<Soft8> {
            soft_decision_high: 5,
            soft_decision_low: -5,
            ..config
        };
        let third = BranchTable::<Soft8>::new(&code, &other);
        assert!(!first.shares_storage_with(&third));
    }

    #[test]
    fn concurrent_constructions_build_one_table() {
        let code = ConvolutionalCode::new(15, vec![
            0o42631, 0o47245, 0o56507, 0o73363, 0o77267, 0o64537,
        ])
        .unwrap();
        let config = Soft16::default_config(code.rate());

        let tables: Vec<BranchTable<Soft16>> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| BranchTable::<Soft16>::new(&code, &config)))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for table in &tables[1..] {
            assert!(tables[0].shares_storage_with(table));
        }
    }
}
