//! Cross-variant verification.
//!
//! Runs randomized trials that push the same (optionally corrupted) symbol
//! stream through every decoder variant the code supports and checks that
//! all of them produce the same decoded bytes. Strategy equivalence (table
//! vs tableless), precision equivalence (8 vs 16 bit) and lane-width
//! equivalence all reduce to this one check. Trials are independent decoder
//! instances, so they run in parallel.
use rand::{Rng, SeedableRng, rngs::StdRng};
use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::{
    bench::{Variant, count_bit_errors},
    branch::{BranchMetrics, BranchStrategy, BranchTable, Tableless},
    code::ConvolutionalCode,
    decoder::ViterbiDecoder,
    encoder::encode_to_symbols,
    errors::Result,
    precision::{DecoderConfig, MetricPrecision, Soft8, Soft16},
    report::VerifyReport,
};

/// Controls for a verification run.
#[derive(Clone, Copy, Debug)]
pub struct VerifyOptions {
    pub trials: usize,
    pub input_bytes: usize,
    /// Probability of flipping each transmitted symbol to its opposite
    /// extreme. 0 keeps the channel noiseless.
    pub flip_rate: f64,
    pub seed: u64,
}

/// Decodes `input` once with the given variant, flipping the symbols whose
/// index is marked in `flips`.
pub fn decode_once(
    variant: Variant,
    code: &ConvolutionalCode,
    input: &[u8],
    flips: &[bool],
) -> Result<Vec<u8>> {
    match variant {
        Variant::ScalarU8
        | Variant::TableU8W16
        | Variant::TableU8W32
        | Variant::TablelessU8W16 => decode_precision::<Soft8>(variant, code, input, flips),
        Variant::ScalarU16
        | Variant::TableU16W8
        | Variant::TableU16W16
        | Variant::TablelessU16W8 => decode_precision::<Soft16>(variant, code, input, flips),
    }
}

fn decode_precision<P: MetricPrecision>(
    variant: Variant,
    code: &ConvolutionalCode,
    input: &[u8],
    flips: &[bool],
) -> Result<Vec<u8>> {
    let config = P::default_config(code.rate());
    let mut symbols = encode_to_symbols::<P>(
        code,
        input,
        config.soft_decision_high,
        config.soft_decision_low,
    );
    assert_eq!(symbols.len(), flips.len(), "flip mask must cover the stream");
    for (symbol, &flip) in symbols.iter_mut().zip(flips) {
        if flip {
            *symbol = if *symbol == config.soft_decision_high {
                config.soft_decision_low
            } else {
                config.soft_decision_high
            };
        }
    }

    match variant.strategy() {
        BranchStrategy::Table => decode_engine(
            code,
            config,
            BranchTable::<P>::new(code, &config),
            variant.lane_width(),
            &symbols,
            input.len(),
        ),
        BranchStrategy::Tableless => decode_engine(
            code,
            config,
            Tableless::<P>::new(code, &config),
            variant.lane_width(),
            &symbols,
            input.len(),
        ),
    }
}

fn decode_engine<P: MetricPrecision, B: BranchMetrics<P>>(
    code: &ConvolutionalCode,
    config: DecoderConfig<P>,
    branches: B,
    lane_width: usize,
    symbols: &[P::Soft],
    num_bytes: usize,
) -> Result<Vec<u8>> {
    let mut decoder = ViterbiDecoder::new(code, config, branches, lane_width)?;
    decoder.set_traceback_length(num_bytes * 8);
    decoder.reset();
    decoder.update(symbols);
    let mut out = vec![0u8; num_bytes];
    decoder.chainback(&mut out, num_bytes * 8);
    Ok(out)
}

/// Runs `opts.trials` independent randomized trials in parallel and
/// aggregates agreement and bit-error statistics.
pub fn run_verify(code: &ConvolutionalCode, opts: &VerifyOptions) -> Result<VerifyReport> {
    let variants: Vec<Variant> = Variant::ALL
        .into_iter()
        .filter(|v| v.supports(code))
        .collect();

    let trial_results: Vec<(bool, usize, usize)> = (0..opts.trials)
        .into_par_iter()
        .map(|trial| -> Result<(bool, usize, usize)> {
            let mut rng = StdRng::seed_from_u64(opts.seed.wrapping_add(trial as u64));
            let mut input = vec![0u8; opts.input_bytes];
            rng.fill(&mut input[..]);
            let flips: Vec<bool> = (0..code.transmit_symbols(input.len()))
                .map(|_| rng.random_bool(opts.flip_rate))
                .collect();

            let outputs = variants
                .iter()
                .map(|&variant| decode_once(variant, code, &input, &flips))
                .collect::<Result<Vec<_>>>()?;

            let agreed = outputs.windows(2).all(|pair| pair[0] == pair[1]);
            let bit_errors = count_bit_errors(&input, &outputs[0]);
            Ok((agreed, bit_errors, input.len() * 8))
        })
        .collect::<Result<Vec<_>>>()?;

    let disagreements = trial_results.iter().filter(|(agreed, ..)| !agreed).count();
    let total_errors: usize = trial_results.iter().map(|&(_, errors, _)| errors).sum();
    let total_bits: usize = trial_results.iter().map(|&(.., bits)| bits).sum();

    Ok(VerifyReport {
        code: code.to_string(),
        trials: opts.trials,
        input_bytes: opts.input_bytes,
        flip_rate: opts.flip_rate,
        seed: opts.seed,
        variants: variants.iter().map(|v| v.name().to_string()).collect(),
        disagreements,
        mean_bit_error_rate: if total_bits > 0 {
            total_errors as f64 / total_bits as f64
        } else {
            0.0
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noiseless_trials_agree_with_zero_errors() {
        let code = ConvolutionalCode::new(7, vec![0x6D, 0x4F]).unwrap();
        let opts = VerifyOptions {
            trials: 4,
            input_bytes: 24,
            flip_rate: 0.0,
            seed: 99,
        };
        let report = run_verify(&code, &opts).unwrap();
        assert_eq!(report.disagreements, 0);
        assert_eq!(report.mean_bit_error_rate, 0.0);
        assert_eq!(report.variants.len(), Variant::ALL.len());
    }

    #[test]
    fn correctable_noise_keeps_variants_aligned() {
        let code = ConvolutionalCode::new(7, vec![0x6D, 0x4F]).unwrap();
        let opts = VerifyOptions {
            trials: 8,
            input_bytes: 64,
            flip_rate: 0.02,
            seed: 7,
        };
        let report = run_verify(&code, &opts).unwrap();
        // Residual bit errors are acceptable at this noise level; what must
        // hold is that every variant decodes the same bytes.
        assert_eq!(report.disagreements, 0);
        assert!(report.mean_bit_error_rate < 0.01);
    }

    #[test]
    fn narrow_pair_space_drops_wide_variants() {
        let code = ConvolutionalCode::new(5, vec![0b10011, 0b11101]).unwrap();
        let opts = VerifyOptions {
            trials: 2,
            input_bytes: 8,
            flip_rate: 0.0,
            seed: 1,
        };
        let report = run_verify(&code, &opts).unwrap();
        assert!(report.variants.contains(&"scalar_u8".to_string()));
        assert!(!report.variants.contains(&"table_u8_w32".to_string()));
        assert_eq!(report.disagreements, 0);
    }
}
