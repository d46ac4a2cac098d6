//! Benchmark harness: test matrix, decoder variants and the sampling loop.
//!
//! Each `(test, variant)` pair is measured by repeatedly running a full
//! decode session (`reset`, `update` over the whole symbol stream,
//! `chainback`) with each phase timed on its own. Sampling continues until
//! both the sampling time and the minimum sample count are exhausted.
use std::time::Instant;

use itertools::Itertools;
use log::info;

use crate::{
    branch::{BranchMetrics, BranchStrategy, BranchTable, Tableless},
    code::ConvolutionalCode,
    decoder::ViterbiDecoder,
    encoder::encode_to_symbols,
    errors::{Error, Result},
    precision::{MetricPrecision, Soft8, Soft16},
    report::TestReport,
};

/// Sampling-loop controls from the CLI.
#[derive(Clone, Copy, Debug)]
pub struct BenchOptions {
    /// Seconds to keep sampling each variant
    pub sampling_time: f64,
    /// Samples to accumulate even when the time budget is spent
    pub minimum_samples: usize,
}

/// One entry of the benchmark matrix.
#[derive(Clone, Debug)]
pub struct TestCase {
    pub name: &'static str,
    pub code: ConvolutionalCode,
    pub input_bytes: usize,
}

/// One decode session's phase timings in nanoseconds.
#[derive(Clone, Copy, Debug)]
pub struct Sample {
    pub init_ns: u64,
    pub update_ns: u64,
    pub chainback_ns: u64,
}

/// The benchmark matrix: the classic codes this suite has always measured,
/// from the dense K=7 workhorse up to the 2^23-state K=24 boundary case.
pub fn benchmark_suite() -> Vec<TestCase> {
    fn case(name: &'static str, k: usize, polynomials: Vec<u32>, input_bytes: usize) -> TestCase {
        let code = ConvolutionalCode::new(k, polynomials).expect("benchmark code is valid");
        TestCase {
            name,
            code,
            input_bytes,
        }
    }

    vec![
        case("k7_r2", 7, vec![0x6D, 0x4F], 1024),
        case("k7_r4", 7, vec![121, 117, 91, 111], 1024),
        case("k9_r2", 9, vec![0x1AF, 0x11D], 512),
        case("k9_r4", 9, vec![501, 441, 331, 315], 512),
        case(
            "k15_r6",
            15,
            vec![0o42631, 0o47245, 0o56507, 0o73363, 0o77267, 0o64537],
            256,
        ),
        case("k24_r2", 24, vec![0o62650457, 0o62650455], 8),
    ]
}

/// A concrete decoder configuration: metric precision, branch strategy and
/// lane width.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Variant {
    ScalarU8,
    ScalarU16,
    TableU8W16,
    TableU8W32,
    TableU16W8,
    TableU16W16,
    TablelessU8W16,
    TablelessU16W8,
}

impl Variant {
    pub const ALL: [Variant; 8] = [
        Variant::ScalarU8,
        Variant::ScalarU16,
        Variant::TableU8W16,
        Variant::TableU8W32,
        Variant::TableU16W8,
        Variant::TableU16W16,
        Variant::TablelessU8W16,
        Variant::TablelessU16W8,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Variant::ScalarU8 => "scalar_u8",
            Variant::ScalarU16 => "scalar_u16",
            Variant::TableU8W16 => "table_u8_w16",
            Variant::TableU8W32 => "table_u8_w32",
            Variant::TableU16W8 => "table_u16_w8",
            Variant::TableU16W16 => "table_u16_w16",
            Variant::TablelessU8W16 => "tableless_u8_w16",
            Variant::TablelessU16W8 => "tableless_u16_w8",
        }
    }

    pub fn lane_width(self) -> usize {
        match self {
            Variant::ScalarU8 | Variant::ScalarU16 => 1,
            Variant::TableU16W8 | Variant::TablelessU16W8 => 8,
            Variant::TableU8W16 | Variant::TableU16W16 | Variant::TablelessU8W16 => 16,
            Variant::TableU8W32 => 32,
        }
    }

    pub fn strategy(self) -> BranchStrategy {
        match self {
            Variant::TablelessU8W16 | Variant::TablelessU16W8 => BranchStrategy::Tableless,
            _ => BranchStrategy::Table,
        }
    }

    /// Whether the code's butterfly pair space can host this lane width.
    pub fn supports(self, code: &ConvolutionalCode) -> bool {
        code.pair_states() % self.lane_width() == 0
    }

    pub fn parse(name: &str) -> Result<Self> {
        Variant::ALL
            .into_iter()
            .find(|v| v.name() == name)
            .ok_or_else(|| {
                Error::parse(format!(
                    "Unknown variant '{}' (expected one of: {})",
                    name,
                    Variant::ALL.iter().map(|v| v.name()).join(", ")
                ))
            })
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Benchmarks one variant against one test case over `input`.
pub fn run_variant(
    case: &TestCase,
    variant: Variant,
    input: &[u8],
    opts: &BenchOptions,
) -> Result<TestReport> {
    let (samples, output) = match variant {
        Variant::ScalarU8 => run_strategy::<Soft8>(case, variant, input, opts)?,
        Variant::TableU8W16 | Variant::TableU8W32 | Variant::TablelessU8W16 => {
            run_strategy::<Soft8>(case, variant, input, opts)?
        }
        Variant::ScalarU16
        | Variant::TableU16W8
        | Variant::TableU16W16
        | Variant::TablelessU16W8 => run_strategy::<Soft16>(case, variant, input, opts)?,
    };

    let total_bits = output.len() * 8;
    let total_bit_errors = count_bit_errors(input, &output);
    Ok(TestReport {
        name: variant.name().to_string(),
        test: case.name.to_string(),
        k: case.code.k(),
        r: case.code.rate(),
        poly: case.code.polynomials().to_vec(),
        total_input_bytes: input.len(),
        total_transmit_bits: 8 * input.len() + case.code.k() - 1,
        total_output_symbols: case.code.transmit_symbols(input.len()),
        sampling_time: opts.sampling_time,
        minimum_samples: opts.minimum_samples,
        total_samples: samples.len(),
        init_ns: samples.iter().map(|s| s.init_ns).collect(),
        update_ns: samples.iter().map(|s| s.update_ns).collect(),
        chainback_ns: samples.iter().map(|s| s.chainback_ns).collect(),
        total_bits,
        total_bit_errors,
        bit_error_rate: total_bit_errors as f64 / total_bits as f64,
    })
}

fn run_strategy<P: MetricPrecision>(
    case: &TestCase,
    variant: Variant,
    input: &[u8],
    opts: &BenchOptions,
) -> Result<(Vec<Sample>, Vec<u8>)> {
    let config = P::default_config(case.code.rate());
    match variant.strategy() {
        BranchStrategy::Table => {
            let branches = BranchTable::<P>::new(&case.code, &config);
            sample_sessions(case, config, branches, variant.lane_width(), input, opts)
        }
        BranchStrategy::Tableless => {
            let branches = Tableless::<P>::new(&case.code, &config);
            sample_sessions(case, config, branches, variant.lane_width(), input, opts)
        }
    }
}

/// The timed loop: full decode sessions until the time budget and the
/// minimum sample count are both spent.
fn sample_sessions<P: MetricPrecision, B: BranchMetrics<P>>(
    case: &TestCase,
    config: crate::precision::DecoderConfig<P>,
    branches: B,
    lane_width: usize,
    input: &[u8],
    opts: &BenchOptions,
) -> Result<(Vec<Sample>, Vec<u8>)> {
    let symbols = encode_to_symbols::<P>(
        &case.code,
        input,
        config.soft_decision_high,
        config.soft_decision_low,
    );
    let num_bits = input.len() * 8;
    let mut decoder = ViterbiDecoder::new(&case.code, config, branches, lane_width)?;
    decoder.set_traceback_length(num_bits);

    let mut output = vec![0u8; input.len()];
    let mut samples = Vec::new();
    let total = Instant::now();
    loop {
        let elapsed = total.elapsed().as_secs_f64();
        if elapsed > opts.sampling_time && samples.len() > opts.minimum_samples {
            break;
        }

        output.fill(0);
        let t = Instant::now();
        decoder.reset();
        let init_ns = t.elapsed().as_nanos() as u64;

        let t = Instant::now();
        decoder.update(&symbols);
        let update_ns = t.elapsed().as_nanos() as u64;

        let t = Instant::now();
        decoder.chainback(&mut output, num_bits);
        let chainback_ns = t.elapsed().as_nanos() as u64;

        samples.push(Sample {
            init_ns,
            update_ns,
            chainback_ns,
        });
    }
    Ok((samples, output))
}

/// XOR-and-popcount bit error counter.
pub fn count_bit_errors(a: &[u8], b: &[u8]) -> usize {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x ^ y).count_ones() as usize)
        .sum()
}

/// Logs a one-line human summary for a finished report.
pub fn log_throughput(report: &TestReport) {
    let update = median_ns(&report.update_ns);
    let rate = if update > 0.0 {
        report.total_transmit_bits as f64 / (update * 1e-9)
    } else {
        0.0
    };
    let (value, prefix) = si_notation(rate);
    info!(
        "{}/{}: update {:.2} {}bit/s over {} samples, ber {:.4}",
        report.test,
        report.name,
        value,
        prefix,
        report.total_samples,
        report.bit_error_rate
    );
}

fn median_ns(samples: &[u64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sorted: Vec<u64> = samples.iter().copied().sorted().collect();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) as f64 / 2.0
    } else {
        sorted[mid] as f64
    }
}

/// SI prefix for large rates.
fn si_notation(x: f64) -> (f64, &'static str) {
    if x > 1e12 {
        (x * 1e-12, "T")
    } else if x > 1e9 {
        (x * 1e-9, "G")
    } else if x > 1e6 {
        (x * 1e-6, "M")
    } else if x > 1e3 {
        (x * 1e-3, "k")
    } else {
        (x, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_bit_errors() {
        assert_eq!(count_bit_errors(&[0xFF, 0x00], &[0xFF, 0x00]), 0);
        assert_eq!(count_bit_errors(&[0xFF, 0x00], &[0x00, 0xFF]), 16);
        assert_eq!(count_bit_errors(&[0b1010], &[0b0110]), 2);
    }

    #[test]
    fn variant_support_follows_pair_space() {
        let k7 = ConvolutionalCode::new(7, vec![0x6D, 0x4F]).unwrap();
        for variant in Variant::ALL {
            assert!(variant.supports(&k7), "{} should fit K=7", variant);
        }

        // K=5 has 8 pairs: only scalar and 8-lane variants fit.
        let k5 = ConvolutionalCode::new(5, vec![0b10011, 0b11101]).unwrap();
        assert!(Variant::ScalarU8.supports(&k5));
        assert!(Variant::TableU16W8.supports(&k5));
        assert!(!Variant::TableU8W16.supports(&k5));
        assert!(!Variant::TableU8W32.supports(&k5));
    }

    #[test]
    fn variant_names_parse_back() {
        for variant in Variant::ALL {
            assert_eq!(Variant::parse(variant.name()).unwrap(), variant);
        }
        assert!(Variant::parse("sse_u8").is_err());
    }

    #[test]
    fn minimal_bench_run_is_noiseless() {
        let case = TestCase {
            name: "k7_r2_small",
            code: ConvolutionalCode::new(7, vec![0x6D, 0x4F]).unwrap(),
            input_bytes: 32,
        };
        let input: Vec<u8> = (0..32).map(|i| (i * 37 + 11) as u8).collect();
        let opts = BenchOptions {
            sampling_time: 0.0,
            minimum_samples: 1,
        };
        for variant in [Variant::ScalarU16, Variant::TableU8W16, Variant::TablelessU8W16] {
            let report = run_variant(&case, variant, &input, &opts).unwrap();
            assert!(report.total_samples >= 2, "{}", variant);
            assert_eq!(report.total_bit_errors, 0, "{}", variant);
            assert_eq!(report.bit_error_rate, 0.0, "{}", variant);
            assert_eq!(report.total_bits, 32 * 8);
            assert_eq!(report.total_samples, report.update_ns.len());
        }
    }

    #[test]
    fn suite_matches_historical_matrix() {
        let suite = benchmark_suite();
        assert_eq!(suite.len(), 6);
        assert_eq!(suite[0].code.k(), 7);
        assert_eq!(suite[0].input_bytes, 1024);
        assert_eq!(suite[5].code.k(), 24);
        assert_eq!(suite[5].input_bytes, 8);
        // every case supports at least the scalar variants
        for case in &suite {
            assert!(Variant::ScalarU8.supports(&case.code));
        }
    }
}
