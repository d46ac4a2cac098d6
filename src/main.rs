use std::{
    fs::File,
    io::{self, Write},
};

use clap::{Parser, Subcommand};
use log::info;
use rand::Rng;

use viterbi_bench::{
    bench::{self, BenchOptions, Variant, benchmark_suite, run_variant},
    code::ConvolutionalCode,
    errors::{Error, Result},
    report,
    verify::{VerifyOptions, run_verify},
};

/// Command-line interface structure
#[derive(Parser, Debug)]
#[command(about = "Benchmark and cross-check vectorized Viterbi decoders for convolutional codes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Subcommands for the CLI
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the benchmark matrix and report per-phase timings.
    ///
    /// Each decoder variant is timed over full decode sessions (reset,
    /// update across the whole symbol stream, chainback) against every code
    /// in the matrix, from K=7 rate-1/2 up to the 2^23-state K=24 boundary
    /// case. One JSON record per (test, variant) pair is written to the
    /// output, line by line, as results complete.
    ///
    /// Example:
    /// ```
    /// bench --sampling-time 2.0 --minimum-samples 16 --output benchmark.jsonl
    /// ```
    Bench {
        /// Seconds to keep sampling each decoder variant
        #[arg(
            short = 't',
            long,
            default_value_t = 1.0,
            help = "Seconds to keep sampling each decoder variant"
        )]
        sampling_time: f64,

        /// Samples to accumulate even when the time budget is spent
        #[arg(
            short = 'n',
            long,
            default_value_t = 8,
            help = "Minimum number of samples to accumulate"
        )]
        minimum_samples: usize,

        /// Optional output file for the reports (JSON lines)
        #[arg(short, long, help = "Output file path (defaults to stdout)")]
        output: Option<String>,

        /// Restrict the run to the named variants (repeatable)
        #[arg(long, help = "Run only the named decoder variants")]
        variant: Vec<String>,
    },
    /// Cross-check decoder variants for bit-exact agreement.
    ///
    /// Decodes randomized (optionally corrupted) streams with every variant
    /// the code supports and verifies all of them produce identical bytes.
    /// Trials run in parallel, one decoder instance each. Exits non-zero if
    /// any trial disagrees.
    ///
    /// Example:
    /// ```
    /// verify --trials 64 --input-bytes 512 --flip-rate 0.02 --code 7:2:0x6D,0x4F
    /// ```
    Verify {
        /// Number of randomized trials
        #[arg(long, default_value_t = 32, help = "Number of randomized trials")]
        trials: usize,

        /// Input bytes per trial
        #[arg(long, default_value_t = 256, help = "Input bytes per trial")]
        input_bytes: usize,

        /// Probability of flipping each transmitted symbol
        #[arg(
            long,
            default_value_t = 0.0,
            help = "Probability of flipping each transmitted symbol"
        )]
        flip_rate: f64,

        /// Code spec `K:R:poly,poly,...`
        #[arg(long, help = "Code spec K:R:poly,... (defaults to 7:2:0x6D,0x4F)")]
        code: Option<String>,

        /// Base seed for trial generation
        #[arg(long, help = "Base seed for trial generation (random when omitted)")]
        seed: Option<u64>,

        /// Optional output file for the report (JSON)
        #[arg(short, long, help = "Output file path (defaults to stdout)")]
        output: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::init();

    match cli.command {
        Commands::Bench {
            sampling_time,
            minimum_samples,
            output,
            variant,
        } => {
            if sampling_time <= 0.0 {
                return Err(Error::config(format!(
                    "Sampling time must be positive ({:.3})",
                    sampling_time
                )));
            }
            if minimum_samples == 0 {
                return Err(Error::config("Minimum number of samples must be non-zero"));
            }
            let selected: Option<Vec<Variant>> = if variant.is_empty() {
                None
            } else {
                Some(
                    variant
                        .iter()
                        .map(|name| Variant::parse(name))
                        .collect::<Result<_>>()?,
                )
            };

            info!("Sampling time: {}s", sampling_time);
            info!("Minimum samples: {}", minimum_samples);

            let mut writer: Box<dyn Write> = match output {
                Some(file_path) => {
                    info!("Output file: {}", file_path);
                    Box::new(File::create(&file_path)?)
                }
                None => Box::new(io::stdout()),
            };

            let opts = BenchOptions {
                sampling_time,
                minimum_samples,
            };
            let mut rng = rand::rng();
            for case in benchmark_suite() {
                info!(
                    "[{}] {} over {} input bytes",
                    case.name, case.code, case.input_bytes
                );
                let mut input = vec![0u8; case.input_bytes];
                rng.fill(&mut input[..]);

                for variant in Variant::ALL {
                    if let Some(selected) = &selected
                        && !selected.contains(&variant)
                    {
                        continue;
                    }
                    if !variant.supports(&case.code) {
                        continue;
                    }
                    let report_record = run_variant(&case, variant, &input, &opts)?;
                    bench::log_throughput(&report_record);
                    report::write_record(&mut writer, &report_record)?;
                }
            }
            writer.flush()?;
        }
        Commands::Verify {
            trials,
            input_bytes,
            flip_rate,
            code,
            seed,
            output,
        } => {
            if trials == 0 {
                return Err(Error::config("Number of trials must be non-zero"));
            }
            if input_bytes == 0 {
                return Err(Error::config("Input size must be non-zero"));
            }
            if !(0.0..=1.0).contains(&flip_rate) {
                return Err(Error::config(format!(
                    "Flip rate must be within [0, 1] ({})",
                    flip_rate
                )));
            }

            let code = match code {
                Some(spec) => spec.parse::<ConvolutionalCode>()?,
                None => ConvolutionalCode::new(7, vec![0x6D, 0x4F])?,
            };
            let seed = seed.unwrap_or_else(|| rand::rng().random());

            info!("Code: {}", code);
            info!("Trials: {}", trials);
            info!("Input bytes per trial: {}", input_bytes);
            info!("Symbol flip rate: {}", flip_rate);
            info!("Seed: {}", seed);

            let verify_report = run_verify(
                &code,
                &VerifyOptions {
                    trials,
                    input_bytes,
                    flip_rate,
                    seed,
                },
            )?;

            let mut writer: Box<dyn Write> = match output {
                Some(file_path) => {
                    info!("Output file: {}", file_path);
                    Box::new(File::create(file_path)?)
                }
                None => Box::new(io::stdout()),
            };
            let json = serde_json::to_string_pretty(&verify_report)
                .map_err(|e| Error::parse(format!("JSON serialization failed: {}", e)))?;
            writeln!(writer, "{}", json)?;

            if verify_report.disagreements > 0 {
                return Err(Error::verify(format!(
                    "{} of {} trials disagreed across variants",
                    verify_report.disagreements, trials
                )));
            }
            info!(
                "All {} trials agreed across {} variants",
                trials,
                verify_report.variants.len()
            );
        }
    }
    Ok(())
}
