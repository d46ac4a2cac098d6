//! High-throughput Viterbi decoding for binary convolutional codes.
//!
//! This crate provides:
//! - One generic decoding engine covering every benchmarked variant,
//!   parameterized by:
//!   - Metric precision (8-bit or 16-bit path metrics)
//!   - Branch-metric strategy (precomputed shared table or on-the-fly
//!     parity reduction)
//!   - Lane width (scalar reference up to 32-way chunks)
//! - The convolutional encoder feeding it tail-terminated soft symbol
//!   streams
//! - A benchmark harness timing `reset`/`update`/`chainback` independently
//!   over a fixed matrix of codes, and a verifier that cross-checks all
//!   variants for bit-exact agreement
//!
//! The decoder follows the classic butterfly add-compare-select structure
//! with periodic metric renormalization, so streams of arbitrary length
//! decode inside fixed-width integer metrics.
pub mod bench;
pub mod branch;
pub mod code;
pub mod decisions;
pub mod decoder;
pub mod encoder;
pub mod errors;
pub mod metrics;
pub mod precision;
pub mod report;
pub mod verify;
