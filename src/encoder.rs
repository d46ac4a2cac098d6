//! Shift-register convolutional encoder.
//!
//! Thin producer side of the benchmark: turns input bytes into the soft
//! symbol stream a decoder consumes. Bits are taken LSB-first within each
//! byte, and `k-1` zero tail bits drive the trellis back to state 0 so the
//! decoder can chain back from a known terminal state.
use crate::{
    code::{ConvolutionalCode, parity},
    precision::MetricPrecision,
};

/// Encoder state: the `k`-bit register holding the current input bit and
/// `k-1` bits of memory.
#[derive(Clone, Debug)]
pub struct ConvolutionalEncoder {
    code: ConvolutionalCode,
    register: u32,
}

impl ConvolutionalEncoder {
    pub fn new(code: &ConvolutionalCode) -> Self {
        ConvolutionalEncoder {
            code: code.clone(),
            register: 0,
        }
    }

    /// Shifts one input bit in and appends the `r` output bits.
    pub fn encode_bit(&mut self, bit: bool, out: &mut Vec<bool>) {
        self.register = ((self.register << 1) | u32::from(bit)) & self.code.register_mask();
        for &g in self.code.polynomials() {
            out.push(parity(self.register & g));
        }
    }

    /// Current trellis state (the `k-1` memory bits).
    pub fn state(&self) -> u32 {
        self.register & (self.code.num_states() as u32 - 1)
    }

    /// Returns the register to the all-zero state.
    pub fn reset(&mut self) {
        self.register = 0;
    }
}

/// Encodes `input` bytes into a tail-terminated soft symbol stream.
///
/// Each output bit is mapped to `high` (encoder emitted 1) or `low`
/// (encoder emitted 0). The result holds exactly
/// `(8*input.len() + k - 1) * r` symbols.
pub fn encode_to_symbols<P: MetricPrecision>(
    code: &ConvolutionalCode,
    input: &[u8],
    high: P::Soft,
    low: P::Soft,
) -> Vec<P::Soft> {
    let mut encoder = ConvolutionalEncoder::new(code);
    let mut symbols = Vec::with_capacity(code.transmit_symbols(input.len()));
    let mut bits = Vec::with_capacity(code.rate());

    let mut push = |encoder: &mut ConvolutionalEncoder, bit: bool, symbols: &mut Vec<P::Soft>| {
        bits.clear();
        encoder.encode_bit(bit, &mut bits);
        symbols.extend(bits.iter().map(|&b| if b { high } else { low }));
    };

    // MSB-first within each byte, matching the order chainback reassembles.
    for &byte in input {
        for i in (0..8).rev() {
            push(&mut encoder, (byte >> i) & 1 == 1, &mut symbols);
        }
    }
    for _ in 0..code.k() - 1 {
        push(&mut encoder, false, &mut symbols);
    }

    debug_assert_eq!(symbols.len(), code.transmit_symbols(input.len()));
    debug_assert_eq!(encoder.state(), 0);
    symbols
}
