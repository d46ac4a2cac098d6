//! Structures for working with binary convolutional codes.
//!
//! This module provides:
//! - Core convolutional code parameters including:
//!   - Constraint length (`k`)
//!   - Code rate (`r`), the number of output symbols per input bit
//!   - Generator polynomials, one per output symbol
//! - The parity reduction that defines the encoder output: a transition from
//!   state `s` on input bit `b` emits, for each polynomial `g`, the even
//!   parity of `(2*s | b) & g`.
use std::{fmt, str::FromStr};

use crate::errors::{Error, Result};

/// Descriptor of a rate `1/r` binary convolutional code.
///
/// The trellis has `2^(k-1)` states. The descriptor is immutable once
/// constructed; every decoder built from it keeps the same state space for
/// its whole lifetime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConvolutionalCode {
    /// Constraint length (encoder memory + 1)
    k: usize,
    /// Code rate: output symbols per input bit
    r: usize,
    /// Generator polynomials, `k` bits wide each
    polynomials: Vec<u32>,
}

impl ConvolutionalCode {
    /// Creates a new `ConvolutionalCode` with parameter validation.
    ///
    /// # Arguments
    /// * `k` - Constraint length, `2..=32`
    /// * `polynomials` - One generator polynomial per output symbol; each must
    ///   fit in `k` bits and tap both the newest input bit (bit 0) and the
    ///   oldest register bit (bit `k-1`)
    ///
    /// # Errors
    /// Returns `Error::Config` if parameters are invalid. The bit-0 and
    /// bit-`k-1` tap requirements are what make the butterfly complement
    /// trick exact, so they are enforced here rather than assumed downstream.
    pub fn new(k: usize, polynomials: Vec<u32>) -> Result<Self> {
        if !(2..=32).contains(&k) {
            return Err(Error::config(format!(
                "Constraint length ({}) must be between 2 and 32",
                k
            )));
        }
        if polynomials.is_empty() {
            return Err(Error::config("At least one generator polynomial required"));
        }
        let width_mask = u32::MAX >> (32 - k);
        for (i, &g) in polynomials.iter().enumerate() {
            if g & !width_mask != 0 {
                return Err(Error::config(format!(
                    "Polynomial {} ({:#o}) does not fit in {} bits",
                    i, g, k
                )));
            }
            if g & 1 == 0 {
                return Err(Error::config(format!(
                    "Polynomial {} ({:#o}) must tap the input bit (bit 0)",
                    i, g
                )));
            }
            if g >> (k - 1) == 0 {
                return Err(Error::config(format!(
                    "Polynomial {} ({:#o}) must tap the oldest register bit (bit {})",
                    i,
                    g,
                    k - 1
                )));
            }
        }

        let r = polynomials.len();
        Ok(ConvolutionalCode { k, r, polynomials })
    }

    /// Constraint length.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Code rate (output symbols per input bit).
    pub fn rate(&self) -> usize {
        self.r
    }

    /// Generator polynomials.
    pub fn polynomials(&self) -> &[u32] {
        &self.polynomials
    }

    /// Number of trellis states: `2^(k-1)`.
    pub fn num_states(&self) -> usize {
        1 << (self.k - 1)
    }

    /// Number of butterfly pairs: `2^(k-2)`. Pair `s` groups the two
    /// predecessors `(s, s + 2^(k-2))` of successors `(2s, 2s+1)`.
    pub fn pair_states(&self) -> usize {
        self.num_states() / 2
    }

    /// Mask selecting the `k` register bits.
    pub fn register_mask(&self) -> u32 {
        u32::MAX >> (32 - self.k)
    }

    /// Number of symbols produced by encoding `input_bytes` bytes and
    /// draining the trellis tail: `(8*input_bytes + k - 1) * r`.
    pub fn transmit_symbols(&self, input_bytes: usize) -> usize {
        (8 * input_bytes + self.k - 1) * self.r
    }
}

impl fmt::Display for ConvolutionalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "K={} R={} poly=[", self.k, self.r)?;
        for (i, g) in self.polynomials.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{:#o}", g)?;
        }
        write!(f, "]")
    }
}

impl FromStr for ConvolutionalCode {
    type Err = Error;

    /// Parses a code spec of the form `K:R:poly,poly,...`.
    ///
    /// Polynomials accept `0x`/`0o`/`0b` prefixes or plain decimal, e.g.
    /// `7:2:0x6D,0x4F`.
    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split(':');
        let k = parts
            .next()
            .ok_or_else(|| Error::parse("Missing constraint length"))?
            .trim()
            .parse::<usize>()
            .map_err(|e| Error::parse(format!("Invalid constraint length: {}", e)))?;
        let r = parts
            .next()
            .ok_or_else(|| Error::parse("Missing code rate"))?
            .trim()
            .parse::<usize>()
            .map_err(|e| Error::parse(format!("Invalid code rate: {}", e)))?;
        let poly_list = parts
            .next()
            .ok_or_else(|| Error::parse("Missing polynomial list"))?;
        if parts.next().is_some() {
            return Err(Error::parse("Expected exactly K:R:poly,poly,..."));
        }

        let polynomials = poly_list
            .split(',')
            .map(|p| parse_polynomial(p.trim()))
            .collect::<Result<Vec<u32>>>()?;
        if polynomials.len() != r {
            return Err(Error::parse(format!(
                "Code rate {} does not match {} polynomials",
                r,
                polynomials.len()
            )));
        }

        ConvolutionalCode::new(k, polynomials)
    }
}

fn parse_polynomial(s: &str) -> Result<u32> {
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16)
    } else if let Some(oct) = s.strip_prefix("0o").or_else(|| s.strip_prefix("0O")) {
        u32::from_str_radix(oct, 8)
    } else if let Some(bin) = s.strip_prefix("0b").or_else(|| s.strip_prefix("0B")) {
        u32::from_str_radix(bin, 2)
    } else {
        s.parse::<u32>()
    };
    parsed.map_err(|e| Error::parse(format!("Invalid polynomial '{}': {}", s, e)))
}

/// Even parity of a word, reduced by successive XOR folding.
///
/// Each fold halves the width that still carries information; after folding
/// down to one bit, bit 0 holds the parity. This is the same reduction the
/// tableless branch provider applies lane-wise.
pub fn parity(word: u32) -> bool {
    let mut x = word;
    x ^= x >> 16;
    x ^= x >> 8;
    x ^= x >> 4;
    x ^= x >> 2;
    x ^= x >> 1;
    x & 1 == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parity_matches_popcount() {
        for word in [0u32, 1, 0x6D, 0x4F, 0xFFFF_FFFF, 0x8000_0001, 12345678] {
            assert_eq!(parity(word), word.count_ones() % 2 == 1, "word {:#x}", word);
        }
    }

    #[test]
    fn accepts_standard_codes() {
        let code = ConvolutionalCode::new(7, vec![0x6D, 0x4F]).unwrap();
        assert_eq!(code.num_states(), 64);
        assert_eq!(code.pair_states(), 32);
        assert_eq!(code.rate(), 2);
        assert_eq!(code.transmit_symbols(1024), (8 * 1024 + 6) * 2);

        ConvolutionalCode::new(24, vec![0o62650457, 0o62650455]).unwrap();
        ConvolutionalCode::new(15, vec![0o42631, 0o47245, 0o56507, 0o73363, 0o77267, 0o64537])
            .unwrap();
    }

    #[test]
    fn rejects_bad_parameters() {
        assert!(ConvolutionalCode::new(1, vec![1]).is_err());
        assert!(ConvolutionalCode::new(33, vec![1]).is_err());
        assert!(ConvolutionalCode::new(7, vec![]).is_err());
        // does not fit in 7 bits
        assert!(ConvolutionalCode::new(7, vec![0x16D, 0x4F]).is_err());
        // missing input tap (even polynomial)
        assert!(ConvolutionalCode::new(7, vec![0x6C, 0x4F]).is_err());
        // missing oldest-bit tap
        assert!(ConvolutionalCode::new(7, vec![0x2D, 0x4F]).is_err());
    }

    #[test]
    fn parses_code_specs() {
        let code: ConvolutionalCode = "7:2:0x6D,0x4F".parse().unwrap();
        assert_eq!(code.k(), 7);
        assert_eq!(code.polynomials(), &[0x6D, 0x4F]);

        let code: ConvolutionalCode = "9:4:501,441,331,315".parse().unwrap();
        assert_eq!(code.rate(), 4);

        let code: ConvolutionalCode = "15:6:0o42631,0o47245,0o56507,0o73363,0o77267,0o64537"
            .parse()
            .unwrap();
        assert_eq!(code.num_states(), 1 << 14);

        assert!("7:3:0x6D,0x4F".parse::<ConvolutionalCode>().is_err());
        assert!("7:2".parse::<ConvolutionalCode>().is_err());
        assert!("x:2:1,1".parse::<ConvolutionalCode>().is_err());
    }
}
