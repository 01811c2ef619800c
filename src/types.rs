//! Core types for Equihash mining
//!
//! The 32-byte header nonce and the 256-bit difficulty target, with hex
//! encoding for logging and configuration.

use crate::{Error, Result};
use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sign bit of the compact mantissa
const COMPACT_SIGN_BIT: u32 = 0x0080_0000;
/// Mantissa bits of the compact encoding
const COMPACT_MANTISSA_MASK: u32 = 0x007f_ffff;

/// 32-byte header nonce
///
/// Bytes are kept in the order solvers print them. The integer value of a
/// nonce is the big-endian reading of those bytes; it is what the rolling
/// counter increments and what is passed to solvers that take a numeric
/// start nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Nonce(pub [u8; 32]);

impl Nonce {
    /// Nonce size in bytes
    pub const SIZE: usize = 32;

    /// All-zero nonce
    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Create from exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::length_mismatch("nonce", Self::SIZE, bytes.len()))?;
        Ok(Self(array))
    }

    /// Parse exactly 64 hex characters
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str)?;
        Self::from_slice(&bytes)
    }

    /// Parse up to 64 hex digits as an integer, padding leading zeros
    pub fn from_hex_padded(hex_str: &str) -> Result<Self> {
        let digits = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        if digits.len() > Self::SIZE * 2 {
            return Err(Error::length_mismatch(
                "nonce hex digits",
                Self::SIZE * 2,
                digits.len(),
            ));
        }
        Self::from_hex(&format!("{:0>64}", digits))
    }

    /// Get the nonce bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Integer value of the nonce (big-endian)
    pub fn to_biguint(&self) -> BigUint {
        BigUint::from_bytes_be(&self.0)
    }

    /// Increment by one in place, failing instead of wrapping
    pub fn increment(&mut self) -> Result<()> {
        for byte in self.0.iter_mut().rev() {
            let (next, carry) = byte.overflowing_add(1);
            *byte = next;
            if !carry {
                return Ok(());
            }
        }
        Err(Error::NonceOverflow)
    }

    /// Return the incremented nonce
    pub fn incremented(mut self) -> Result<Self> {
        self.increment()?;
        Ok(self)
    }

    /// Convert to hexadecimal string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Nonce {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Nonce {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Nonce::from_hex_padded(&s).map_err(serde::de::Error::custom)
    }
}

/// 256-bit difficulty target
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Target(BigUint);

impl Target {
    /// Target size in bytes
    pub const SIZE: usize = 32;

    /// Decode a compact `bits` value (`exponent:8 | mantissa:24`)
    ///
    /// The top mantissa bit is a sign flag; a negative or wider than 256 bit
    /// result is an [`Error::InvalidTarget`].
    pub fn from_compact(bits: u32) -> Result<Self> {
        let exponent = bits >> 24;
        let mantissa = bits & COMPACT_MANTISSA_MASK;

        if mantissa != 0 && bits & COMPACT_SIGN_BIT != 0 {
            return Err(Error::invalid_target(format!(
                "compact value 0x{:08x} is negative",
                bits
            )));
        }

        let value = if exponent <= 3 {
            BigUint::from(mantissa >> (8 * (3 - exponent)))
        } else {
            BigUint::from(mantissa) << (8 * (exponent - 3)) as usize
        };

        if value.bits() > 256 {
            return Err(Error::invalid_target(format!(
                "compact value 0x{:08x} overflows 256 bits",
                bits
            )));
        }

        Ok(Self(value))
    }

    /// Create from 32 big-endian bytes
    pub fn from_be_bytes(bytes: &[u8; 32]) -> Self {
        Self(BigUint::from_bytes_be(bytes))
    }

    /// Interpret a hash as a little-endian 256-bit integer
    pub fn from_hash(hash: &[u8; 32]) -> Self {
        Self(BigUint::from_bytes_le(hash))
    }

    /// Convert to 32 big-endian bytes
    pub fn to_be_bytes(&self) -> [u8; 32] {
        let digits = self.0.to_bytes_be();
        let mut bytes = [0u8; 32];
        let start = Self::SIZE.saturating_sub(digits.len());
        bytes[start..].copy_from_slice(&digits[digits.len().saturating_sub(Self::SIZE)..]);
        bytes
    }

    /// True for the zero target, which no hash can meet
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Check if a hash meets this target (`hash <= target`)
    pub fn is_met_by(&self, hash: &[u8; 32]) -> bool {
        Self::from_hash(hash) <= *self
    }

    /// Convert to hexadecimal string (big-endian for display)
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_be_bytes())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
