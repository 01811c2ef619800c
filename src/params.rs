//! Network parameters
//!
//! Equihash `(N, K)`, the derived solution size and the proof-of-work
//! ceiling for each supported network. These are plain values passed to the
//! codecs and the validator; nothing here is process-wide state.

use crate::types::Target;
use crate::{Error, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Networks with known consensus parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Main network, Equihash 200/9
    Mainnet,
    /// Test network, Equihash 200/9 with an easier ceiling
    Testnet,
    /// Regression test network, Equihash 48/5
    Regtest,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Testnet => write!(f, "testnet"),
            Network::Regtest => write!(f, "regtest"),
        }
    }
}

/// Equihash parameter set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EquihashParams {
    n: u32,
    k: u32,
}

impl EquihashParams {
    /// Default network parameters
    pub const MAINNET: Self = Self { n: 200, k: 9 };
    /// Reduced parameters used on regtest
    pub const REGTEST: Self = Self { n: 48, k: 5 };

    /// Create a parameter set, rejecting ones the solution codec cannot pack
    pub fn new(n: u32, k: u32) -> Result<Self> {
        if k == 0 || k >= 32 || n == 0 {
            return Err(Error::invalid_parameters(format!("n={} k={}", n, k)));
        }

        let params = Self { n, k };
        if params.element_bits() > 32 {
            return Err(Error::invalid_parameters(format!(
                "n={} k={} gives {}-bit indices, at most 32 supported",
                n,
                k,
                params.element_bits()
            )));
        }
        if (params.element_bits() as u64 * params.element_count() as u64) % 8 != 0 {
            return Err(Error::invalid_parameters(format!(
                "n={} k={} does not pack into whole bytes",
                n, k
            )));
        }

        Ok(params)
    }

    /// N
    pub fn n(&self) -> u32 {
        self.n
    }

    /// K
    pub fn k(&self) -> u32 {
        self.k
    }

    /// Bits per solution element: `N/(K+1) + 1`
    pub fn element_bits(&self) -> u32 {
        self.n / (self.k + 1) + 1
    }

    /// Elements per solution: `2^K`
    pub fn element_count(&self) -> usize {
        1usize << self.k
    }

    /// Packed solution size in bytes
    pub fn solution_size(&self) -> usize {
        self.element_bits() as usize * self.element_count() / 8
    }
}

/// Consensus parameters selected for one search session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainParams {
    /// Network the parameters belong to
    pub network: Network,
    /// Equihash parameter set
    pub equihash: EquihashParams,
    /// Largest target a `bits` value may encode
    pub pow_limit: Target,
}

impl ChainParams {
    /// Parameters for the given network
    pub fn for_network(network: Network) -> Self {
        let (equihash, limit) = match network {
            Network::Mainnet => (EquihashParams::MAINNET, ceiling(&[0x00, 0x07])),
            Network::Testnet => (EquihashParams::MAINNET, ceiling(&[0x07])),
            Network::Regtest => (EquihashParams::REGTEST, [0x0f; 32]),
        };

        Self {
            network,
            equihash,
            pow_limit: Target::from_be_bytes(&limit),
        }
    }

    /// Packed solution size in bytes
    pub fn solution_size(&self) -> usize {
        self.equihash.solution_size()
    }
}

/// Big-endian ceiling: the given leading bytes followed by 0xff
fn ceiling(prefix: &[u8]) -> [u8; 32] {
    let mut bytes = [0xffu8; 32];
    bytes[..prefix.len()].copy_from_slice(prefix);
    bytes
}
