//! Proof-of-work validation
//!
//! A header's proof-of-work hash, read as a little-endian 256-bit integer,
//! must not exceed the target encoded by its `bits`. The target itself must be
//! non-zero and no easier than the network ceiling.

use crate::header::BlockHeader;
use crate::params::ChainParams;
use crate::types::Target;
use crate::{Error, Result};

/// Target decoded from `bits` and checked against the network ceiling
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DifficultyTarget {
    bits: u32,
    target: Target,
}

impl DifficultyTarget {
    /// Decode and range-check a compact target
    pub fn from_compact(bits: u32, params: &ChainParams) -> Result<Self> {
        let target = Target::from_compact(bits)?;

        if target.is_zero() {
            return Err(Error::invalid_target(format!("bits 0x{:08x} encode zero", bits)));
        }
        if target > params.pow_limit {
            return Err(Error::invalid_target(format!(
                "bits 0x{:08x} exceed the {} proof-of-work limit",
                bits, params.network
            )));
        }

        Ok(Self { bits, target })
    }

    /// Compact encoding this target was built from
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Decoded 256-bit target
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Check a proof-of-work hash against the target
    pub fn verify_hash(&self, hash: &[u8; 32]) -> Result<()> {
        if self.target.is_met_by(hash) {
            Ok(())
        } else {
            Err(Error::HashAboveTarget {
                hash: crate::crypto::display_hash(hash),
                target: self.target.to_hex(),
            })
        }
    }

    /// True if the candidate's proof-of-work hash meets the target
    pub fn is_met_by(&self, candidate: &BlockHeader) -> bool {
        self.verify_hash(&candidate.pow_hash()).is_ok()
    }
}

/// Validate `hash` against `bits`, reporting why it fails
pub fn verify_proof_of_work(hash: &[u8; 32], bits: u32, params: &ChainParams) -> Result<()> {
    DifficultyTarget::from_compact(bits, params)?.verify_hash(hash)
}

/// Validate `hash` against `bits`; invalid targets are simply rejected
pub fn check_proof_of_work(hash: &[u8; 32], bits: u32, params: &ChainParams) -> bool {
    verify_proof_of_work(hash, bits, params).is_ok()
}
