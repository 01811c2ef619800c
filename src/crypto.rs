//! Hash primitives
//!
//! Double SHA-256 for header and transaction hashes, BLAKE2s for the
//! timestamp commitment embedded in the coinbase.

use blake2::Blake2s256;
use sha2::{Digest, Sha256};

/// SHA256(SHA256(data))
#[inline]
pub fn double_sha256(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    Sha256::digest(first).into()
}

/// BLAKE2s-256 of `data`
pub fn blake2s(data: &[u8]) -> [u8; 32] {
    Blake2s256::digest(data).into()
}

/// Hex of a hash in display order (byte-reversed)
pub fn display_hash(hash: &[u8; 32]) -> String {
    let mut reversed = *hash;
    reversed.reverse();
    hex::encode(reversed)
}
