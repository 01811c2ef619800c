//! Binary encodings
//!
//! Bit-level packing used by Equihash solutions, the compact-size length
//! prefix used by block headers, and the solution codec built on both.

pub mod bits;
pub mod compact_size;
pub mod solution;

pub use bits::{BitReader, BitWriter};
pub use compact_size::{read_compact_size, write_compact_size};
pub use solution::SolutionCodec;
