//! Equihash solution packing
//!
//! A solution is `2^K` indices of `N/(K+1)+1` bits each, concatenated as
//! big-endian bit fields.

use super::bits::{BitReader, BitWriter};
use crate::params::EquihashParams;
use crate::{Error, Result};

/// Packs and unpacks solutions for one parameter set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolutionCodec {
    params: EquihashParams,
}

impl SolutionCodec {
    /// Create a codec for the given parameters
    pub fn new(params: EquihashParams) -> Self {
        Self { params }
    }

    /// Parameters this codec packs for
    pub fn params(&self) -> EquihashParams {
        self.params
    }

    /// Packed solution size in bytes
    pub fn solution_size(&self) -> usize {
        self.params.solution_size()
    }

    /// Pack `2^K` indices into the solution byte string
    pub fn pack(&self, values: &[u32]) -> Result<Vec<u8>> {
        let count = self.params.element_count();
        if values.len() != count {
            return Err(Error::length_mismatch("solution indices", count, values.len()));
        }

        let width = self.params.element_bits();
        let mut writer = BitWriter::with_capacity(count * width as usize);
        for &value in values {
            writer.write(value, width)?;
        }

        Ok(writer.finish())
    }

    /// Unpack a solution byte string into its indices
    pub fn unpack(&self, bytes: &[u8]) -> Result<Vec<u32>> {
        let size = self.solution_size();
        if bytes.len() != size {
            return Err(Error::length_mismatch("solution", size, bytes.len()));
        }

        let width = self.params.element_bits();
        let mut reader = BitReader::new(bytes);
        (0..self.params.element_count())
            .map(|_| reader.read(width))
            .collect()
    }
}
