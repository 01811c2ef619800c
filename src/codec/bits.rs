//! Big-endian bit packing
//!
//! Fields are written most significant bit first with no alignment between
//! them, so a 9-bit field may start in the middle of a byte.

use crate::{Error, Result};

/// Widest field either side supports
pub const MAX_FIELD_BITS: u32 = 32;

fn mask(bits: u32) -> u64 {
    (1u64 << bits) - 1
}

/// Writes fixed-width fields into a byte buffer
#[derive(Debug, Default)]
pub struct BitWriter {
    bytes: Vec<u8>,
    acc: u64,
    acc_bits: u32,
}

impl BitWriter {
    /// Create an empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer expecting `bits` bits of output
    pub fn with_capacity(bits: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bits.div_ceil(8)),
            ..Self::default()
        }
    }

    /// Append the low `width` bits of `value`
    pub fn write(&mut self, value: u32, width: u32) -> Result<()> {
        if width > MAX_FIELD_BITS || (width < 32 && u64::from(value) > mask(width)) {
            return Err(Error::ValueOutOfRange {
                value: u64::from(value),
                bits: width,
            });
        }

        self.acc = (self.acc << width) | u64::from(value);
        self.acc_bits += width;
        while self.acc_bits >= 8 {
            self.acc_bits -= 8;
            self.bytes.push((self.acc >> self.acc_bits) as u8);
        }
        self.acc &= mask(self.acc_bits);

        Ok(())
    }

    /// Number of bits written so far
    pub fn bit_len(&self) -> usize {
        self.bytes.len() * 8 + self.acc_bits as usize
    }

    /// Flush, zero-padding a trailing partial byte
    pub fn finish(mut self) -> Vec<u8> {
        if self.acc_bits > 0 {
            self.bytes.push((self.acc << (8 - self.acc_bits)) as u8);
        }
        self.bytes
    }
}

/// Reads fixed-width fields from a byte slice
#[derive(Debug)]
pub struct BitReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    acc: u64,
    acc_bits: u32,
}

impl<'a> BitReader<'a> {
    /// Create a reader over `bytes`
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            pos: 0,
            acc: 0,
            acc_bits: 0,
        }
    }

    /// Read the next `width`-bit field
    pub fn read(&mut self, width: u32) -> Result<u32> {
        if width > MAX_FIELD_BITS {
            return Err(Error::ValueOutOfRange {
                value: u64::from(width),
                bits: MAX_FIELD_BITS,
            });
        }

        while self.acc_bits < width {
            let byte = *self.bytes.get(self.pos).ok_or_else(|| {
                Error::truncated("bit field", (width - self.acc_bits).div_ceil(8) as usize)
            })?;
            self.acc = (self.acc << 8) | u64::from(byte);
            self.acc_bits += 8;
            self.pos += 1;
        }

        self.acc_bits -= width;
        let value = (self.acc >> self.acc_bits) & mask(width);
        self.acc &= mask(self.acc_bits);

        Ok(value as u32)
    }

    /// Bits not yet consumed
    pub fn remaining_bits(&self) -> usize {
        (self.bytes.len() - self.pos) * 8 + self.acc_bits as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_unaligned_fields() {
        let mut writer = BitWriter::new();
        writer.write(1, 9).unwrap();
        writer.write(0b1_1111_1111, 9).unwrap();
        writer.write(0, 6).unwrap();
        assert_eq!(writer.bit_len(), 24);

        // 000000001 111111111 000000
        assert_eq!(writer.finish(), vec![0x00, 0xff, 0xc0]);
    }

    #[test]
    fn test_partial_byte_padding() {
        let mut writer = BitWriter::new();
        writer.write(0b101, 3).unwrap();
        assert_eq!(writer.finish(), vec![0b1010_0000]);
    }

    #[test]
    fn test_value_out_of_range() {
        let mut writer = BitWriter::new();
        assert_matches!(
            writer.write(512, 9),
            Err(Error::ValueOutOfRange { value: 512, bits: 9 })
        );
        assert!(writer.write(u32::MAX, 32).is_ok());
    }

    #[test]
    fn test_reader() {
        let bytes = [0x00, 0xff, 0xc0];
        let mut reader = BitReader::new(&bytes);
        assert_eq!(reader.read(9).unwrap(), 1);
        assert_eq!(reader.read(9).unwrap(), 511);
        assert_eq!(reader.remaining_bits(), 6);
        assert_eq!(reader.read(6).unwrap(), 0);
        assert_matches!(reader.read(1), Err(Error::TruncatedInput { .. }));
    }

    #[test]
    fn test_wide_fields() {
        let mut writer = BitWriter::new();
        writer.write(0xdead_beef, 32).unwrap();
        writer.write(0x1f_ffff, 21).unwrap();
        let bytes = writer.finish();

        let mut reader = BitReader::new(&bytes);
        assert_eq!(reader.read(32).unwrap(), 0xdead_beef);
        assert_eq!(reader.read(21).unwrap(), 0x1f_ffff);
    }
}
