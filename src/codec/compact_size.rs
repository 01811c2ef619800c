//! Compact variable-length integers
//!
//! One byte for values up to 0xfc, otherwise a 0xfd/0xfe/0xff marker followed
//! by a little-endian u16/u32/u64.

use crate::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Encoded size of `n` in bytes
pub fn compact_size_len(n: u64) -> usize {
    match n {
        0..=0xfc => 1,
        0xfd..=0xffff => 3,
        0x1_0000..=0xffff_ffff => 5,
        _ => 9,
    }
}

/// Write `n` as a compact size
pub fn write_compact_size<W: Write>(writer: &mut W, n: u64) -> std::io::Result<()> {
    match n {
        0..=0xfc => writer.write_u8(n as u8),
        0xfd..=0xffff => {
            writer.write_u8(0xfd)?;
            writer.write_u16::<LittleEndian>(n as u16)
        }
        0x1_0000..=0xffff_ffff => {
            writer.write_u8(0xfe)?;
            writer.write_u32::<LittleEndian>(n as u32)
        }
        _ => {
            writer.write_u8(0xff)?;
            writer.write_u64::<LittleEndian>(n)
        }
    }
}

/// Read a compact size
pub fn read_compact_size<R: Read>(reader: &mut R) -> Result<u64> {
    let marker = reader
        .read_u8()
        .map_err(|_| Error::truncated("compact size", 1))?;

    let value = match marker {
        0xfd => reader.read_u16::<LittleEndian>().map(u64::from),
        0xfe => reader.read_u32::<LittleEndian>().map(u64::from),
        0xff => reader.read_u64::<LittleEndian>(),
        small => return Ok(u64::from(small)),
    };

    value.map_err(|_| Error::truncated("compact size", compact_size_len_for_marker(marker)))
}

fn compact_size_len_for_marker(marker: u8) -> usize {
    match marker {
        0xfd => 2,
        0xfe => 4,
        _ => 8,
    }
}
