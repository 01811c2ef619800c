//! Block header binary layout
//!
//! The 140-byte Equihash input header and the full block header, which
//! appends a compact-size prefixed solution. All integers are little-endian.

use crate::codec::compact_size::{compact_size_len, read_compact_size, write_compact_size};
use crate::crypto::double_sha256;
use crate::params::ChainParams;
use crate::types::Nonce;
use crate::{Error, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fmt;
use std::io::{Cursor, Read, Write};

/// Header without solution, as handed to Equihash solvers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquihashHeader {
    pub version: i32,
    pub hash_prev_block: [u8; 32],
    pub hash_merkle_root: [u8; 32],
    pub hash_reserved: [u8; 32],
    pub time: u32,
    /// Compact difficulty target
    pub bits: u32,
    pub nonce: Nonce,
}

impl EquihashHeader {
    /// Serialized size in bytes
    pub const SIZE: usize = 140;

    /// Version whose solution size is enforced
    pub const CURRENT_VERSION: i32 = 4;

    /// Genesis-style header: current version, no parent, no reserved hash
    pub fn new(hash_merkle_root: [u8; 32], time: u32, bits: u32, nonce: Nonce) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            hash_prev_block: [0u8; 32],
            hash_merkle_root,
            hash_reserved: [0u8; 32],
            time,
            bits,
            nonce,
        }
    }

    /// Copy of this header carrying another nonce
    pub fn with_nonce(&self, nonce: Nonce) -> Self {
        Self {
            nonce,
            ..self.clone()
        }
    }

    /// Write the fixed layout
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_i32::<LittleEndian>(self.version)?;
        writer.write_all(&self.hash_prev_block)?;
        writer.write_all(&self.hash_merkle_root)?;
        writer.write_all(&self.hash_reserved)?;
        writer.write_u32::<LittleEndian>(self.time)?;
        writer.write_u32::<LittleEndian>(self.bits)?;
        writer.write_all(self.nonce.as_bytes())
    }

    /// Read the fixed layout
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let version = reader
            .read_i32::<LittleEndian>()
            .map_err(|_| Error::truncated("header version", 4))?;
        let hash_prev_block = read_array(reader, "hashPrevBlock")?;
        let hash_merkle_root = read_array(reader, "hashMerkleRoot")?;
        let hash_reserved = read_array(reader, "hashReserved")?;
        let time = reader
            .read_u32::<LittleEndian>()
            .map_err(|_| Error::truncated("header time", 4))?;
        let bits = reader
            .read_u32::<LittleEndian>()
            .map_err(|_| Error::truncated("header bits", 4))?;
        let nonce = Nonce(read_array(reader, "header nonce")?);

        Ok(Self {
            version,
            hash_prev_block,
            hash_merkle_root,
            hash_reserved,
            time,
            bits,
            nonce,
        })
    }

    /// Serialize to the 140-byte layout
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::SIZE);
        // writes into a Vec cannot fail
        let _ = self.write_to(&mut bytes);
        bytes
    }

    /// Deserialize exactly one header
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let header = Self::read_from(&mut cursor)?;
        if bytes.len() != Self::SIZE {
            return Err(Error::length_mismatch("equihash header", Self::SIZE, bytes.len()));
        }
        Ok(header)
    }

    /// Proof-of-work hash: double SHA-256 of the serialized header
    pub fn pow_hash(&self) -> [u8; 32] {
        double_sha256(&self.serialize())
    }

    /// Hex of the serialized header, as passed on solver command lines
    pub fn to_hex(&self) -> String {
        hex::encode(self.serialize())
    }
}

impl fmt::Display for EquihashHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EquihashHeader(version={}, merkle={}, time={}, bits=0x{:08x}, nonce={})",
            self.version,
            crate::crypto::display_hash(&self.hash_merkle_root),
            self.time,
            self.bits,
            self.nonce
        )
    }
}

/// Full block header: Equihash header plus solution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    header: EquihashHeader,
    solution: Vec<u8>,
}

impl BlockHeader {
    /// Attach a solution, checking its size for current-version headers
    pub fn new(header: EquihashHeader, solution: Vec<u8>, params: &ChainParams) -> Result<Self> {
        if header.version == EquihashHeader::CURRENT_VERSION
            && solution.len() != params.solution_size()
        {
            return Err(Error::length_mismatch(
                "solution",
                params.solution_size(),
                solution.len(),
            ));
        }

        Ok(Self { header, solution })
    }

    /// Candidate built from a session header, a solver nonce and a solution
    pub fn from_equihash_header(
        header: &EquihashHeader,
        nonce: Nonce,
        solution: Vec<u8>,
        params: &ChainParams,
    ) -> Result<Self> {
        Self::new(header.with_nonce(nonce), solution, params)
    }

    /// Equihash part of the header
    pub fn header(&self) -> &EquihashHeader {
        &self.header
    }

    /// Packed solution bytes
    pub fn solution(&self) -> &[u8] {
        &self.solution
    }

    /// Header nonce
    pub fn nonce(&self) -> Nonce {
        self.header.nonce
    }

    /// Serialized size in bytes
    pub fn serialized_len(&self) -> usize {
        EquihashHeader::SIZE + compact_size_len(self.solution.len() as u64) + self.solution.len()
    }

    /// Write header, length prefix and solution
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        self.header.write_to(writer)?;
        write_compact_size(writer, self.solution.len() as u64)?;
        writer.write_all(&self.solution)
    }

    /// Serialize the full block header
    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.serialized_len());
        let _ = self.write_to(&mut bytes);
        bytes
    }

    /// Deserialize exactly one block header
    pub fn deserialize(bytes: &[u8], params: &ChainParams) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let header = EquihashHeader::read_from(&mut cursor)?;
        let declared = read_compact_size(&mut cursor)?;

        let rest = &bytes[cursor.position() as usize..];
        let len = usize::try_from(declared).unwrap_or(usize::MAX);
        if rest.len() < len {
            return Err(Error::truncated("solution", len - rest.len()));
        }
        if rest.len() > len {
            return Err(Error::length_mismatch(
                "block header",
                bytes.len() - (rest.len() - len),
                bytes.len(),
            ));
        }

        Self::new(header, rest.to_vec(), params)
    }

    /// Proof-of-work hash; the solution is not part of it
    pub fn pow_hash(&self) -> [u8; 32] {
        self.header.pow_hash()
    }

    /// Block hash over the full serialization, solution included
    pub fn block_hash(&self) -> [u8; 32] {
        double_sha256(&self.serialize())
    }
}

fn read_array<R: Read, const N: usize>(reader: &mut R, field: &str) -> Result<[u8; N]> {
    let mut buf = [0u8; N];
    reader
        .read_exact(&mut buf)
        .map_err(|_| Error::truncated(field, N))?;
    Ok(buf)
}
