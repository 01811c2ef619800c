//! Genesis block header construction
//!
//! Builds the coinbase transaction carrying the timestamp commitment, takes
//! its txid as the merkle root and fills in the Equihash header the solver
//! will work on.

use crate::codec::write_compact_size;
use crate::crypto::{blake2s, double_sha256};
use crate::explorer::{Coin, LatestBlockSource};
use crate::header::EquihashHeader;
use crate::types::Nonce;
use crate::Result;
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::Write;
use tracing::debug;

/// Coin name prefixed to the timestamp hash
pub const DEFAULT_COIN_NAME: &str = "Zcash";

/// Headline committed to by the Zcash mainnet genesis block
pub const DEFAULT_TIMESTAMP: &str = "The Economist 2016-10-29 Known unknown: Another crypto-currency is born. BTC#436254 0000000000000000044f321997f336d2908cf8c8d6893e88dbf067e2d949487d ETH#2521903 483039a6b6bd8bd05f0584f9a078d075e454925eb71c1f13eaff59b405a721bb DJIA close on 27 Oct 2016: 18,169.68";

/// Public key paid by the genesis coinbase output
pub const DEFAULT_PUBKEY: &str = "04678afdb0fe5548271967f1a67130b7105cd6a828e03909a67962e0ea1f61deb649f6bc3f4cef38c4f35504e51ec112de5c384df7ba0b8d578a4c702b6bf11d5f";

/// Difficulty-1 compact target
pub const DEFAULT_BITS: u32 = 0x1f07ffff;

const OP_0: u8 = 0x00;
const OP_PUSHDATA1: u8 = 0x4c;
const OP_PUSHDATA2: u8 = 0x4d;
const OP_PUSHDATA4: u8 = 0x4e;
const OP_1NEGATE: u8 = 0x4f;
const OP_1: u8 = 0x51;
const OP_CHECKSIG: u8 = 0xac;

/// Minimal script assembler
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script(Vec<u8>);

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an integer the way script numbers are pushed
    pub fn push_int(mut self, value: i64) -> Self {
        match value {
            0 => self.0.push(OP_0),
            -1 => self.0.push(OP_1NEGATE),
            1..=16 => self.0.push(OP_1 + (value as u8 - 1)),
            _ => return self.push_data(&script_num(value)),
        }
        self
    }

    /// Push raw bytes with the shortest push opcode
    pub fn push_data(mut self, data: &[u8]) -> Self {
        let len = data.len();
        if len < OP_PUSHDATA1 as usize {
            self.0.push(len as u8);
        } else if len <= 0xff {
            self.0.push(OP_PUSHDATA1);
            self.0.push(len as u8);
        } else if len <= 0xffff {
            self.0.push(OP_PUSHDATA2);
            self.0.extend_from_slice(&(len as u16).to_le_bytes());
        } else {
            self.0.push(OP_PUSHDATA4);
            self.0.extend_from_slice(&(len as u32).to_le_bytes());
        }
        self.0.extend_from_slice(data);
        self
    }

    pub fn push_opcode(mut self, opcode: u8) -> Self {
        self.0.push(opcode);
        self
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Minimal little-endian sign-magnitude encoding
fn script_num(value: i64) -> Vec<u8> {
    let negative = value < 0;
    let mut magnitude = value.unsigned_abs();
    let mut bytes = Vec::new();
    while magnitude > 0 {
        bytes.push((magnitude & 0xff) as u8);
        magnitude >>= 8;
    }

    if let Some(last) = bytes.last_mut() {
        if *last & 0x80 != 0 {
            bytes.push(if negative { 0x80 } else { 0x00 });
        } else if negative {
            *last |= 0x80;
        }
    }
    bytes
}

/// Everything that goes into the genesis header besides the solution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenesisParams {
    pub psz_timestamp: String,
    pub pubkey: Vec<u8>,
    pub bits: u32,
    /// First scriptSig push; `bits` when unset or zero
    pub extra_nonce: Option<i64>,
    /// Output value in zatoshi
    pub value: i64,
    pub time: u32,
    pub nonce: Nonce,
}

/// Single-input, single-output coinbase transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinbaseTransaction {
    pub script_sig: Script,
    pub script_pubkey: Script,
    pub value: i64,
}

impl CoinbaseTransaction {
    const VERSION: i32 = 1;
    const SEQUENCE_FINAL: u32 = 0xffff_ffff;
    const NULL_INDEX: u32 = 0xffff_ffff;

    /// Coinbase committing to `psz_timestamp` and paying `pubkey`
    pub fn new(params: &GenesisParams) -> Self {
        let extra_nonce = params
            .extra_nonce
            .filter(|n| *n != 0)
            .unwrap_or(i64::from(params.bits));
        let script_sig = Script::new()
            .push_int(extra_nonce)
            .push_data(&[0x04])
            .push_data(params.psz_timestamp.as_bytes());
        let script_pubkey = Script::new()
            .push_data(&params.pubkey)
            .push_opcode(OP_CHECKSIG);

        Self {
            script_sig,
            script_pubkey,
            value: params.value,
        }
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_i32::<LittleEndian>(Self::VERSION)?;

        write_compact_size(writer, 1)?;
        writer.write_all(&[0u8; 32])?;
        writer.write_u32::<LittleEndian>(Self::NULL_INDEX)?;
        write_compact_size(writer, self.script_sig.as_bytes().len() as u64)?;
        writer.write_all(self.script_sig.as_bytes())?;
        writer.write_u32::<LittleEndian>(Self::SEQUENCE_FINAL)?;

        write_compact_size(writer, 1)?;
        writer.write_i64::<LittleEndian>(self.value)?;
        write_compact_size(writer, self.script_pubkey.as_bytes().len() as u64)?;
        writer.write_all(self.script_pubkey.as_bytes())?;

        // lock time
        writer.write_u32::<LittleEndian>(0)
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        let _ = self.write_to(&mut bytes);
        bytes
    }

    pub fn txid(&self) -> [u8; 32] {
        double_sha256(&self.serialize())
    }
}

/// `coin_name` followed by the hex BLAKE2s-256 of `timestamp`
pub fn psz_timestamp(coin_name: &str, timestamp: &str) -> String {
    format!("{}{}", coin_name, hex::encode(blake2s(timestamp.as_bytes())))
}

/// Tickers of `{XYZ}` tokens, three upper-case letters each
pub fn coin_tokens(timestamp: &str) -> Vec<&str> {
    let bytes = timestamp.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i + 5 <= bytes.len() {
        let window = &bytes[i..i + 5];
        if window[0] == b'{' && window[4] == b'}' && window[1..4].iter().all(u8::is_ascii_uppercase) {
            tokens.push(&timestamp[i + 1..i + 4]);
            i += 5;
        } else {
            i += 1;
        }
    }
    tokens
}

/// Replace every `{XYZ}` token with the latest block of that coin
pub async fn substitute_tokens(timestamp: &str, source: &dyn LatestBlockSource) -> Result<String> {
    let mut resolved = timestamp.to_string();
    for ticker in coin_tokens(timestamp) {
        let token = format!("{{{}}}", ticker);
        if !resolved.contains(&token) {
            continue;
        }
        let coin: Coin = ticker.parse()?;
        let block = source.latest_block(coin).await?;
        resolved = resolved.replace(&token, &block.token_text(coin));
    }
    debug!("Timestamp after substitution: {}", resolved);
    Ok(resolved)
}

/// Equihash header for the genesis block described by `params`
pub fn build_header(params: &GenesisParams) -> EquihashHeader {
    let coinbase = CoinbaseTransaction::new(params);
    let merkle_root = coinbase.txid();
    debug!(
        "TX/merkle root hash: {}",
        crate::crypto::display_hash(&merkle_root)
    );

    EquihashHeader::new(merkle_root, params.time, params.bits, params.nonce)
}
