//! Minimal contract ABI codec
//!
//! Covers the argument types the contracts in this crate exchange:
//! `address`, `uint256`, `bool`, `string` and `bytes`, using the standard
//! head/tail layout. Only static arguments are decoded.

use anyhow::{anyhow, Result};
use ethereum_types::{Address, H256, U256};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

pub fn keccak256(data: &[u8]) -> H256 {
    H256::from_slice(&Keccak256::digest(data))
}

/// First four bytes of `keccak256(signature)`
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash.as_bytes()[..4]);
    out
}

/// A single ABI value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Param {
    Address(Address),
    Uint(U256),
    Bool(bool),
    String(String),
    Bytes(Vec<u8>),
}

impl From<Address> for Param {
    fn from(a: Address) -> Self {
        Param::Address(a)
    }
}

impl From<U256> for Param {
    fn from(v: U256) -> Self {
        Param::Uint(v)
    }
}

impl From<u64> for Param {
    fn from(v: u64) -> Self {
        Param::Uint(U256::from(v))
    }
}

fn word_from_u256(v: U256) -> [u8; 32] {
    let mut w = [0u8; 32];
    v.to_big_endian(&mut w);
    w
}

fn word_from_address(a: Address) -> [u8; 32] {
    let mut w = [0u8; 32];
    w[12..].copy_from_slice(a.as_bytes());
    w
}

fn padded(data: &[u8]) -> Vec<u8> {
    let mut out = data.to_vec();
    let rem = out.len() % 32;
    if rem != 0 {
        out.resize(out.len() + 32 - rem, 0);
    }
    out
}

// Appends length + padded data to the tail and returns the offset word
fn dynamic_word(data: &[u8], head_len: usize, tail: &mut Vec<u8>) -> [u8; 32] {
    let offset = word_from_u256(U256::from(head_len + tail.len()));
    tail.extend_from_slice(&word_from_u256(U256::from(data.len())));
    tail.extend_from_slice(&padded(data));
    offset
}

/// `abi.encode(params...)`
pub fn encode(params: &[Param]) -> Vec<u8> {
    let head_len = params.len() * 32;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for param in params {
        let word = match param {
            Param::String(s) => dynamic_word(s.as_bytes(), head_len, &mut tail),
            Param::Bytes(b) => dynamic_word(b, head_len, &mut tail),
            Param::Address(a) => word_from_address(*a),
            Param::Uint(v) => word_from_u256(*v),
            Param::Bool(b) => word_from_u256(U256::from(*b as u8)),
        };
        head.extend_from_slice(&word);
    }

    head.extend_from_slice(&tail);
    head
}

/// Selector followed by the encoded arguments
pub fn encode_call(signature: &str, params: &[Param]) -> Vec<u8> {
    let mut out = selector(signature).to_vec();
    out.extend_from_slice(&encode(params));
    out
}

/// Sequential reader over static ABI words
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn word(&mut self) -> Result<&'a [u8]> {
        let end = self.pos + 32;
        if end > self.data.len() {
            return Err(anyhow!("ABI: calldata too short"));
        }
        let w = &self.data[self.pos..end];
        self.pos = end;
        Ok(w)
    }

    pub fn uint(&mut self) -> Result<U256> {
        Ok(U256::from_big_endian(self.word()?))
    }

    /// A `uint256` that must fit in 64 bits
    pub fn u64(&mut self) -> Result<u64> {
        let v = self.uint()?;
        if v > U256::from(u64::MAX) {
            return Err(anyhow!("ABI: uint does not fit in 64 bits"));
        }
        Ok(v.low_u64())
    }

    pub fn address(&mut self) -> Result<Address> {
        let w = self.word()?;
        if w[..12].iter().any(|b| *b != 0) {
            return Err(anyhow!("ABI: dirty address word"));
        }
        Ok(Address::from_slice(&w[12..]))
    }

    pub fn bool(&mut self) -> Result<bool> {
        match self.uint()? {
            v if v.is_zero() => Ok(false),
            v if v == U256::one() => Ok(true),
            _ => Err(anyhow!("ABI: invalid bool")),
        }
    }
}
