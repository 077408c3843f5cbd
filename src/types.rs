//! Core transaction value types

use bytes::BufMut;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::address::Address;
use crate::constants::*;
use crate::covenant::Covenant;
use crate::encoding::{self, Reader};
use crate::error::Result;

/// Hash type: 256-bit hash
pub type Hash = [u8; 32];

/// Byte string type
pub type ByteString = Vec<u8>;

/// Reference to an output of a previous transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Outpoint {
    pub hash: Hash,
    pub index: u32,
}

impl Outpoint {
    pub fn new(hash: Hash, index: u32) -> Self {
        Self { hash, index }
    }

    /// The coinbase sentinel
    pub fn null() -> Self {
        Self { hash: ZERO_HASH, index: NULL_INDEX }
    }

    pub fn is_null(&self) -> bool {
        self.index == NULL_INDEX && self.hash == ZERO_HASH
    }

    pub fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_slice(&self.hash);
        buf.put_u32_le(self.index);
    }

    pub fn read(reader: &mut Reader<'_>) -> Result<Self> {
        let hash = reader.read_hash()?;
        let index = reader.read_u32()?;
        Ok(Self { hash, index })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(OUTPOINT_SIZE);
        self.write(&mut buf);
        buf
    }
}

impl Default for Outpoint {
    fn default() -> Self {
        Self::null()
    }
}

/// Witness stack of an input
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Witness {
    items: Vec<ByteString>,
}

impl Witness {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<ByteString>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[ByteString] {
        &self.items
    }

    pub fn push(&mut self, item: ByteString) {
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Last item, the redeem script for script-hash spends
    pub fn redeem(&self) -> Option<&[u8]> {
        self.items.last().map(|item| item.as_slice())
    }

    /// Size of the items with their length prefixes
    pub fn get_size(&self) -> usize {
        self.items
            .iter()
            .map(|item| encoding::varbytes_size(item.len()))
            .sum()
    }

    /// Size including the item count prefix
    pub fn get_var_size(&self) -> usize {
        encoding::varint_size(self.items.len() as u64) + self.get_size()
    }

    pub fn write<B: BufMut>(&self, buf: &mut B) {
        encoding::write_varint(buf, self.items.len() as u64);
        for item in &self.items {
            encoding::write_varbytes(buf, item);
        }
    }

    pub fn read(reader: &mut Reader<'_>) -> Result<Self> {
        let count = reader.read_count(1)?;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(reader.read_varbytes()?);
        }
        Ok(Self { items })
    }
}

/// Transaction input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
    pub prevout: Outpoint,
    pub sequence: u32,
    pub witness: Witness,
}

impl Input {
    /// Final input spending `prevout` with an empty witness
    pub fn new(prevout: Outpoint) -> Self {
        Self {
            prevout,
            sequence: SEQUENCE_FINAL,
            witness: Witness::new(),
        }
    }

    /// Base-region encoding: outpoint and sequence, never the witness
    pub fn write<B: BufMut>(&self, buf: &mut B) {
        self.prevout.write(buf);
        buf.put_u32_le(self.sequence);
    }

    pub fn read(reader: &mut Reader<'_>) -> Result<Self> {
        let prevout = Outpoint::read(reader)?;
        let sequence = reader.read_u32()?;
        Ok(Self {
            prevout,
            sequence,
            witness: Witness::new(),
        })
    }
}

impl Default for Input {
    fn default() -> Self {
        Self::new(Outpoint::null())
    }
}

/// Transaction output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub value: u64,
    pub address: Address,
    pub covenant: Covenant,
}

impl Output {
    /// Plain value transfer with no covenant
    pub fn new(value: u64, address: Address) -> Self {
        Self {
            value,
            address,
            covenant: Covenant::None,
        }
    }

    pub fn with_covenant(value: u64, address: Address, covenant: Covenant) -> Self {
        Self { value, address, covenant }
    }

    pub fn get_size(&self) -> usize {
        8 + self.address.get_size() + self.covenant.get_var_size()
    }

    pub fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_u64_le(self.value);
        self.address.write(buf);
        self.covenant.write(buf);
    }

    pub fn read(reader: &mut Reader<'_>) -> Result<Self> {
        let value = reader.read_u64()?;
        let address = Address::read(reader)?;
        let covenant = Covenant::read(reader)?;
        Ok(Self { value, address, covenant })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.get_size());
        self.write(&mut buf);
        buf
    }
}

/// Spendable coin handed to the builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub hash: Hash,
    pub index: u32,
    pub value: u64,
}

impl Utxo {
    pub fn outpoint(&self) -> Outpoint {
        Outpoint::new(self.hash, self.index)
    }
}

/// Lookup of previous outputs by outpoint
pub trait CoinView {
    fn get_output(&self, prevout: &Outpoint) -> Option<&Output>;

    fn has_entry(&self, prevout: &Outpoint) -> bool {
        self.get_output(prevout).is_some()
    }

    fn get_output_for(&self, input: &Input) -> Option<&Output> {
        self.get_output(&input.prevout)
    }
}

/// Coin Set: outpoint → previous output
pub type CoinSet = HashMap<Outpoint, Output>;

impl CoinView for CoinSet {
    fn get_output(&self, prevout: &Outpoint) -> Option<&Output> {
        self.get(prevout)
    }
}

/// Probabilistic set used for relevance filtering
pub trait BloomFilter {
    fn test(&self, data: &[u8]) -> bool;
    fn add(&mut self, data: &[u8]);
}
