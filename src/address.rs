//! Addresses: a version byte plus a witness program, with a bech32 string form

use bech32::primitives::decode::CheckedHrpstring;
use bech32::primitives::iter::{ByteIterExt, Fe32IterExt};
use bech32::{Bech32, Fe32, Hrp};
use bytes::BufMut;
use serde::{Deserialize, Serialize};

use crate::config::Network;
use crate::constants::*;
use crate::encoding::Reader;
use crate::error::{Result, TxError};
use crate::hash::blake2b160;
use crate::script::Script;
use crate::types::{ByteString, Witness};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    pub version: u8,
    pub hash: ByteString,
}

impl Address {
    /// Version 0 pubkey-hash address: BLAKE2b-160 of the public key
    pub fn from_pubkey(pubkey: &[u8]) -> Self {
        Self {
            version: 0,
            hash: blake2b160(pubkey).to_vec(),
        }
    }

    pub fn from_hash(hash: &[u8], version: u8) -> Result<Self> {
        if version > MAX_ADDRESS_VERSION {
            return Err(TxError::InvalidAddress(format!("bad version {}", version)));
        }
        if hash.len() < MIN_ADDRESS_SIZE || hash.len() > MAX_ADDRESS_SIZE {
            return Err(TxError::InvalidAddress(format!(
                "bad program length {}",
                hash.len()
            )));
        }
        Ok(Self {
            version,
            hash: hash.to_vec(),
        })
    }

    /// Parse a bech32 address, checking it belongs to `network`. Every
    /// version uses the original bech32 checksum.
    pub fn from_bech32(s: &str, network: Network) -> Result<Self> {
        let checked = CheckedHrpstring::new::<Bech32>(s)
            .map_err(|e| TxError::InvalidAddress(e.to_string()))?;
        let hrp = checked.hrp();
        if hrp.to_lowercase() != network.hrp() {
            return Err(TxError::InvalidAddress(format!(
                "network mismatch: expected {}, got {}",
                network.hrp(),
                hrp
            )));
        }

        let data = checked
            .data_part_ascii_no_checksum()
            .iter()
            .map(|&c| Fe32::from_char(c.into()))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| TxError::InvalidAddress(e.to_string()))?;
        let (version, program) = data
            .split_first()
            .ok_or_else(|| TxError::InvalidAddress("missing version".to_string()))?;
        let hash: Vec<u8> = program.iter().copied().fes_to_bytes().collect();
        let address = Self::from_hash(&hash, version.to_u8())?;

        // Leftover bits must be zero padding
        if address.to_bech32(network)? != s.to_lowercase() {
            return Err(TxError::InvalidAddress("non-canonical padding".to_string()));
        }
        Ok(address)
    }

    pub fn to_bech32(&self, network: Network) -> Result<String> {
        let hrp = Hrp::parse(network.hrp()).map_err(|e| TxError::InvalidAddress(e.to_string()))?;
        let version =
            Fe32::try_from(self.version).map_err(|e| TxError::InvalidAddress(e.to_string()))?;
        Ok(self
            .hash
            .iter()
            .copied()
            .bytes_to_fes()
            .with_checksum::<Bech32>(&hrp)
            .with_witness_version(version)
            .chars()
            .collect())
    }

    pub fn is_pubkeyhash(&self) -> bool {
        self.version == 0 && self.hash.len() == 20
    }

    pub fn is_scripthash(&self) -> bool {
        self.version == 0 && self.hash.len() == 32
    }

    /// Signature operations spent by `witness` against this address
    pub fn get_sigops(&self, witness: &Witness) -> usize {
        if self.is_pubkeyhash() {
            return 1;
        }
        if self.is_scripthash() {
            return match witness.redeem() {
                Some(redeem) => Script::from_raw(redeem.to_vec()).get_sigops(true),
                None => 0,
            };
        }
        0
    }

    pub fn get_size(&self) -> usize {
        2 + self.hash.len()
    }

    pub fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(self.version);
        buf.put_u8(self.hash.len() as u8);
        buf.put_slice(&self.hash);
    }

    pub fn read(reader: &mut Reader<'_>) -> Result<Self> {
        let version = reader.read_u8()?;
        let len = reader.read_u8()? as usize;
        let hash = reader.read_bytes(len)?;
        Self::from_hash(&hash, version).map_err(|e| TxError::Decode(e.to_string()))
    }
}
