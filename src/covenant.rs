//! Name covenants attached to outputs.
//!
//! On the wire a covenant is a type byte followed by a list of opaque
//! items ([`RawCovenant`]). [`Covenant`] gives each type its typed fields
//! and converts to and from the raw form.

use bytes::BufMut;
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::encoding::{self, Reader};
use crate::error::{Result, TxError};
use crate::types::{BloomFilter, ByteString, Hash};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CovenantType {
    None = 0,
    Claim = 1,
    Open = 2,
    Bid = 3,
    Reveal = 4,
    Redeem = 5,
    Register = 6,
    Update = 7,
    Renew = 8,
    Transfer = 9,
    Finalize = 10,
    Revoke = 11,
}

impl CovenantType {
    pub fn from_u8(value: u8) -> Option<Self> {
        let kind = match value {
            0 => CovenantType::None,
            1 => CovenantType::Claim,
            2 => CovenantType::Open,
            3 => CovenantType::Bid,
            4 => CovenantType::Reveal,
            5 => CovenantType::Redeem,
            6 => CovenantType::Register,
            7 => CovenantType::Update,
            8 => CovenantType::Renew,
            9 => CovenantType::Transfer,
            10 => CovenantType::Finalize,
            11 => CovenantType::Revoke,
            _ => return None,
        };
        Some(kind)
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Wire form: type byte and opaque items
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCovenant {
    pub kind: u8,
    pub items: Vec<ByteString>,
}

impl RawCovenant {
    pub fn get_var_size(&self) -> usize {
        1 + encoding::varint_size(self.items.len() as u64)
            + self
                .items
                .iter()
                .map(|item| encoding::varbytes_size(item.len()))
                .sum::<usize>()
    }

    pub fn write<B: BufMut>(&self, buf: &mut B) {
        buf.put_u8(self.kind);
        encoding::write_varint(buf, self.items.len() as u64);
        for item in &self.items {
            encoding::write_varbytes(buf, item);
        }
    }

    pub fn read(reader: &mut Reader<'_>) -> Result<Self> {
        let kind = reader.read_u8()?;
        let count = reader.read_count(1)?;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(reader.read_varbytes()?);
        }
        Ok(Self { kind, items })
    }

    /// True if any non-empty item is in the filter
    pub fn test<F: BloomFilter + ?Sized>(&self, filter: &F) -> bool {
        self.items
            .iter()
            .any(|item| !item.is_empty() && filter.test(item))
    }
}

/// Typed covenant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Covenant {
    #[default]
    None,
    Claim {
        name_hash: Hash,
        height: u32,
        name: ByteString,
        flags: u8,
        claim_hash: Hash,
        commit_height: u32,
    },
    Open {
        name_hash: Hash,
        height: u32,
        name: ByteString,
    },
    Bid {
        name_hash: Hash,
        height: u32,
        name: ByteString,
        blind: Hash,
    },
    Reveal {
        name_hash: Hash,
        height: u32,
        nonce: Hash,
    },
    Redeem {
        name_hash: Hash,
        height: u32,
    },
    Register {
        name_hash: Hash,
        height: u32,
        resource: ByteString,
        block_hash: Hash,
    },
    Update {
        name_hash: Hash,
        height: u32,
        resource: ByteString,
    },
    Renew {
        name_hash: Hash,
        height: u32,
        block_hash: Hash,
    },
    Transfer {
        name_hash: Hash,
        height: u32,
        address: Address,
    },
    Finalize {
        name_hash: Hash,
        height: u32,
        name: ByteString,
        flags: u8,
        claimed: u32,
        renewals: u32,
        block_hash: Hash,
    },
    Revoke {
        name_hash: Hash,
        height: u32,
    },
    /// Type code not known to this crate, kept verbatim
    Unknown(RawCovenant),
}

impl Covenant {
    /// Wire type code
    pub fn kind(&self) -> u8 {
        match self {
            Covenant::None => CovenantType::None.as_u8(),
            Covenant::Claim { .. } => CovenantType::Claim.as_u8(),
            Covenant::Open { .. } => CovenantType::Open.as_u8(),
            Covenant::Bid { .. } => CovenantType::Bid.as_u8(),
            Covenant::Reveal { .. } => CovenantType::Reveal.as_u8(),
            Covenant::Redeem { .. } => CovenantType::Redeem.as_u8(),
            Covenant::Register { .. } => CovenantType::Register.as_u8(),
            Covenant::Update { .. } => CovenantType::Update.as_u8(),
            Covenant::Renew { .. } => CovenantType::Renew.as_u8(),
            Covenant::Transfer { .. } => CovenantType::Transfer.as_u8(),
            Covenant::Finalize { .. } => CovenantType::Finalize.as_u8(),
            Covenant::Revoke { .. } => CovenantType::Revoke.as_u8(),
            Covenant::Unknown(raw) => raw.kind,
        }
    }

    pub fn covenant_type(&self) -> Option<CovenantType> {
        CovenantType::from_u8(self.kind())
    }

    pub fn name_hash(&self) -> Option<&Hash> {
        match self {
            Covenant::Claim { name_hash, .. }
            | Covenant::Open { name_hash, .. }
            | Covenant::Bid { name_hash, .. }
            | Covenant::Reveal { name_hash, .. }
            | Covenant::Redeem { name_hash, .. }
            | Covenant::Register { name_hash, .. }
            | Covenant::Update { name_hash, .. }
            | Covenant::Renew { name_hash, .. }
            | Covenant::Transfer { name_hash, .. }
            | Covenant::Finalize { name_hash, .. }
            | Covenant::Revoke { name_hash, .. } => Some(name_hash),
            Covenant::None | Covenant::Unknown(_) => None,
        }
    }

    pub fn height(&self) -> Option<u32> {
        match self {
            Covenant::Claim { height, .. }
            | Covenant::Open { height, .. }
            | Covenant::Bid { height, .. }
            | Covenant::Reveal { height, .. }
            | Covenant::Redeem { height, .. }
            | Covenant::Register { height, .. }
            | Covenant::Update { height, .. }
            | Covenant::Renew { height, .. }
            | Covenant::Transfer { height, .. }
            | Covenant::Finalize { height, .. }
            | Covenant::Revoke { height, .. } => Some(*height),
            Covenant::None | Covenant::Unknown(_) => None,
        }
    }

    pub fn to_raw(&self) -> RawCovenant {
        RawCovenant::from(self)
    }

    pub fn get_var_size(&self) -> usize {
        self.to_raw().get_var_size()
    }

    pub fn write<B: BufMut>(&self, buf: &mut B) {
        self.to_raw().write(buf);
    }

    pub fn read(reader: &mut Reader<'_>) -> Result<Self> {
        let raw = RawCovenant::read(reader)?;
        Covenant::try_from(raw).map_err(|e| TxError::Decode(e.to_string()))
    }

    pub fn test<F: BloomFilter + ?Sized>(&self, filter: &F) -> bool {
        self.to_raw().test(filter)
    }
}

fn u8_item(value: u8) -> ByteString {
    vec![value]
}

fn u32_item(value: u32) -> ByteString {
    value.to_le_bytes().to_vec()
}

impl From<&Covenant> for RawCovenant {
    fn from(covenant: &Covenant) -> Self {
        let items = match covenant {
            Covenant::None => vec![],
            Covenant::Claim { name_hash, height, name, flags, claim_hash, commit_height } => vec![
                name_hash.to_vec(),
                u32_item(*height),
                name.clone(),
                u8_item(*flags),
                claim_hash.to_vec(),
                u32_item(*commit_height),
            ],
            Covenant::Open { name_hash, height, name } => {
                vec![name_hash.to_vec(), u32_item(*height), name.clone()]
            }
            Covenant::Bid { name_hash, height, name, blind } => vec![
                name_hash.to_vec(),
                u32_item(*height),
                name.clone(),
                blind.to_vec(),
            ],
            Covenant::Reveal { name_hash, height, nonce } => {
                vec![name_hash.to_vec(), u32_item(*height), nonce.to_vec()]
            }
            Covenant::Redeem { name_hash, height } | Covenant::Revoke { name_hash, height } => {
                vec![name_hash.to_vec(), u32_item(*height)]
            }
            Covenant::Register { name_hash, height, resource, block_hash } => vec![
                name_hash.to_vec(),
                u32_item(*height),
                resource.clone(),
                block_hash.to_vec(),
            ],
            Covenant::Update { name_hash, height, resource } => {
                vec![name_hash.to_vec(), u32_item(*height), resource.clone()]
            }
            Covenant::Renew { name_hash, height, block_hash } => {
                vec![name_hash.to_vec(), u32_item(*height), block_hash.to_vec()]
            }
            Covenant::Transfer { name_hash, height, address } => vec![
                name_hash.to_vec(),
                u32_item(*height),
                u8_item(address.version),
                address.hash.clone(),
            ],
            Covenant::Finalize {
                name_hash,
                height,
                name,
                flags,
                claimed,
                renewals,
                block_hash,
            } => vec![
                name_hash.to_vec(),
                u32_item(*height),
                name.clone(),
                u8_item(*flags),
                u32_item(*claimed),
                u32_item(*renewals),
                block_hash.to_vec(),
            ],
            Covenant::Unknown(raw) => return raw.clone(),
        };

        RawCovenant {
            kind: covenant.kind(),
            items,
        }
    }
}

/// Typed view over a raw item list
struct Items<'a> {
    kind: CovenantType,
    items: &'a [ByteString],
}

impl<'a> Items<'a> {
    fn expect_count(&self, count: usize) -> Result<()> {
        if self.items.len() != count {
            return Err(TxError::InvalidCovenant(format!(
                "{:?} expects {} items, got {}",
                self.kind,
                count,
                self.items.len()
            )));
        }
        Ok(())
    }

    fn fixed<const N: usize>(&self, i: usize) -> Result<[u8; N]> {
        self.items[i].as_slice().try_into().map_err(|_| {
            TxError::InvalidCovenant(format!(
                "{:?} item {} must be {} bytes, got {}",
                self.kind,
                i,
                N,
                self.items[i].len()
            ))
        })
    }

    fn hash(&self, i: usize) -> Result<Hash> {
        self.fixed::<32>(i)
    }

    fn u8(&self, i: usize) -> Result<u8> {
        Ok(self.fixed::<1>(i)?[0])
    }

    fn u32(&self, i: usize) -> Result<u32> {
        Ok(u32::from_le_bytes(self.fixed::<4>(i)?))
    }

    fn bytes(&self, i: usize) -> ByteString {
        self.items[i].clone()
    }
}

impl TryFrom<RawCovenant> for Covenant {
    type Error = TxError;

    fn try_from(raw: RawCovenant) -> Result<Self> {
        let Some(kind) = CovenantType::from_u8(raw.kind) else {
            return Ok(Covenant::Unknown(raw));
        };
        let it = Items { kind, items: &raw.items };

        let covenant = match kind {
            CovenantType::None => {
                it.expect_count(0)?;
                Covenant::None
            }
            CovenantType::Claim => {
                it.expect_count(6)?;
                Covenant::Claim {
                    name_hash: it.hash(0)?,
                    height: it.u32(1)?,
                    name: it.bytes(2),
                    flags: it.u8(3)?,
                    claim_hash: it.hash(4)?,
                    commit_height: it.u32(5)?,
                }
            }
            CovenantType::Open => {
                it.expect_count(3)?;
                Covenant::Open {
                    name_hash: it.hash(0)?,
                    height: it.u32(1)?,
                    name: it.bytes(2),
                }
            }
            CovenantType::Bid => {
                it.expect_count(4)?;
                Covenant::Bid {
                    name_hash: it.hash(0)?,
                    height: it.u32(1)?,
                    name: it.bytes(2),
                    blind: it.hash(3)?,
                }
            }
            CovenantType::Reveal => {
                it.expect_count(3)?;
                Covenant::Reveal {
                    name_hash: it.hash(0)?,
                    height: it.u32(1)?,
                    nonce: it.hash(2)?,
                }
            }
            CovenantType::Redeem => {
                it.expect_count(2)?;
                Covenant::Redeem {
                    name_hash: it.hash(0)?,
                    height: it.u32(1)?,
                }
            }
            CovenantType::Register => {
                it.expect_count(4)?;
                Covenant::Register {
                    name_hash: it.hash(0)?,
                    height: it.u32(1)?,
                    resource: it.bytes(2),
                    block_hash: it.hash(3)?,
                }
            }
            CovenantType::Update => {
                it.expect_count(3)?;
                Covenant::Update {
                    name_hash: it.hash(0)?,
                    height: it.u32(1)?,
                    resource: it.bytes(2),
                }
            }
            CovenantType::Renew => {
                it.expect_count(3)?;
                Covenant::Renew {
                    name_hash: it.hash(0)?,
                    height: it.u32(1)?,
                    block_hash: it.hash(2)?,
                }
            }
            CovenantType::Transfer => {
                it.expect_count(4)?;
                let address = Address::from_hash(&raw.items[3], it.u8(2)?)
                    .map_err(|e| TxError::InvalidCovenant(e.to_string()))?;
                Covenant::Transfer {
                    name_hash: it.hash(0)?,
                    height: it.u32(1)?,
                    address,
                }
            }
            CovenantType::Finalize => {
                it.expect_count(7)?;
                Covenant::Finalize {
                    name_hash: it.hash(0)?,
                    height: it.u32(1)?,
                    name: it.bytes(2),
                    flags: it.u8(3)?,
                    claimed: it.u32(4)?,
                    renewals: it.u32(5)?,
                    block_hash: it.hash(6)?,
                }
            }
            CovenantType::Revoke => {
                it.expect_count(2)?;
                Covenant::Revoke {
                    name_hash: it.hash(0)?,
                    height: it.u32(1)?,
                }
            }
        };

        Ok(covenant)
    }
}
