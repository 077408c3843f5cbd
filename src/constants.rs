//! Consensus and policy constants

use crate::types::Hash;

/// All-zero hash, used for the null outpoint and for skipped sighash digests
pub const ZERO_HASH: Hash = [0u8; 32];

/// Outpoint index marking a coinbase input
pub const NULL_INDEX: u32 = 0xffffffff;

/// Sequence number for final inputs
pub const SEQUENCE_FINAL: u32 = 0xffffffff;

/// Default transaction version
pub const TX_VERSION: u32 = 0;

/// Maximum name length in bytes
pub const MAX_NAME_SIZE: usize = 63;

/// Names that can never be auctioned
pub const NAME_BLACKLIST: [&str; 5] = ["example", "invalid", "local", "localhost", "test"];

/// Witness bytes weigh 1/WITNESS_SCALE_FACTOR of base bytes
pub const WITNESS_SCALE_FACTOR: usize = 4;

/// Weight charged per signature operation
pub const BYTES_PER_SIGOP: usize = 20;

/// Per-input discount applied by the modified size heuristic
pub const MODIFIED_SIZE_INPUT_OFFSET: usize = 45;

/// Cap on the witness bytes discounted per input
pub const MODIFIED_SIZE_WITNESS_CAP: usize = 100;

/// Serialized outpoint: hash(32) + index(4)
pub const OUTPOINT_SIZE: usize = 36;

/// Serialized base input: outpoint(36) + sequence(4)
pub const INPUT_BASE_SIZE: usize = OUTPOINT_SIZE + 4;

/// Minimum and maximum address program length
pub const MIN_ADDRESS_SIZE: usize = 2;
pub const MAX_ADDRESS_SIZE: usize = 40;

/// Smallest serialized output: value(8) + address(2 + 2) + covenant(1 + 1)
pub const MIN_OUTPUT_SIZE: usize = 8 + 2 + MIN_ADDRESS_SIZE + 2;

/// Highest address version
pub const MAX_ADDRESS_VERSION: u8 = 31;

/// Sigops charged for an inaccurate CHECKMULTISIG count
pub const MAX_MULTISIG_PUBKEYS: usize = 20;

/// Hardened child index offset
pub const HARDENED: u32 = 0x8000_0000;

/// BIP44 purpose
pub const BIP44_PURPOSE: u32 = 44;

/// Sighash base modes (low 5 bits)
pub const SIGHASH_ALL: u8 = 1;
pub const SIGHASH_NONE: u8 = 2;
pub const SIGHASH_SINGLE: u8 = 3;
pub const SIGHASH_SINGLEREVERSE: u8 = 4;

/// Sighash modifier flags
pub const SIGHASH_NOINPUT: u8 = 0x40;
pub const SIGHASH_ANYONECANPAY: u8 = 0x80;

/// Mask selecting the sighash base mode
pub const SIGHASH_BASE_MASK: u8 = 0x1f;
