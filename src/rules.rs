//! Name rules: auction eligibility, name hashing and sealed-bid commitments

use tracing::trace;

use crate::address::Address;
use crate::constants::{MAX_NAME_SIZE, NAME_BLACKLIST};
use crate::error::{Result, TxError};
use crate::hash::{blake2b256_multi, sha3_256};
use crate::keys::KeyChain;
use crate::types::Hash;

/// Character classes of the name charset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Invalid,
    Digit,
    Lower,
    Joiner,
}

fn classify(byte: u8) -> CharClass {
    match byte {
        b'0'..=b'9' => CharClass::Digit,
        b'a'..=b'z' => CharClass::Lower,
        b'-' | b'_' => CharClass::Joiner,
        _ => CharClass::Invalid,
    }
}

/// Check a raw name against the auction naming rules
pub fn verify_name_bytes(name: &[u8]) -> bool {
    if name.is_empty() || name.len() > MAX_NAME_SIZE {
        return false;
    }

    let last = name.len() - 1;
    for (i, &byte) in name.iter().enumerate() {
        if byte & 0x80 != 0 {
            return false;
        }
        match classify(byte) {
            CharClass::Invalid => return false,
            CharClass::Digit | CharClass::Lower => {}
            CharClass::Joiner => {
                if i == 0 || i == last {
                    return false;
                }
            }
        }
    }

    !NAME_BLACKLIST.iter().any(|reserved| reserved.as_bytes() == name)
}

/// Check a name against the auction naming rules
pub fn verify_name(name: &str) -> bool {
    verify_name_bytes(name.as_bytes())
}

/// ASCII bytes of a name as committed on chain
pub fn name_bytes(name: &str) -> &[u8] {
    let bytes = name.as_bytes();
    &bytes[..bytes.len().min(MAX_NAME_SIZE)]
}

/// SHA3-256 of the name bytes
pub fn hash_name(name: &str) -> Hash {
    sha3_256(name_bytes(name))
}

/// Verify `name` and return its hash, or `InvalidName`
pub fn checked_name_hash(name: &str) -> Result<Hash> {
    if !verify_name(name) {
        return Err(TxError::InvalidName(name.to_string()));
    }
    Ok(hash_name(name))
}

/// Child index of the nonce key for a bid of `value`
pub fn nonce_index(value: u64) -> u32 {
    let hi = (value >> 32) as u32;
    let lo = value as u32;
    (hi ^ lo) & 0x7fffffff
}

/// Deterministic bid nonce.
///
/// Derives the key at `<account_path>/<nonce_index(value)>` and hashes
/// BLAKE2b-256(address hash || public key || name hash).
pub fn generate_nonce(
    keys: &KeyChain,
    account_path: &str,
    name_hash: &Hash,
    address: &Address,
    value: u64,
) -> Result<Hash> {
    let index = nonce_index(value);
    let key = keys.derive_path(&format!("{}/{}", account_path, index))?;
    trace!(index, "derived bid nonce key");
    Ok(blake2b256_multi(&[&address.hash, &key.public_key(), name_hash]))
}

/// Blind commitment: BLAKE2b-256(value LE || nonce)
pub fn create_blind(value: u64, nonce: &Hash) -> Hash {
    blake2b256_multi(&[&value.to_le_bytes(), nonce])
}
