//! Hash primitives: BLAKE2b for transaction digests, SHA3 for names

use blake2::digest::consts::{U20, U32};
use blake2::{Blake2b, Digest};
use sha3::Sha3_256;

use crate::types::Hash;

type Blake2b256 = Blake2b<U32>;
type Blake2b160 = Blake2b<U20>;

/// BLAKE2b with a 32-byte digest
pub fn blake2b256(data: &[u8]) -> Hash {
    Blake2b256::digest(data).into()
}

/// BLAKE2b with a 20-byte digest, used for public key hashes
pub fn blake2b160(data: &[u8]) -> [u8; 20] {
    Blake2b160::digest(data).into()
}

/// BLAKE2b-256 over the concatenation of `parts`
pub fn blake2b256_multi(parts: &[&[u8]]) -> Hash {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Two-child tree node: H(left || right)
pub fn hash_node(left: &Hash, right: &Hash) -> Hash {
    blake2b256_multi(&[left, right])
}

pub fn sha3_256(data: &[u8]) -> Hash {
    Sha3_256::digest(data).into()
}
