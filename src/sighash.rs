//! Signature hashing, signing and verification
//!
//! The preimage committed to by input `i`:
//!
//! ```text
//! version u32 | prevouts | sequences | outpoint | varbytes(script)
//! | value u64 | sequence u32 | outputs | locktime u32 | type u32
//! ```
//!
//! `prevouts`, `sequences` and `outputs` are BLAKE2b-256 digests shared by
//! every input, held in a [`SighashContext`] so a signing session computes
//! them once.

use bytes::BufMut;
use secp256k1::ecdsa::Signature;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use tracing::trace;

use crate::constants::*;
use crate::encoding;
use crate::hash::blake2b256;
use crate::script::Script;
use crate::transaction::{MutableTransaction, Transaction};
use crate::types::{Hash, Input};

/// Base mode in the low five bits plus modifier flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SighashType(pub u8);

impl SighashType {
    pub const ALL: Self = Self(SIGHASH_ALL);
    pub const NONE: Self = Self(SIGHASH_NONE);
    pub const SINGLE: Self = Self(SIGHASH_SINGLE);
    pub const SINGLEREVERSE: Self = Self(SIGHASH_SINGLEREVERSE);

    pub fn base(self) -> u8 {
        self.0 & SIGHASH_BASE_MASK
    }

    pub fn anyone_can_pay(self) -> bool {
        self.0 & SIGHASH_ANYONECANPAY != 0
    }

    pub fn no_input(self) -> bool {
        self.0 & SIGHASH_NOINPUT != 0
    }

    pub fn with_anyone_can_pay(self) -> Self {
        Self(self.0 | SIGHASH_ANYONECANPAY)
    }

    pub fn with_no_input(self) -> Self {
        Self(self.0 | SIGHASH_NOINPUT)
    }
}

impl Default for SighashType {
    fn default() -> Self {
        Self::ALL
    }
}

impl From<u8> for SighashType {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<SighashType> for u8 {
    fn from(ty: SighashType) -> u8 {
        ty.0
    }
}

/// Per-transaction digests shared by all inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SighashContext {
    pub prevouts: Hash,
    pub sequences: Hash,
    pub outputs: Hash,
}

impl SighashContext {
    pub fn new(tx: &MutableTransaction) -> Self {
        let mut prevouts = Vec::with_capacity(tx.inputs.len() * OUTPOINT_SIZE);
        let mut sequences = Vec::with_capacity(tx.inputs.len() * 4);
        for input in &tx.inputs {
            input.prevout.write(&mut prevouts);
            sequences.put_u32_le(input.sequence);
        }

        let mut outputs = Vec::new();
        for output in &tx.outputs {
            output.write(&mut outputs);
        }

        Self {
            prevouts: blake2b256(&prevouts),
            sequences: blake2b256(&sequences),
            outputs: blake2b256(&outputs),
        }
    }
}

/// Digest signed by input `index`.
///
/// # Panics
///
/// If `index` is not an input of `tx`.
pub fn signature_hash(
    tx: &MutableTransaction,
    ctx: &SighashContext,
    index: usize,
    prev: &Script,
    value: u64,
    ty: SighashType,
) -> Hash {
    assert!(
        index < tx.inputs.len(),
        "input index {} out of range ({} inputs)",
        index,
        tx.inputs.len()
    );

    let default_input;
    let input = if ty.no_input() {
        default_input = Input::default();
        &default_input
    } else {
        &tx.inputs[index]
    };

    let base = ty.base();
    let mut prevouts = ZERO_HASH;
    let mut sequences = ZERO_HASH;

    if !ty.anyone_can_pay() {
        prevouts = ctx.prevouts;

        if base != SIGHASH_SINGLE && base != SIGHASH_SINGLEREVERSE && base != SIGHASH_NONE {
            sequences = ctx.sequences;
        }
    }

    let outputs = match base {
        SIGHASH_SINGLE => tx
            .outputs
            .get(index)
            .map_or(ZERO_HASH, |output| blake2b256(&output.encode())),
        SIGHASH_SINGLEREVERSE => tx
            .outputs
            .len()
            .checked_sub(index + 1)
            .map_or(ZERO_HASH, |i| blake2b256(&tx.outputs[i].encode())),
        SIGHASH_NONE => ZERO_HASH,
        _ => ctx.outputs,
    };

    let mut buf = Vec::with_capacity(156 + prev.get_var_size());
    buf.put_u32_le(tx.version);
    buf.put_slice(&prevouts);
    buf.put_slice(&sequences);
    buf.put_slice(&input.prevout.hash);
    buf.put_u32_le(input.prevout.index);
    encoding::write_varbytes(&mut buf, prev.encode());
    buf.put_u64_le(value);
    buf.put_u32_le(input.sequence);
    buf.put_slice(&outputs);
    buf.put_u32_le(tx.locktime);
    buf.put_u32_le(ty.0 as u32);

    blake2b256(&buf)
}

/// 64-byte compact ECDSA signature over `hash`, followed by the type byte
pub fn sign_hash(hash: &Hash, key: &SecretKey, ty: SighashType) -> Vec<u8> {
    let secp = Secp256k1::signing_only();
    let sig = secp.sign_ecdsa(&Message::from_digest(*hash), key);

    let mut out = Vec::with_capacity(65);
    out.extend_from_slice(&sig.serialize_compact());
    out.push(ty.0);
    out
}

/// Verify a compact signature against `hash`. Malformed input is `false`.
pub fn verify_hash(hash: &Hash, sig: &[u8], pubkey: &[u8]) -> bool {
    let (Ok(sig), Ok(key)) = (Signature::from_compact(sig), PublicKey::from_slice(pubkey)) else {
        return false;
    };
    let secp = Secp256k1::verification_only();
    secp.verify_ecdsa(&Message::from_digest(*hash), &sig, &key)
        .is_ok()
}

pub fn signature(
    tx: &MutableTransaction,
    ctx: &SighashContext,
    index: usize,
    prev: &Script,
    value: u64,
    key: &SecretKey,
    ty: SighashType,
) -> Vec<u8> {
    let hash = signature_hash(tx, ctx, index, prev, value, ty);
    trace!(index, ty = ty.0, "signing input");
    sign_hash(&hash, key, ty)
}

/// Check `sig` (signature plus trailing type byte) for input `index`
pub fn checksig(
    tx: &MutableTransaction,
    ctx: &SighashContext,
    index: usize,
    prev: &Script,
    value: u64,
    sig: &[u8],
    pubkey: &[u8],
) -> bool {
    let Some((&ty, body)) = sig.split_last() else {
        return false;
    };
    let hash = signature_hash(tx, ctx, index, prev, value, SighashType(ty));
    verify_hash(&hash, body, pubkey)
}

impl MutableTransaction {
    /// Fresh context over the current fields
    pub fn sighash_context(&self) -> SighashContext {
        SighashContext::new(self)
    }

    pub fn signature_hash(
        &self,
        index: usize,
        prev: &Script,
        value: u64,
        ty: SighashType,
    ) -> Hash {
        signature_hash(self, &self.sighash_context(), index, prev, value, ty)
    }

    pub fn signature(
        &self,
        index: usize,
        prev: &Script,
        value: u64,
        key: &SecretKey,
        ty: SighashType,
    ) -> Vec<u8> {
        signature(self, &self.sighash_context(), index, prev, value, key, ty)
    }

    pub fn checksig(
        &self,
        index: usize,
        prev: &Script,
        value: u64,
        sig: &[u8],
        pubkey: &[u8],
    ) -> bool {
        checksig(self, &self.sighash_context(), index, prev, value, sig, pubkey)
    }
}

impl Transaction {
    /// Context computed on first use and kept for the life of the value
    pub fn sighash_context(&self) -> &SighashContext {
        self.sighash.get_or_init(|| SighashContext::new(self))
    }

    pub fn signature_hash(
        &self,
        index: usize,
        prev: &Script,
        value: u64,
        ty: SighashType,
    ) -> Hash {
        signature_hash(self, self.sighash_context(), index, prev, value, ty)
    }

    pub fn signature(
        &self,
        index: usize,
        prev: &Script,
        value: u64,
        key: &SecretKey,
        ty: SighashType,
    ) -> Vec<u8> {
        signature(self, self.sighash_context(), index, prev, value, key, ty)
    }

    pub fn checksig(
        &self,
        index: usize,
        prev: &Script,
        value: u64,
        sig: &[u8],
        pubkey: &[u8],
    ) -> bool {
        checksig(self, self.sighash_context(), index, prev, value, sig, pubkey)
    }
}
