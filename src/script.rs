//! Output scripts: the pay-to-pubkey-hash template and signature-operation counting

use bytes::BufMut;

use crate::constants::MAX_MULTISIG_PUBKEYS;
use crate::encoding;
use crate::types::ByteString;

pub const OP_0: u8 = 0x00;
pub const OP_PUSHDATA1: u8 = 0x4c;
pub const OP_PUSHDATA2: u8 = 0x4d;
pub const OP_PUSHDATA4: u8 = 0x4e;
pub const OP_1: u8 = 0x51;
pub const OP_16: u8 = 0x60;
pub const OP_DUP: u8 = 0x76;
pub const OP_EQUALVERIFY: u8 = 0x88;
pub const OP_CHECKSIG: u8 = 0xac;
pub const OP_CHECKSIGVERIFY: u8 = 0xad;
pub const OP_CHECKMULTISIG: u8 = 0xae;
pub const OP_CHECKMULTISIGVERIFY: u8 = 0xaf;
pub const OP_BLAKE160: u8 = 0xc0;

/// Raw script bytes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    raw: ByteString,
}

impl Script {
    pub fn from_raw(raw: ByteString) -> Self {
        Self { raw }
    }

    /// OP_DUP OP_BLAKE160 <hash> OP_EQUALVERIFY OP_CHECKSIG
    pub fn from_pubkeyhash(hash: &[u8; 20]) -> Self {
        let mut raw = Vec::with_capacity(25);
        raw.put_u8(OP_DUP);
        raw.put_u8(OP_BLAKE160);
        raw.put_u8(hash.len() as u8);
        raw.put_slice(hash);
        raw.put_u8(OP_EQUALVERIFY);
        raw.put_u8(OP_CHECKSIG);
        Self { raw }
    }

    pub fn encode(&self) -> &[u8] {
        &self.raw
    }

    pub fn get_size(&self) -> usize {
        self.raw.len()
    }

    /// Size with its varint length prefix
    pub fn get_var_size(&self) -> usize {
        encoding::varbytes_size(self.raw.len())
    }

    pub fn is_pubkeyhash(&self) -> bool {
        self.raw.len() == 25
            && self.raw[0] == OP_DUP
            && self.raw[1] == OP_BLAKE160
            && self.raw[2] == 20
            && self.raw[23] == OP_EQUALVERIFY
            && self.raw[24] == OP_CHECKSIG
    }

    /// Count signature operations.
    ///
    /// With `accurate`, a CHECKMULTISIG preceded by OP_1..OP_16 counts as
    /// that many keys; otherwise it is charged the maximum. Counting stops
    /// at the first truncated push.
    pub fn get_sigops(&self, accurate: bool) -> usize {
        let mut total = 0;
        let mut last = None;

        for op in self.opcodes() {
            let Some(op) = op else { break };
            match op {
                OP_CHECKSIG | OP_CHECKSIGVERIFY => total += 1,
                OP_CHECKMULTISIG | OP_CHECKMULTISIGVERIFY => match last {
                    Some(n @ OP_1..=OP_16) if accurate => total += (n - OP_1 + 1) as usize,
                    _ => total += MAX_MULTISIG_PUBKEYS,
                },
                _ => {}
            }
            last = Some(op);
        }

        total
    }

    /// Iterate opcodes, skipping push payloads. Yields `None` once on a
    /// truncated push.
    fn opcodes(&self) -> Opcodes<'_> {
        Opcodes { raw: &self.raw, pos: 0, done: false }
    }
}

struct Opcodes<'a> {
    raw: &'a [u8],
    pos: usize,
    done: bool,
}

impl Opcodes<'_> {
    fn read_len(&mut self, width: usize) -> Option<usize> {
        let bytes = self.raw.get(self.pos..self.pos + width)?;
        self.pos += width;
        let mut len = 0usize;
        for (i, b) in bytes.iter().enumerate() {
            len |= (*b as usize) << (8 * i);
        }
        Some(len)
    }
}

impl Iterator for Opcodes<'_> {
    type Item = Option<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.pos >= self.raw.len() {
            return None;
        }

        let op = self.raw[self.pos];
        self.pos += 1;

        let push = match op {
            0x01..=0x4b => Some(op as usize),
            OP_PUSHDATA1 => self.read_len(1),
            OP_PUSHDATA2 => self.read_len(2),
            OP_PUSHDATA4 => self.read_len(4),
            _ => return Some(Some(op)),
        };

        match push {
            Some(len) if self.pos + len <= self.raw.len() => {
                self.pos += len;
                Some(Some(op))
            }
            _ => {
                self.done = true;
                Some(None)
            }
        }
    }
}
