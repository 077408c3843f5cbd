//! Transactions: wire codec, size accounting, hashes and coin-view queries.
//!
//! A transaction lives in one of two states. [`MutableTransaction`] is the
//! draft: its fields are public and every derived value is recomputed on
//! each call. [`Transaction`] is sealed: its fields are read-only and the
//! encoding, sizes, hashes and sighash digests are computed at most once.
//!
//! Wire layout:
//!
//! ```text
//! base:    version u32 | varint n | n × (outpoint, sequence u32)
//!          | varint m | m × (value u64, address, covenant) | locktime u32
//! witness: n × (varint k | k × varbytes)
//! ```

use bytes::BufMut;
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::collections::HashSet;
use std::ops::Deref;
use tracing::debug;

use crate::address::Address;
use crate::constants::*;
use crate::encoding::{self, Reader};
use crate::error::{Result, TxError};
use crate::hash::{blake2b256, hash_node};
use crate::sighash::SighashContext;
use crate::types::*;

/// Byte counts of the two encoding regions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxSizes {
    pub base: usize,
    pub witness: usize,
}

impl TxSizes {
    pub fn total(&self) -> usize {
        self.base + self.witness
    }

    /// Weight(tx) = base × (SCALE − 1) + total
    pub fn weight(&self) -> usize {
        self.base * (WITNESS_SCALE_FACTOR - 1) + self.total()
    }

    pub fn virtual_size(&self) -> usize {
        div_ceil(self.weight(), WITNESS_SCALE_FACTOR)
    }

    /// Virtual size with the weight floored at `sigops × BYTES_PER_SIGOP`
    pub fn sigops_size(&self, sigops: usize) -> usize {
        let weight = self.weight().max(sigops * BYTES_PER_SIGOP);
        div_ceil(weight, WITNESS_SCALE_FACTOR)
    }
}

fn div_ceil(n: usize, d: usize) -> usize {
    (n + d - 1) / d
}

/// The three transaction hashes, always computed together
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxHashes {
    /// txid: BLAKE2b-256 of the base region
    pub hash: Hash,
    /// BLAKE2b-256 of the witness region
    pub witness_hash: Hash,
    /// wtxid: tree node over (hash, witness_hash)
    pub wtxid: Hash,
}

impl TxHashes {
    fn from_raw(raw: &[u8], sizes: TxSizes) -> Self {
        assert_eq!(
            raw.len(),
            sizes.total(),
            "encoded transaction length does not match base + witness size"
        );
        let (base, witness) = raw.split_at(sizes.base);
        let hash = blake2b256(base);
        let witness_hash = blake2b256(witness);
        Self {
            hash,
            witness_hash,
            wtxid: hash_node(&hash, &witness_hash),
        }
    }
}

/// Discount `45 + min(100, witness)` per input while the size stays above it
fn modified_size(inputs: &[Input], mut size: usize) -> usize {
    for input in inputs {
        let offset = MODIFIED_SIZE_INPUT_OFFSET
            + input.witness.get_size().min(MODIFIED_SIZE_WITNESS_CAP);
        if size > offset {
            size -= offset;
        }
    }
    size
}

/// Dedupe addresses by program hash, keeping first-seen order
fn dedupe_addresses<'a>(addresses: impl IntoIterator<Item = &'a Address>) -> Vec<Address> {
    let mut seen = HashSet::new();
    addresses
        .into_iter()
        .filter(|address| seen.insert(address.hash.as_slice()))
        .cloned()
        .collect()
}

/// Draft transaction: freely editable, nothing cached
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutableTransaction {
    pub version: u32,
    pub inputs: Vec<Input>,
    pub outputs: Vec<Output>,
    pub locktime: u32,
}

impl MutableTransaction {
    pub fn new() -> Self {
        Self {
            version: TX_VERSION,
            ..Default::default()
        }
    }

    pub fn add_input(&mut self, input: Input) {
        self.inputs.push(input);
    }

    pub fn add_output(&mut self, output: Output) {
        self.outputs.push(output);
    }

    /// Seal the transaction. Further edits require [`Transaction::into_mutable`].
    pub fn finalize(self) -> Transaction {
        debug!(
            inputs = self.inputs.len(),
            outputs = self.outputs.len(),
            "finalizing transaction"
        );
        Transaction::sealed(self)
    }

    pub fn get_sizes(&self) -> TxSizes {
        let mut base = 4;
        base += encoding::varint_size(self.inputs.len() as u64);
        base += self.inputs.len() * INPUT_BASE_SIZE;
        base += encoding::varint_size(self.outputs.len() as u64);
        base += self.outputs.iter().map(Output::get_size).sum::<usize>();
        base += 4;

        let witness = self
            .inputs
            .iter()
            .map(|input| input.witness.get_var_size())
            .sum();

        TxSizes { base, witness }
    }

    pub fn get_size(&self) -> usize {
        self.get_sizes().total()
    }

    pub fn get_base_size(&self) -> usize {
        self.get_sizes().base
    }

    pub fn get_witness_size(&self) -> usize {
        self.get_sizes().witness
    }

    pub fn get_weight(&self) -> usize {
        self.get_sizes().weight()
    }

    pub fn get_virtual_size(&self) -> usize {
        self.get_sizes().virtual_size()
    }

    pub fn get_sigops_size(&self, sigops: usize) -> usize {
        self.get_sizes().sigops_size(sigops)
    }

    /// Priority size: `size` (default: virtual size) less a per-input discount
    pub fn get_modified_size(&self, size: Option<usize>) -> usize {
        modified_size(&self.inputs, size.unwrap_or_else(|| self.get_virtual_size()))
    }

    pub fn write_base<B: BufMut>(&self, buf: &mut B) {
        buf.put_u32_le(self.version);
        encoding::write_varint(buf, self.inputs.len() as u64);
        for input in &self.inputs {
            input.write(buf);
        }
        encoding::write_varint(buf, self.outputs.len() as u64);
        for output in &self.outputs {
            output.write(buf);
        }
        buf.put_u32_le(self.locktime);
    }

    pub fn write_witness<B: BufMut>(&self, buf: &mut B) {
        for input in &self.inputs {
            input.witness.write(buf);
        }
    }

    /// Serialize both regions from the current fields
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.get_size());
        self.write_base(&mut buf);
        self.write_witness(&mut buf);
        buf
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.encode())
    }

    pub fn hashes(&self) -> TxHashes {
        TxHashes::from_raw(&self.encode(), self.get_sizes())
    }

    pub fn hash(&self) -> Hash {
        self.hashes().hash
    }

    pub fn witness_hash(&self) -> Hash {
        self.hashes().witness_hash
    }

    pub fn wtxid(&self) -> Hash {
        self.hashes().wtxid
    }

    /// Hex txid
    pub fn txid(&self) -> String {
        hex::encode(self.hash())
    }

    /// Outpoint of output `index` of this transaction
    pub fn outpoint(&self, index: u32) -> Outpoint {
        Outpoint::new(self.hash(), index)
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs
            .first()
            .map_or(false, |input| input.prevout.is_null())
    }

    pub fn get_output_value(&self) -> u64 {
        self.outputs
            .iter()
            .fold(0u64, |total, output| total.saturating_add(output.value))
    }

    /// True when every input's previous output is in `view`
    pub fn has_coins<V: CoinView + ?Sized>(&self, view: &V) -> bool {
        !self.inputs.is_empty()
            && self
                .inputs
                .iter()
                .all(|input| view.has_entry(&input.prevout))
    }

    /// Sum of previous output values, or 0 if any is missing
    pub fn get_input_value<V: CoinView + ?Sized>(&self, view: &V) -> u64 {
        let mut total = 0u64;
        for input in &self.inputs {
            match view.get_output_for(input) {
                Some(coin) => total = total.saturating_add(coin.value),
                None => return 0,
            }
        }
        total
    }

    /// Input value minus output value, or 0 unless every coin resolves
    pub fn get_fee<V: CoinView + ?Sized>(&self, view: &V) -> u64 {
        if !self.has_coins(view) {
            return 0;
        }
        self.get_input_value(view)
            .saturating_sub(self.get_output_value())
    }

    /// Signature operations spent by the inputs; unknown coins count zero
    pub fn get_sigops<V: CoinView + ?Sized>(&self, view: &V) -> usize {
        if self.is_coinbase() {
            return 0;
        }
        self.inputs
            .iter()
            .filter_map(|input| {
                view.get_output_for(input)
                    .map(|coin| coin.address.get_sigops(&input.witness))
            })
            .sum()
    }

    pub fn get_input_addresses<V: CoinView + ?Sized>(&self, view: &V) -> Vec<Address> {
        if self.is_coinbase() {
            return Vec::new();
        }
        dedupe_addresses(
            self.inputs
                .iter()
                .filter_map(|input| view.get_output_for(input))
                .map(|coin| &coin.address),
        )
    }

    pub fn get_output_addresses(&self) -> Vec<Address> {
        dedupe_addresses(self.outputs.iter().map(|output| &output.address))
    }

    /// Input then output addresses, deduplicated across both
    pub fn get_addresses<V: CoinView + ?Sized>(&self, view: &V) -> Vec<Address> {
        let inputs = self.get_input_addresses(view);
        let outputs = self.outputs.iter().map(|output| &output.address);
        dedupe_addresses(inputs.iter().chain(outputs))
    }

    /// Bloom relevance test; see [`Transaction::is_watched`]
    pub fn is_watched<F: BloomFilter + ?Sized>(&self, filter: &mut F) -> bool {
        test_and_update(self, &self.hash(), filter)
    }
}

/// Matches the tx hash, any output (adding its outpoint to the filter),
/// or failing those any spent outpoint
fn test_and_update<F: BloomFilter + ?Sized>(
    tx: &MutableTransaction,
    hash: &Hash,
    filter: &mut F,
) -> bool {
    let mut found = filter.test(hash);

    for (i, output) in tx.outputs.iter().enumerate() {
        if filter.test(&output.address.hash) || output.covenant.test(&*filter) {
            filter.add(&Outpoint::new(*hash, i as u32).encode());
            found = true;
        }
    }

    if found {
        return true;
    }

    tx.inputs
        .iter()
        .any(|input| filter.test(&input.prevout.encode()))
}

fn decode_parts(data: &[u8]) -> Result<(MutableTransaction, TxSizes)> {
    let mut reader = Reader::new(data);

    let version = reader.read_u32()?;

    let input_count = reader.read_count(INPUT_BASE_SIZE)?;
    let mut inputs = Vec::with_capacity(input_count);
    for _ in 0..input_count {
        inputs.push(Input::read(&mut reader)?);
    }

    let output_count = reader.read_count(MIN_OUTPUT_SIZE)?;
    let mut outputs = Vec::with_capacity(output_count);
    for _ in 0..output_count {
        outputs.push(Output::read(&mut reader)?);
    }

    let locktime = reader.read_u32()?;
    let base = reader.offset();

    for input in &mut inputs {
        input.witness = Witness::read(&mut reader)?;
    }

    if !reader.is_empty() {
        return Err(TxError::Decode(format!(
            "{} trailing bytes after transaction",
            reader.remaining()
        )));
    }

    let sizes = TxSizes {
        base,
        witness: reader.offset() - base,
    };
    let tx = MutableTransaction {
        version,
        inputs,
        outputs,
        locktime,
    };

    Ok((tx, sizes))
}

/// Sealed transaction with write-once caches
#[derive(Debug, Clone)]
pub struct Transaction {
    tx: MutableTransaction,
    raw: OnceCell<Vec<u8>>,
    sizes: OnceCell<TxSizes>,
    hashes: OnceCell<TxHashes>,
    pub(crate) sighash: OnceCell<SighashContext>,
}

impl Transaction {
    fn sealed(tx: MutableTransaction) -> Self {
        Self {
            tx,
            raw: OnceCell::new(),
            sizes: OnceCell::new(),
            hashes: OnceCell::new(),
            sighash: OnceCell::new(),
        }
    }

    /// Decode a transaction, keeping `data` as its cached encoding
    pub fn decode(data: &[u8]) -> Result<Self> {
        let (tx, sizes) = decode_parts(data)?;
        debug!(
            inputs = tx.inputs.len(),
            outputs = tx.outputs.len(),
            base = sizes.base,
            witness = sizes.witness,
            "decoded transaction"
        );
        let mut sealed = Self::sealed(tx);
        sealed.raw = OnceCell::from(data.to_vec());
        sealed.sizes = OnceCell::from(sizes);
        Ok(sealed)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        let data = hex::decode(s).map_err(|e| TxError::Decode(e.to_string()))?;
        Self::decode(&data)
    }

    /// Back to a draft; all caches are dropped
    pub fn into_mutable(self) -> MutableTransaction {
        self.tx
    }

    /// Cached encoding
    pub fn encode(&self) -> &[u8] {
        self.raw.get_or_init(|| self.tx.encode())
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.encode())
    }

    pub fn get_sizes(&self) -> TxSizes {
        *self.sizes.get_or_init(|| self.tx.get_sizes())
    }

    pub fn get_size(&self) -> usize {
        self.get_sizes().total()
    }

    pub fn get_base_size(&self) -> usize {
        self.get_sizes().base
    }

    pub fn get_witness_size(&self) -> usize {
        self.get_sizes().witness
    }

    pub fn get_weight(&self) -> usize {
        self.get_sizes().weight()
    }

    pub fn get_virtual_size(&self) -> usize {
        self.get_sizes().virtual_size()
    }

    pub fn get_sigops_size(&self, sigops: usize) -> usize {
        self.get_sizes().sigops_size(sigops)
    }

    pub fn get_modified_size(&self, size: Option<usize>) -> usize {
        modified_size(&self.tx.inputs, size.unwrap_or_else(|| self.get_virtual_size()))
    }

    pub fn hashes(&self) -> TxHashes {
        *self
            .hashes
            .get_or_init(|| TxHashes::from_raw(self.encode(), self.get_sizes()))
    }

    pub fn hash(&self) -> Hash {
        self.hashes().hash
    }

    pub fn witness_hash(&self) -> Hash {
        self.hashes().witness_hash
    }

    pub fn wtxid(&self) -> Hash {
        self.hashes().wtxid
    }

    pub fn txid(&self) -> String {
        hex::encode(self.hash())
    }

    pub fn outpoint(&self, index: u32) -> Outpoint {
        Outpoint::new(self.hash(), index)
    }

    /// True if the filter matches this transaction's hash, any output's
    /// address or covenant items, or any spent outpoint. Matching outputs
    /// have their outpoint added to the filter.
    pub fn is_watched<F: BloomFilter + ?Sized>(&self, filter: &mut F) -> bool {
        test_and_update(&self.tx, &self.hash(), filter)
    }
}

impl Deref for Transaction {
    type Target = MutableTransaction;

    fn deref(&self) -> &MutableTransaction {
        &self.tx
    }
}

impl PartialEq for Transaction {
    fn eq(&self, other: &Self) -> bool {
        self.tx == other.tx
    }
}

impl Eq for Transaction {}

impl From<MutableTransaction> for Transaction {
    fn from(tx: MutableTransaction) -> Self {
        tx.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::covenant::Covenant;

    fn address(seed: u8) -> Address {
        Address::from_pubkey(&[seed; 33])
    }

    fn sample_tx() -> MutableTransaction {
        let mut tx = MutableTransaction::new();
        let mut input = Input::new(Outpoint::new([1; 32], 0));
        input.witness = Witness::from_items(vec![vec![0xaa; 65], vec![0x02; 33]]);
        tx.add_input(input);
        tx.add_output(Output::new(5_000, address(1)));
        tx.add_output(Output::with_covenant(
            0,
            address(2),
            Covenant::Open {
                name_hash: [9; 32],
                height: 0,
                name: b"wltx".to_vec(),
            },
        ));
        tx
    }

    #[test]
    fn test_empty_transaction_layout() {
        let tx = MutableTransaction::new();
        let raw = tx.encode();
        // version(4) + nin(1) + nout(1) + locktime(4)
        assert_eq!(raw, vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(tx.get_sizes(), TxSizes { base: 10, witness: 0 });
    }

    #[test]
    fn test_sizes_match_encoding() {
        let tx = sample_tx();
        let sizes = tx.get_sizes();
        assert_eq!(tx.encode().len(), sizes.total());
        // witness: count(1) + 66 + 34
        assert_eq!(sizes.witness, 101);
    }

    #[test]
    fn test_weight_and_vsize() {
        let tx = sample_tx();
        let sizes = tx.get_sizes();
        assert_eq!(tx.get_weight(), sizes.base * 3 + sizes.total());
        assert_eq!(tx.get_virtual_size(), (tx.get_weight() + 3) / 4);
    }

    #[test]
    fn test_sigops_size_floor() {
        let tx = sample_tx();
        assert_eq!(tx.get_sigops_size(0), tx.get_virtual_size());
        assert_eq!(tx.get_sigops_size(1000), 1000 * BYTES_PER_SIGOP / 4);
    }

    #[test]
    fn test_modified_size() {
        let tx = sample_tx();
        let vsize = tx.get_virtual_size();
        assert_eq!(tx.get_modified_size(None), vsize - (45 + 100));
        // Offsets larger than the running size are skipped
        assert_eq!(tx.get_modified_size(Some(100)), 100);
    }

    #[test]
    fn test_decode_round_trip() {
        let tx = sample_tx();
        let raw = tx.encode();
        let decoded = Transaction::decode(&raw).unwrap();
        assert_eq!(*decoded, tx);
        assert_eq!(decoded.encode(), raw.as_slice());
        assert_eq!(decoded.get_sizes(), tx.get_sizes());
    }

    #[test]
    fn test_decode_trailing_bytes() {
        let mut raw = sample_tx().encode();
        raw.push(0);
        assert!(matches!(Transaction::decode(&raw), Err(TxError::Decode(_))));
    }

    #[test]
    fn test_decode_truncated() {
        let raw = sample_tx().encode();
        for len in [0, 3, 10, raw.len() - 1] {
            assert!(Transaction::decode(&raw[..len]).is_err());
        }
    }

    #[test]
    fn test_decode_oversized_counts() {
        // Version, then 2 inputs announced with room for only one
        let mut raw = vec![0u8; 4];
        raw.push(2);
        raw.extend_from_slice(&[0u8; INPUT_BASE_SIZE + 10]);
        assert!(matches!(Transaction::decode(&raw), Err(TxError::Decode(_))));

        // No inputs, 0xffff outputs announced over a few bytes
        let mut raw = vec![0u8; 4];
        raw.extend_from_slice(&[0x00, 0xfd, 0xff, 0xff]);
        raw.extend_from_slice(&[0u8; 64]);
        assert!(matches!(Transaction::decode(&raw), Err(TxError::Decode(_))));

        // One input whose witness announces u32::MAX items
        let mut raw = vec![0u8; 4];
        raw.push(1);
        raw.extend_from_slice(&[0u8; INPUT_BASE_SIZE]);
        raw.extend_from_slice(&[0, 0, 0, 0, 0]);
        raw.extend_from_slice(&[0xfe, 0xff, 0xff, 0xff, 0xff]);
        assert!(matches!(Transaction::decode(&raw), Err(TxError::Decode(_))));
    }

    #[test]
    fn test_hash_covers_base_only() {
        let tx = sample_tx();
        let mut stripped = tx.clone();
        stripped.inputs[0].witness = Witness::new();

        assert_eq!(tx.hash(), stripped.hash());
        assert_ne!(tx.witness_hash(), stripped.witness_hash());
        assert_ne!(tx.wtxid(), stripped.wtxid());
    }

    #[test]
    fn test_hash_definitions() {
        let tx = sample_tx();
        let raw = tx.encode();
        let base = tx.get_base_size();
        let hashes = tx.hashes();
        assert_eq!(hashes.hash, blake2b256(&raw[..base]));
        assert_eq!(hashes.witness_hash, blake2b256(&raw[base..]));
        assert_eq!(hashes.wtxid, hash_node(&hashes.hash, &hashes.witness_hash));
    }

    #[test]
    fn test_empty_witness_region_still_hashed() {
        let tx = MutableTransaction::new();
        assert_eq!(tx.witness_hash(), blake2b256(&[]));
    }

    #[test]
    #[should_panic(expected = "does not match")]
    fn test_length_mismatch_asserts() {
        let tx = sample_tx();
        let mut sizes = tx.get_sizes();
        sizes.witness += 1;
        TxHashes::from_raw(&tx.encode(), sizes);
    }

    #[test]
    fn test_sealed_matches_draft() {
        let draft = sample_tx();
        let sealed = draft.clone().finalize();
        assert_eq!(sealed.hash(), draft.hash());
        assert_eq!(sealed.wtxid(), draft.wtxid());
        assert_eq!(sealed.encode(), draft.encode().as_slice());
        assert_eq!(sealed.get_virtual_size(), draft.get_virtual_size());
        assert_eq!(sealed.txid(), draft.txid());
    }

    #[test]
    fn test_draft_recomputes_after_edit() {
        let mut draft = sample_tx();
        let before = draft.hash();
        draft.locktime = 5;
        assert_ne!(draft.hash(), before);
    }

    #[test]
    fn test_into_mutable_drops_caches() {
        let sealed = sample_tx().finalize();
        let before = sealed.hash();
        let mut draft = sealed.into_mutable();
        draft.outputs[0].value += 1;
        assert_ne!(draft.finalize().hash(), before);
    }

    #[test]
    fn test_is_coinbase() {
        let mut tx = MutableTransaction::new();
        assert!(!tx.is_coinbase());
        tx.add_input(Input::new(Outpoint::null()));
        assert!(tx.is_coinbase());
        tx.inputs[0].prevout.index = 0;
        assert!(!tx.is_coinbase());
    }

    #[test]
    fn test_outpoint_uses_hash() {
        let tx = sample_tx().finalize();
        assert_eq!(tx.outpoint(1), Outpoint::new(tx.hash(), 1));
    }

    #[test]
    fn test_output_addresses_deduped() {
        let mut tx = MutableTransaction::new();
        tx.add_output(Output::new(1, address(1)));
        tx.add_output(Output::new(2, address(2)));
        tx.add_output(Output::new(3, address(1)));
        assert_eq!(tx.get_output_addresses(), vec![address(1), address(2)]);
    }
}
