//! Wallet transaction assembly: payments, name opens and sealed bids
//!
//! Every builder spends the given coins in order, one input per coin, and
//! signs each input with `SIGHASH_ALL` using the wallet's receive key. The
//! witness of every input is `[signature, public key]`.

use tracing::{debug, info};

use crate::address::Address;
use crate::config::WalletConfig;
use crate::covenant::Covenant;
use crate::error::{Result, TxError};
use crate::hash::blake2b160;
use crate::keys::{DerivedKey, KeyChain};
use crate::rules;
use crate::script::Script;
use crate::sighash::{self, SighashContext, SighashType};
use crate::transaction::{MutableTransaction, Transaction};
use crate::types::{Hash, Input, Output, Utxo, Witness};

/// Signed transaction ready for broadcast
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltTransaction {
    pub tx: Transaction,
    /// Hex of the full encoding
    pub hex: String,
    pub txid: String,
}

pub struct TxBuilder {
    keys: KeyChain,
    config: WalletConfig,
    signer: DerivedKey,
    address: Address,
}

impl TxBuilder {
    pub fn new(keys: KeyChain, config: WalletConfig) -> Result<Self> {
        config.validate()?;
        let signer = keys.derive_path(&config.receive_path())?;
        let address = Address::from_pubkey(&signer.public_key());
        debug!(
            network = ?config.network,
            account = config.account,
            "transaction builder ready"
        );
        Ok(Self {
            keys,
            config,
            signer,
            address,
        })
    }

    pub fn from_seed(seed: &[u8], config: WalletConfig) -> Result<Self> {
        Self::new(KeyChain::from_seed(seed)?, config)
    }

    /// Wallet's own address: receives change, opens and bids
    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn public_key(&self) -> [u8; 33] {
        self.signer.public_key()
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    /// Pay-to-pubkey-hash script every input is signed against
    pub fn signing_script(&self) -> Script {
        Script::from_pubkeyhash(&blake2b160(&self.public_key()))
    }

    /// Nonce this wallet commits to when bidding `value` on `name_hash`
    pub fn generate_nonce(&self, name_hash: &Hash, value: u64) -> Result<Hash> {
        rules::generate_nonce(
            &self.keys,
            &self.config.account_path(),
            name_hash,
            &self.address,
            value,
        )
    }

    /// Blind commitment for a bid of `value` on `name_hash`
    pub fn generate_blind(&self, name_hash: &Hash, value: u64) -> Result<Hash> {
        let nonce = self.generate_nonce(name_hash, value)?;
        Ok(rules::create_blind(value, &nonce))
    }

    /// Pay `amount` to `to`, returning the rest less `fee` as change
    pub fn build_payment(
        &self,
        utxos: &[Utxo],
        to: &Address,
        amount: u64,
        fee: u64,
        change: Option<&Address>,
    ) -> Result<BuiltTransaction> {
        let change_value = change_value(utxos, fee, amount)?;

        let mut tx = funding_transaction(utxos);
        tx.add_output(Output::new(amount, to.clone()));
        tx.add_output(Output::new(change_value, self.change_address(change)));

        info!(amount, fee, change = change_value, "building payment");
        self.sign(tx, utxos)
    }

    /// Open the auction for `name`
    pub fn build_open(
        &self,
        name: &str,
        utxos: &[Utxo],
        fee: u64,
        change: Option<&Address>,
    ) -> Result<BuiltTransaction> {
        let name_hash = rules::checked_name_hash(name)?;
        let change_value = change_value(utxos, fee, 0)?;

        let covenant = Covenant::Open {
            name_hash,
            height: 0,
            name: rules::name_bytes(name).to_vec(),
        };

        let mut tx = funding_transaction(utxos);
        tx.add_output(Output::with_covenant(0, self.address.clone(), covenant));
        tx.add_output(Output::new(change_value, self.change_address(change)));

        info!(name, fee, "building open");
        self.sign(tx, utxos)
    }

    /// Place a sealed bid of `value` on `name`, locking `lockup` coins.
    ///
    /// Change is the coin total less `fee` and `lockup`.
    #[allow(clippy::too_many_arguments)]
    pub fn build_bid(
        &self,
        name: &str,
        value: u64,
        lockup: u64,
        start_height: u32,
        utxos: &[Utxo],
        fee: u64,
        change: Option<&Address>,
    ) -> Result<BuiltTransaction> {
        let name_hash = rules::checked_name_hash(name)?;
        if lockup < value {
            return Err(TxError::LockupBelowValue { value, lockup });
        }
        let change_value = change_value(utxos, fee, lockup)?;

        let blind = self.generate_blind(&name_hash, value)?;
        let covenant = Covenant::Bid {
            name_hash,
            height: start_height,
            name: rules::name_bytes(name).to_vec(),
            blind,
        };

        let mut tx = funding_transaction(utxos);
        tx.add_output(Output::with_covenant(lockup, self.address.clone(), covenant));
        tx.add_output(Output::new(change_value, self.change_address(change)));

        info!(name, lockup, start_height, fee, "building bid");
        self.sign(tx, utxos)
    }

    fn change_address(&self, change: Option<&Address>) -> Address {
        change.unwrap_or(&self.address).clone()
    }

    /// Sign input `i` against `utxos[i].value`, then seal
    fn sign(&self, mut tx: MutableTransaction, utxos: &[Utxo]) -> Result<BuiltTransaction> {
        let script = self.signing_script();
        let pubkey = self.public_key();
        let ctx = SighashContext::new(&tx);

        for (i, utxo) in utxos.iter().enumerate() {
            let sig = sighash::signature(
                &tx,
                &ctx,
                i,
                &script,
                utxo.value,
                &self.signer.secret,
                SighashType::ALL,
            );
            tx.inputs[i].witness = Witness::from_items(vec![sig, pubkey.to_vec()]);
        }

        let tx = tx.finalize();
        let hex = tx.to_hex();
        let txid = tx.txid();
        info!(
            txid = %txid,
            inputs = tx.inputs.len(),
            outputs = tx.outputs.len(),
            vsize = tx.get_virtual_size(),
            "signed transaction"
        );

        Ok(BuiltTransaction { tx, hex, txid })
    }
}

impl std::fmt::Debug for TxBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxBuilder")
            .field("config", &self.config)
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Draft with one final input per coin and no outputs
fn funding_transaction(utxos: &[Utxo]) -> MutableTransaction {
    let mut tx = MutableTransaction::new();
    for utxo in utxos {
        tx.add_input(Input::new(utxo.outpoint()));
    }
    tx
}

/// Coin total less `fee` and `spend`
fn change_value(utxos: &[Utxo], fee: u64, spend: u64) -> Result<u64> {
    if utxos.is_empty() {
        return Err(TxError::NoInputs);
    }
    let available = utxos
        .iter()
        .try_fold(0u64, |total, utxo| total.checked_add(utxo.value))
        .ok_or_else(|| TxError::ValueOverflow("coin values exceed u64".to_string()))?;
    let required = fee
        .checked_add(spend)
        .ok_or_else(|| TxError::ValueOverflow(format!("fee {} plus spend {}", fee, spend)))?;
    available
        .checked_sub(required)
        .ok_or(TxError::InsufficientFunds {
            available,
            required,
        })
}
