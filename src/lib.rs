//! # covenant-tx
//!
//! Offline construction, hashing and signing of transactions for a UTXO
//! chain with an on-chain name auction.
//!
//! The crate produces consensus-valid transaction bytes without a node:
//!
//! - **Codec and hashes** ([`transaction`]): the dual base/witness
//!   encoding, size and weight accounting, txid/wtxid.
//! - **Signature hashing** ([`sighash`]): the preimage each input signs,
//!   ECDSA signing and verification.
//! - **Name rules** ([`rules`]): name eligibility, name hashes and the
//!   sealed-bid nonce/blind commitment.
//! - **Assembly** ([`builder`]): payment, open and bid transactions signed
//!   by a wallet seed.
//!
//! ## Usage
//!
//! ```rust
//! use covenant_tx::{Address, TxBuilder, Utxo, WalletConfig};
//!
//! let builder = TxBuilder::from_seed(&[1u8; 32], WalletConfig::default()).unwrap();
//! let coin = Utxo { hash: [7u8; 32], index: 0, value: 1_000_000 };
//! let to = Address::from_pubkey(&[2u8; 33]);
//!
//! let built = builder.build_payment(&[coin], &to, 500_000, 10_000, None).unwrap();
//! assert_eq!(built.tx.outputs[0].value, 500_000);
//! assert_eq!(built.tx.outputs[1].value, 490_000);
//!
//! let witness = built.tx.inputs[0].witness.items();
//! assert!(built.tx.checksig(
//!     0,
//!     &builder.signing_script(),
//!     coin.value,
//!     &witness[0],
//!     &witness[1],
//! ));
//! ```

pub mod address;
pub mod builder;
pub mod config;
pub mod constants;
pub mod covenant;
pub mod encoding;
pub mod error;
pub mod hash;
pub mod keys;
pub mod rules;
pub mod script;
pub mod sighash;
pub mod transaction;
pub mod types;

// Re-export commonly used types
pub use address::Address;
pub use builder::{BuiltTransaction, TxBuilder};
pub use config::{Network, WalletConfig};
pub use constants::*;
pub use covenant::{Covenant, CovenantType, RawCovenant};
pub use error::{Result, TxError};
pub use keys::KeyChain;
pub use script::Script;
pub use sighash::{SighashContext, SighashType};
pub use transaction::{MutableTransaction, Transaction, TxHashes, TxSizes};
pub use types::*;
