//! Error types for transaction construction and decoding

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TxError {
    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Insufficient funds: have {available}, need {required}")]
    InsufficientFunds { available: u64, required: u64 },

    #[error("Value overflow: {0}")]
    ValueOverflow(String),

    #[error("No inputs to fund transaction")]
    NoInputs,

    #[error("Bid value {value} exceeds lockup {lockup}")]
    LockupBelowValue { value: u64, lockup: u64 },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid covenant: {0}")]
    InvalidCovenant(String),

    #[error("Invalid key path: {0}")]
    InvalidKeyPath(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, TxError>;
