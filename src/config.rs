//! Network parameters and wallet configuration

use serde::{Deserialize, Serialize};

use crate::constants::{BIP44_PURPOSE, HARDENED};
use crate::error::{Result, TxError};

/// Chain the wallet builds transactions for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Main,
    Testnet,
    Regtest,
    Simnet,
}

impl Network {
    /// Bech32 human-readable part of addresses
    pub fn hrp(&self) -> &'static str {
        match self {
            Network::Main => "hs",
            Network::Testnet => "ts",
            Network::Regtest => "rs",
            Network::Simnet => "ss",
        }
    }

    /// BIP44 coin type
    pub fn coin_type(&self) -> u32 {
        match self {
            Network::Main => 5353,
            Network::Testnet => 5354,
            Network::Regtest => 5355,
            Network::Simnet => 5356,
        }
    }

    pub fn from_hrp(hrp: &str) -> Option<Self> {
        [Network::Main, Network::Testnet, Network::Regtest, Network::Simnet]
            .into_iter()
            .find(|network| network.hrp() == hrp)
    }
}

/// Wallet-level settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WalletConfig {
    pub network: Network,
    pub account: u32,
}

impl WalletConfig {
    pub fn new(network: Network, account: u32) -> Result<Self> {
        let config = Self { network, account };
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON configuration document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: WalletConfig =
            serde_json::from_str(json).map_err(|e| TxError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.account >= HARDENED {
            return Err(TxError::InvalidConfig(format!(
                "account index {} out of range",
                self.account
            )));
        }
        Ok(())
    }

    /// `m/44'/<coin>'/<account>'`
    pub fn account_path(&self) -> String {
        format!(
            "m/{}'/{}'/{}'",
            BIP44_PURPOSE,
            self.network.coin_type(),
            self.account
        )
    }

    /// First receive key of the account
    pub fn receive_path(&self) -> String {
        format!("{}/0/0", self.account_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WalletConfig::default();
        assert_eq!(config.network, Network::Main);
        assert_eq!(config.account_path(), "m/44'/5353'/0'");
        assert_eq!(config.receive_path(), "m/44'/5353'/0'/0/0");
    }

    #[test]
    fn test_from_json() {
        let config = WalletConfig::from_json(r#"{"network": "regtest", "account": 2}"#).unwrap();
        assert_eq!(config.network, Network::Regtest);
        assert_eq!(config.account_path(), "m/44'/5355'/2'");
    }

    #[test]
    fn test_from_json_defaults() {
        let config = WalletConfig::from_json("{}").unwrap();
        assert_eq!(config, WalletConfig::default());
    }

    #[test]
    fn test_from_json_rejects_unknown_network() {
        let result = WalletConfig::from_json(r#"{"network": "mainnet2"}"#);
        assert!(matches!(result, Err(TxError::InvalidConfig(_))));
    }

    #[test]
    fn test_account_out_of_range() {
        assert!(WalletConfig::new(Network::Main, HARDENED).is_err());
        assert!(WalletConfig::new(Network::Main, HARDENED - 1).is_ok());
    }

    #[test]
    fn test_network_from_hrp() {
        assert_eq!(Network::from_hrp("ts"), Some(Network::Testnet));
        assert_eq!(Network::from_hrp("bc"), None);
    }
}
