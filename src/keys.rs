//! Hierarchical key derivation from a wallet seed (BIP32, private derivation only)

use bip32::{DerivationPath, XPrv};
use secp256k1::{PublicKey, Secp256k1, SecretKey};

use crate::error::{Result, TxError};

/// Key pair at a derived path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedKey {
    pub secret: SecretKey,
    pub public: PublicKey,
}

impl DerivedKey {
    fn from_xprv(xprv: &XPrv) -> Result<Self> {
        let secret = SecretKey::from_slice(&xprv.private_key().to_bytes())
            .map_err(|e| TxError::KeyDerivation(e.to_string()))?;
        let public = PublicKey::from_secret_key(&Secp256k1::signing_only(), &secret);
        Ok(Self { secret, public })
    }

    /// 33-byte compressed public key
    pub fn public_key(&self) -> [u8; 33] {
        self.public.serialize()
    }

    pub fn secret_bytes(&self) -> [u8; 32] {
        self.secret.secret_bytes()
    }
}

/// Parse `m/44'/5353'/0'/0/0`. A `'` suffix marks hardened components.
pub fn parse_path(path: &str) -> Result<DerivationPath> {
    path.parse()
        .map_err(|e| TxError::InvalidKeyPath(format!("{}: {}", path, e)))
}

/// Master key of a wallet
#[derive(Clone)]
pub struct KeyChain {
    master: XPrv,
}

impl KeyChain {
    /// Seeds must be 16, 32 or 64 bytes.
    pub fn from_seed(seed: &[u8]) -> Result<Self> {
        let master = XPrv::new(seed).map_err(|e| {
            TxError::KeyDerivation(format!("{}-byte seed: {}", seed.len(), e))
        })?;
        Ok(Self { master })
    }

    pub fn derive_path(&self, path: &str) -> Result<DerivedKey> {
        let path = parse_path(path)?;

        let mut key = self.master.clone();
        for child in path.iter() {
            key = key
                .derive_child(child)
                .map_err(|e| TxError::KeyDerivation(e.to_string()))?;
        }

        DerivedKey::from_xprv(&key)
    }
}

impl std::fmt::Debug for KeyChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyChain").finish_non_exhaustive()
    }
}
