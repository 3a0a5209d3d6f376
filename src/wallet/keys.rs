//! Ed25519 signing material
//!
//! The secret half is always held in its 64-byte expanded form (seed followed
//! by public key) and wiped on drop.

use super::{WalletError, WalletResult};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use ed25519_dalek::SigningKey;
use std::fmt;
use tonlib_core::mnemonic::KeyPair;
use zeroize::Zeroizing;

pub const PUBLIC_KEY_LEN: usize = 32;
pub const SEED_LEN: usize = 32;
pub const EXPANDED_SECRET_LEN: usize = 64;

/// Public key plus secret material for one orchestrator call
pub struct SigningIdentity {
    public_key: [u8; PUBLIC_KEY_LEN],
    secret: Zeroizing<[u8; EXPANDED_SECRET_LEN]>,
}

impl SigningIdentity {
    /// Accepts either a 32-byte seed or a 64-byte expanded secret
    ///
    /// A seed is expanded by appending the public key. The pair is checked
    /// for consistency before the identity is returned.
    pub fn from_bytes(public_key: &[u8], secret: &[u8]) -> WalletResult<Self> {
        let public_key: [u8; PUBLIC_KEY_LEN] = public_key
            .try_into()
            .map_err(|_| WalletError::InvalidPublicKey { len: public_key.len() })?;

        let mut expanded = Zeroizing::new([0u8; EXPANDED_SECRET_LEN]);
        match secret.len() {
            SEED_LEN => {
                expanded[..SEED_LEN].copy_from_slice(secret);
                expanded[SEED_LEN..].copy_from_slice(&public_key);
            }
            EXPANDED_SECRET_LEN => expanded.copy_from_slice(secret),
            len => return Err(WalletError::InvalidSecretKey { len }),
        }

        SigningKey::from_keypair_bytes(&expanded).map_err(|_| WalletError::KeyMismatch)?;

        Ok(Self {
            public_key,
            secret: expanded,
        })
    }

    /// Decode base64 key material, as passed by API callers
    pub fn from_base64(public_key: &str, secret: &str) -> WalletResult<Self> {
        let public_key = STANDARD
            .decode(public_key.trim())
            .map_err(|e| WalletError::Encoding(format!("public key: {}", e)))?;
        let secret = Zeroizing::new(
            STANDARD
                .decode(secret.trim())
                .map_err(|e| WalletError::Encoding(format!("secret key: {}", e)))?,
        );
        Self::from_bytes(&public_key, &secret)
    }

    /// Use an already expanded 64-byte secret; the public key is its tail
    pub fn from_expanded(secret: &[u8]) -> WalletResult<Self> {
        if secret.len() != EXPANDED_SECRET_LEN {
            return Err(WalletError::InvalidSecretKey { len: secret.len() });
        }
        Self::from_bytes(&secret[SEED_LEN..], secret)
    }

    /// Derive the public key from a raw seed
    pub fn from_seed(seed: &[u8; SEED_LEN]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let public_key = signing_key.verifying_key().to_bytes();
        let mut expanded = Zeroizing::new([0u8; EXPANDED_SECRET_LEN]);
        expanded.copy_from_slice(&signing_key.to_keypair_bytes());
        Self {
            public_key,
            secret: expanded,
        }
    }

    pub fn public_key(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.public_key
    }

    /// Expanded secret, for callers that hold a live contract session
    pub fn expanded_secret(&self) -> &[u8; EXPANDED_SECRET_LEN] {
        &self.secret
    }

    /// Key pair in the form the contract signer consumes
    ///
    /// Lives only for the duration of one signing call.
    pub(crate) fn key_pair(&self) -> KeyPair {
        KeyPair {
            public_key: self.public_key.to_vec(),
            secret_key: self.secret.to_vec(),
        }
    }
}

impl fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningIdentity")
            .field("public_key", &hex::encode(self.public_key))
            .field("secret", &"<redacted>")
            .finish()
    }
}
