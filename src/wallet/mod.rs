//! Wallet contracts: key material, descriptors and transfer signing
//!
//! A wallet contract is a pure function of (generation, public key,
//! network, workchain): its code is the canonical contract bundled with
//! `tonlib-core`, its data carries the public key and a wallet id, and its
//! address is the hash of the resulting state-init. [`WalletFactory`]
//! memoizes derived descriptors per tuple; nothing else about a wallet is
//! cached.

pub mod keys;

pub use keys::SigningIdentity;

use crate::cell::{Address, ArcCell, Cell, CellError};
use crate::types::{Network, WalletGeneration};
use dashmap::DashMap;
use std::fmt;
use thiserror::Error;
use tonlib_core::mnemonic::KeyPair;
use tonlib_core::wallet::{TonWallet, WalletVersion};

/// Base subwallet id of the V4R2 contract (added to the workchain id)
pub const V4R2_SUBWALLET_BASE: i32 = 698_983_191;

/// `signed_external` request prefix of the V5R1 contract
pub const V5R1_OP_SIGNED_EXTERNAL: u32 = 0x7369_676e;

/// `action_send_msg` tag inside a V5R1 output action list
pub const ACTION_SEND_MSG: u32 = 0x0ec3_c86d;

/// Send mode of every emitted message: pay fees separately, ignore errors
pub const SEND_MODE: u8 = 3;

/// Errors raised while handling key material or wallet contracts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("Invalid public key: expected 32 bytes, got {len}")]
    InvalidPublicKey { len: usize },

    #[error("Invalid secret key: expected 32 or 64 bytes, got {len}")]
    InvalidSecretKey { len: usize },

    /// The secret does not belong to the public key (or to the wallet)
    #[error("Secret key does not match public key")]
    KeyMismatch,

    #[error("Key encoding error: {0}")]
    Encoding(String),

    /// Derivation or signing rejected by the contract layer
    #[error("Wallet {generation} contract error: {reason}")]
    Contract {
        generation: WalletGeneration,
        reason: String,
    },

    #[error("Wallet {generation} accepts at most {max} messages per transfer, got {count}")]
    TooManyMessages {
        generation: WalletGeneration,
        count: usize,
        max: usize,
    },

    #[error(transparent)]
    Cell(#[from] CellError),
}

pub type WalletResult<T> = std::result::Result<T, WalletError>;

fn contract_error(generation: WalletGeneration, err: impl fmt::Display) -> WalletError {
    WalletError::Contract {
        generation,
        reason: err.to_string(),
    }
}

/// Contract version backing a wallet generation
pub fn wallet_version(generation: WalletGeneration) -> WalletVersion {
    match generation {
        WalletGeneration::V4R2 => WalletVersion::V4R2,
        WalletGeneration::V5R1 => WalletVersion::V5R1,
    }
}

/// Upper bound on messages in one transfer
pub fn max_messages(generation: WalletGeneration) -> usize {
    match generation {
        WalletGeneration::V4R2 => 4,
        WalletGeneration::V5R1 => 255,
    }
}

/// Wallet id of a V5R1 wallet: network global id XOR the client context
/// (`1 | workchain:int8 | version:uint8 | subwallet:uint15`)
pub fn v5r1_wallet_id(network: Network, workchain: i8, subwallet: u16) -> i32 {
    let context: u32 = (1u32 << 31)
        | ((workchain as u8 as u32) << 23)
        | ((subwallet as u32) & 0x7fff);
    network.global_id() ^ (context as i32)
}

/// Wallet id stored in the contract data and repeated in every request
///
/// V4R2 ids ignore the network, so the same key has the same V4R2 address
/// on mainnet and testnet.
pub fn wallet_id(generation: WalletGeneration, network: Network, workchain: i8) -> i32 {
    match generation {
        WalletGeneration::V4R2 => V4R2_SUBWALLET_BASE.wrapping_add(workchain as i32),
        WalletGeneration::V5R1 => v5r1_wallet_id(network, workchain, 0),
    }
}

/// Immutable identity of a wallet contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletContractDescriptor {
    pub generation: WalletGeneration,
    pub workchain: i8,
    pub network: Network,
    pub wallet_id: i32,
    pub address: Address,
}

impl WalletContractDescriptor {
    /// User-facing text form, flagged test-only on testnet
    pub fn friendly_address(&self, bounceable: bool) -> String {
        self.address
            .to_friendly(bounceable, self.network.is_testnet())
    }
}

/// Handle to one wallet contract
#[derive(Debug, Clone)]
pub struct WalletContract {
    descriptor: WalletContractDescriptor,
    public_key: [u8; 32],
    wallet: TonWallet,
}

impl WalletContract {
    pub fn descriptor(&self) -> &WalletContractDescriptor {
        &self.descriptor
    }

    pub fn address(&self) -> &Address {
        &self.descriptor.address
    }

    pub fn generation(&self) -> WalletGeneration {
        self.descriptor.generation
    }

    pub fn public_key(&self) -> &[u8; 32] {
        &self.public_key
    }

    /// Signed transfer body carrying `messages`, in execution order
    ///
    /// A transfer at seqno 0 never expires, matching what the wallet accepts
    /// while it is being deployed.
    pub fn create_transfer(
        &self,
        messages: &[ArcCell],
        seqno: u32,
        valid_until: u32,
        identity: &SigningIdentity,
    ) -> WalletResult<Cell> {
        let generation = self.generation();
        if identity.public_key() != &self.public_key {
            return Err(WalletError::KeyMismatch);
        }
        if messages.len() > max_messages(generation) {
            return Err(WalletError::TooManyMessages {
                generation,
                count: messages.len(),
                max: max_messages(generation),
            });
        }

        let signer = TonWallet::derive(
            self.descriptor.workchain as i32,
            wallet_version(generation),
            &identity.key_pair(),
            self.descriptor.wallet_id,
        )
        .map_err(|e| contract_error(generation, e))?;
        if signer.address != self.wallet.address {
            return Err(WalletError::KeyMismatch);
        }

        let valid_until = if seqno == 0 { u32::MAX } else { valid_until };
        let body = signer
            .create_external_body(valid_until, seqno, messages.to_vec())
            .map_err(|e| contract_error(generation, e))?;
        signer
            .sign_external_body(&body)
            .map_err(|e| contract_error(generation, e))
    }

    /// Inbound external message to this wallet carrying `signed_body`
    pub fn external_message(&self, signed_body: Cell, with_state_init: bool) -> WalletResult<Cell> {
        self.wallet
            .wrap_signed_body(signed_body, with_state_init)
            .map_err(|e| contract_error(self.generation(), e))
    }
}

type DescriptorKey = (WalletGeneration, [u8; 32], Network);

/// Opens wallet contracts and caches their descriptors
#[derive(Debug)]
pub struct WalletFactory {
    workchain: i8,
    descriptors: DashMap<DescriptorKey, WalletContractDescriptor>,
}

impl Default for WalletFactory {
    fn default() -> Self {
        Self::new(0)
    }
}

impl WalletFactory {
    pub fn new(workchain: i8) -> Self {
        Self {
            workchain,
            descriptors: DashMap::new(),
        }
    }

    pub fn workchain(&self) -> i8 {
        self.workchain
    }

    /// Build a contract handle, recording its descriptor in the cache
    pub fn open(
        &self,
        generation: WalletGeneration,
        public_key: &[u8],
        network: Network,
    ) -> WalletResult<WalletContract> {
        let public_key: [u8; 32] = public_key
            .try_into()
            .map_err(|_| WalletError::InvalidPublicKey { len: public_key.len() })?;

        // deriving an address needs only the public half
        let key_pair = KeyPair {
            public_key: public_key.to_vec(),
            secret_key: Vec::new(),
        };
        let wallet_id = wallet_id(generation, network, self.workchain);
        let wallet = TonWallet::derive(
            self.workchain as i32,
            wallet_version(generation),
            &key_pair,
            wallet_id,
        )
        .map_err(|e| contract_error(generation, e))?;
        let address = Address::try_from(&wallet.address).map_err(|reason| WalletError::Contract {
            generation,
            reason,
        })?;

        let descriptor = WalletContractDescriptor {
            generation,
            workchain: self.workchain,
            network,
            wallet_id,
            address,
        };
        self.descriptors
            .entry((generation, public_key, network))
            .or_insert_with(|| descriptor.clone());

        tracing::debug!(
            generation = %generation,
            address = %descriptor.address.to_raw_string(),
            "Wallet contract opened"
        );

        Ok(WalletContract {
            descriptor,
            public_key,
            wallet,
        })
    }

    /// Derive the descriptor for a tuple, serving repeats from the cache
    pub fn derive_descriptor(
        &self,
        generation: WalletGeneration,
        public_key: &[u8],
        network: Network,
    ) -> WalletResult<WalletContractDescriptor> {
        if let Ok(key) = <[u8; 32]>::try_from(public_key) {
            if let Some(hit) = self.descriptors.get(&(generation, key, network)) {
                return Ok(hit.value().clone());
            }
        }
        self.open(generation, public_key, network)
            .map(|contract| contract.descriptor)
    }

    pub fn cached_descriptors(&self) -> usize {
        self.descriptors.len()
    }
}
