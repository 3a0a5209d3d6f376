//! Caller-facing request types, one per transfer kind
//!
//! Requests own the sender's [`SigningIdentity`]; it is dropped (and its
//! secret zeroized) when the orchestrator call returns.
//!
//! Optional account snapshots bypass the ledger lookup. A supplied snapshot
//! is trusted as fresh.

use crate::cell::Address;
use crate::types::{Account, AdminFee, WalletGeneration};
use crate::wallet::SigningIdentity;

/// Admin fee skim: where it goes, how much, and its bounce flag
#[derive(Debug, Clone, PartialEq)]
pub struct AdminFeeSpec {
    pub address: Address,
    pub fee: AdminFee,
    pub bounce: bool,
}

impl AdminFeeSpec {
    pub fn new(address: Address, fee: AdminFee) -> Self {
        Self {
            address,
            fee,
            bounce: false,
        }
    }

    pub fn with_bounce(mut self, bounce: bool) -> Self {
        self.bounce = bounce;
        self
    }
}

/// Plain native-currency transfer
#[derive(Debug)]
pub struct TransferRequest {
    pub identity: SigningIdentity,
    /// Defaults to the orchestrator's configured generation
    pub generation: Option<WalletGeneration>,
    pub recipient: Address,
    pub value: u64,
    /// Percent fees are taken from `value`
    pub admin: Option<AdminFeeSpec>,
    /// Overrides the recipient-status based bounce flag
    pub bounce: Option<bool>,
    pub sender_account: Option<Account>,
    pub recipient_account: Option<Account>,
    pub memo: Option<String>,
    /// Emulate against the sender's real balance
    pub estimate_fee: bool,
    pub seqno: Option<u32>,
}

impl TransferRequest {
    pub fn new(identity: SigningIdentity, recipient: Address, value: u64) -> Self {
        Self {
            identity,
            generation: None,
            recipient,
            value,
            admin: None,
            bounce: None,
            sender_account: None,
            recipient_account: None,
            memo: None,
            estimate_fee: false,
            seqno: None,
        }
    }
}

/// Token transfer routed through the sender's token wallet
#[derive(Debug)]
pub struct JettonTransferRequest {
    pub identity: SigningIdentity,
    pub generation: Option<WalletGeneration>,
    /// Sender's token wallet contract
    pub token_wallet: Address,
    /// Token owner receiving `amount`
    pub recipient: Address,
    /// Token units
    pub amount: u128,
    /// Paid in token units through the same token wallet
    pub admin: Option<AdminFeeSpec>,
    pub bounce: Option<bool>,
    pub sender_account: Option<Account>,
    pub recipient_account: Option<Account>,
    pub memo: Option<String>,
    /// Caller's fee estimate; halved and floored into the attached value
    pub network_fee: Option<u64>,
    /// Overrides the configured fee floor
    pub min_fee: Option<u64>,
    /// Emulate against the synthetic emulation balance instead of the ledger's
    pub estimate_fee: bool,
    pub seqno: Option<u32>,
}

impl JettonTransferRequest {
    pub fn new(identity: SigningIdentity, token_wallet: Address, recipient: Address, amount: u128) -> Self {
        Self {
            identity,
            generation: None,
            token_wallet,
            recipient,
            amount,
            admin: None,
            bounce: None,
            sender_account: None,
            recipient_account: None,
            memo: None,
            network_fee: None,
            min_fee: None,
            estimate_fee: false,
            seqno: None,
        }
    }
}

/// Token transfer into a lock contract; no admin leg
#[derive(Debug)]
pub struct LockTransferRequest {
    pub identity: SigningIdentity,
    pub generation: Option<WalletGeneration>,
    pub token_wallet: Address,
    pub recipient: Address,
    pub amount: u128,
    pub bounce: Option<bool>,
    pub sender_account: Option<Account>,
    pub recipient_account: Option<Account>,
    pub memo: Option<String>,
    pub network_fee: Option<u64>,
    pub min_fee: Option<u64>,
    pub estimate_fee: bool,
    pub seqno: Option<u32>,
}

impl LockTransferRequest {
    pub fn new(identity: SigningIdentity, token_wallet: Address, recipient: Address, amount: u128) -> Self {
        Self {
            identity,
            generation: None,
            token_wallet,
            recipient,
            amount,
            bounce: None,
            sender_account: None,
            recipient_account: None,
            memo: None,
            network_fee: None,
            min_fee: None,
            estimate_fee: false,
            seqno: None,
        }
    }
}

/// Token leg of a swap
///
/// The identity is typically built from an already expanded 64-byte secret
/// with [`SigningIdentity::from_expanded`].
#[derive(Debug)]
pub struct SwapTransferRequest {
    pub identity: SigningIdentity,
    pub generation: Option<WalletGeneration>,
    pub token_wallet: Address,
    /// Swap router receiving the tokens
    pub recipient: Address,
    pub amount: u128,
    /// Attached as is, subject to the fee floor
    pub network_fee: u64,
    pub min_fee: Option<u64>,
    pub sender_account: Option<Account>,
    pub memo: Option<String>,
    pub estimate_fee: bool,
    pub seqno: Option<u32>,
}

impl SwapTransferRequest {
    pub fn new(
        identity: SigningIdentity,
        token_wallet: Address,
        recipient: Address,
        amount: u128,
        network_fee: u64,
    ) -> Self {
        Self {
            identity,
            generation: None,
            token_wallet,
            recipient,
            amount,
            network_fee,
            min_fee: None,
            sender_account: None,
            memo: None,
            estimate_fee: false,
            seqno: None,
        }
    }
}

/// Native value sent to a swap router; never bounces
#[derive(Debug)]
pub struct NativeSwapRequest {
    pub identity: SigningIdentity,
    pub generation: Option<WalletGeneration>,
    pub recipient: Address,
    pub value: u64,
    pub sender_account: Option<Account>,
    /// Emulate against the sender's real balance
    pub estimate_fee: bool,
    pub seqno: Option<u32>,
}

impl NativeSwapRequest {
    pub fn new(identity: SigningIdentity, recipient: Address, value: u64) -> Self {
        Self {
            identity,
            generation: None,
            recipient,
            value,
            sender_account: None,
            estimate_fee: false,
            seqno: None,
        }
    }
}

/// NFT ownership transfer
#[derive(Debug)]
pub struct NftTransferRequest {
    pub identity: SigningIdentity,
    pub generation: Option<WalletGeneration>,
    /// NFT item contract
    pub item: Address,
    pub new_owner: Address,
    /// Native value attached to the item message
    pub value: u64,
    /// Native value paid straight to the admin address
    pub admin: Option<AdminFeeSpec>,
    pub sender_account: Option<Account>,
    /// Emulate against the sender's real balance instead of a synthetic one
    pub realistic: bool,
    pub seqno: Option<u32>,
}

impl NftTransferRequest {
    pub fn new(identity: SigningIdentity, item: Address, new_owner: Address, value: u64) -> Self {
        Self {
            identity,
            generation: None,
            item,
            new_owner,
            value,
            admin: None,
            sender_account: None,
            realistic: false,
            seqno: None,
        }
    }
}

/// Maximum sendable amount after network and admin fees
#[derive(Debug)]
pub struct MaxEstimateRequest {
    pub identity: SigningIdentity,
    pub generation: Option<WalletGeneration>,
    pub recipient: Address,
    pub admin_address: Address,
    /// Fraction in `[0, 1]`
    pub admin_percent: f64,
    pub sender_account: Option<Account>,
}

impl MaxEstimateRequest {
    pub fn new(identity: SigningIdentity, recipient: Address, admin_address: Address, admin_percent: f64) -> Self {
        Self {
            identity,
            generation: None,
            recipient,
            admin_address,
            admin_percent,
            sender_account: None,
        }
    }
}
