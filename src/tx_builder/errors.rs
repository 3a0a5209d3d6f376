//! Error types for the transaction pipeline
//!
//! One taxonomy for every orchestrator call. Lower layers keep their own
//! error enums ([`CellError`], [`WalletError`], [`RpcError`]) and convert
//! into this one at the pipeline boundary:
//! - Malformed input fails before any network call
//! - Network failures stay distinct from ledger-reported errors
//! - A failed emulated action is a build failure, never a partial result

use crate::cell::{CellError, TonCellError};
use crate::rpc::RpcError;
use crate::wallet::WalletError;
use thiserror::Error;

/// Error returned by every transaction orchestrator
///
/// `Err` means "did not transfer": nothing was broadcast and no partially
/// built message is handed out.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransactionBuilderError {
    /// Caller-supplied input is unusable (address text, amounts, percent)
    #[error("Invalid input ({field}): {reason}")]
    InvalidInput { field: String, reason: String },

    /// Key material or wallet contract problem
    #[error("Wallet error: {0}")]
    Wallet(WalletError),

    /// The ledger could not be reached
    #[error("Network error: {0}")]
    Network(RpcError),

    /// The ledger answered with an error
    #[error("Ledger error: {0}")]
    Ledger(RpcError),

    /// Seqno lookup failed and the fallback policy is to abort
    #[error("Seqno unavailable: {0}")]
    SeqnoUnavailable(RpcError),

    /// At least one emulated action failed
    #[error("Emulation failed: actions {failed_actions:?} of {total_actions} failed")]
    EmulationFailed {
        failed_actions: Vec<usize>,
        total_actions: usize,
    },

    /// Balance cannot cover the emulated network fee
    #[error("Insufficient balance: have {balance}, need at least {required}")]
    InsufficientBalance { balance: u64, required: u64 },

    /// The instruction set for a transfer kind could not be formed
    #[error("Instruction build error (kind={kind}): {reason}")]
    InstructionBuild { kind: String, reason: String },

    /// Message cells or wire encoding could not be produced
    #[error("Serialization error: {0}")]
    Serialization(CellError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal invariant violation
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TransactionBuilderError {
    /// Whether a fresh attempt (with a freshly resolved seqno) could succeed
    ///
    /// Nothing in the pipeline retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::SeqnoUnavailable(_) => true,
            Self::Ledger(e) => e.is_retryable(),

            Self::InvalidInput { .. } => false,
            Self::Wallet(_) => false,
            Self::EmulationFailed { .. } => false,
            Self::InsufficientBalance { .. } => false,
            Self::InstructionBuild { .. } => false,
            Self::Serialization(_) => false,
            Self::Configuration(_) => false,
            Self::Internal(_) => false,
        }
    }

    /// Error category for metrics and logs
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "invalid_input",
            Self::Wallet(_) => "wallet",
            Self::Network(_) => "network",
            Self::Ledger(_) => "ledger",
            Self::SeqnoUnavailable(_) => "seqno",
            Self::EmulationFailed { .. } => "emulation",
            Self::InsufficientBalance { .. } => "balance",
            Self::InstructionBuild { .. } => "instruction",
            Self::Serialization(_) => "serialization",
            Self::Configuration(_) => "config",
            Self::Internal(_) => "internal",
        }
    }
}

// Convenience constructors
impl TransactionBuilderError {
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn instruction_failed(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InstructionBuild {
            kind: kind.into(),
            reason: reason.into(),
        }
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal(reason.into())
    }
}

impl From<RpcError> for TransactionBuilderError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::Transport { .. } | RpcError::Timeout { .. } => Self::Network(err),
            RpcError::Configuration(msg) => Self::Configuration(msg),
            RpcError::InvalidRequest(msg) => Self::invalid_input("wire_message", msg),
            RpcError::Ledger { .. } | RpcError::Decode { .. } => Self::Ledger(err),
        }
    }
}

impl From<WalletError> for TransactionBuilderError {
    fn from(err: WalletError) -> Self {
        match err {
            WalletError::Cell(e) => Self::Serialization(e),
            other => Self::Wallet(other),
        }
    }
}

impl From<CellError> for TransactionBuilderError {
    fn from(err: CellError) -> Self {
        match err {
            CellError::InvalidAddress { input, reason } => Self::InvalidInput {
                field: "address".to_string(),
                reason: format!("'{}': {}", input, reason),
            },
            other => Self::Serialization(other),
        }
    }
}

impl From<TonCellError> for TransactionBuilderError {
    fn from(err: TonCellError) -> Self {
        Self::Serialization(err.into())
    }
}

pub type TxResult<T> = std::result::Result<T, TransactionBuilderError>;
