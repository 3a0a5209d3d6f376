//! TON wallet transfer construction
//!
//! Builds signed wallet messages (native, token, lock, swap and NFT
//! transfers), estimates their fees through emulation and submits them to
//! the ledger HTTP API.

pub mod cell;
pub mod config;
pub mod metrics;
pub mod rpc;
pub mod structured_logging;
pub mod test_utils;
pub mod tx_builder;
pub mod types;
pub mod units;
pub mod wallet;

// Re-export commonly used types
pub use cell::Address;
pub use config::Config;
pub use tx_builder::{TransactionBuilderError, TransferOrchestrator};
pub use types::{Account, AccountStatus, AdminFee, Network, WalletGeneration};
pub use wallet::SigningIdentity;
