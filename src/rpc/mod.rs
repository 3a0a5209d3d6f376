//! Ledger query client
//!
//! Thin, retryless access to the ledger HTTP API: account lookup, seqno
//! lookup, message emulation and message broadcast.

pub mod rpc_client;
pub mod rpc_config;
pub mod rpc_errors;
pub mod rpc_models;

pub use rpc_client::{HttpLedgerClient, LedgerQueryClient};
pub use rpc_config::LedgerApiConfig;
pub use rpc_errors::{RpcError, RpcResult};
pub use rpc_models::{
    ActionStatus, EmulatedAction, EmulatedEvent, EmulationParams, EmulationResult, RiskSummary,
};
