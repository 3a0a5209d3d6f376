//! Test Utilities Module
//!
//! In-memory ledger client and fixtures for deterministic pipeline tests.
//! Nothing here touches the network.
//!
//! These utilities are only compiled when running tests or when the
//! `test_utils` feature is enabled.

#![cfg(any(test, feature = "test_utils"))]

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::cell::{cell_hash_hex, decode_boc_base64, Address, ArcCell, Cell};
use crate::rpc::{
    ActionStatus, EmulatedAction, EmulatedEvent, EmulationParams, EmulationResult, LedgerQueryClient, RiskSummary,
    RpcError, RpcResult,
};
use crate::tx_builder::{AssembledMessage, ExternalMessageAssembler, InstructionBuilder, TransferSpec};
use crate::types::{Account, AccountStatus, Network, WalletGeneration};
use crate::wallet::{SigningIdentity, WalletFactory};

/// Fee reported by the mock when no emulation result is configured
pub const DEFAULT_MOCK_FEE: i64 = -5_000_000;

fn mock_transport_error(endpoint: &str) -> RpcError {
    RpcError::Transport {
        endpoint: endpoint.to_string(),
        message: "connection refused (mock)".to_string(),
    }
}

/// Mock LedgerQueryClient for testing
///
/// Unknown accounts are reported as uninitialized with a zero balance, the
/// way the ledger reports addresses it has never seen.
#[derive(Debug, Default)]
pub struct MockLedgerClient {
    accounts: DashMap<Address, Account>,
    seqno: u32,
    emulation: Option<EmulationResult>,
    fail_accounts: bool,
    fail_seqno: bool,
    fail_emulation: bool,
    fail_broadcast: bool,

    account_calls: AtomicUsize,
    seqno_calls: AtomicUsize,
    emulation_calls: AtomicUsize,
    broadcast_calls: AtomicUsize,
    last_params: Mutex<Option<Vec<EmulationParams>>>,
    last_boc: Mutex<Option<String>>,
}

impl MockLedgerClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seqno(mut self, seqno: u32) -> Self {
        self.seqno = seqno;
        self
    }

    pub fn with_account(self, account: Account) -> Self {
        self.insert_account(account);
        self
    }

    pub fn with_emulation(mut self, result: EmulationResult) -> Self {
        self.emulation = Some(result);
        self
    }

    pub fn failing_accounts(mut self) -> Self {
        self.fail_accounts = true;
        self
    }

    pub fn failing_seqno(mut self) -> Self {
        self.fail_seqno = true;
        self
    }

    pub fn failing_emulation(mut self) -> Self {
        self.fail_emulation = true;
        self
    }

    pub fn failing_broadcast(mut self) -> Self {
        self.fail_broadcast = true;
        self
    }

    pub fn insert_account(&self, account: Account) {
        self.accounts.insert(account.address, account);
    }

    pub fn account_calls(&self) -> usize {
        self.account_calls.load(Ordering::SeqCst)
    }

    pub fn seqno_calls(&self) -> usize {
        self.seqno_calls.load(Ordering::SeqCst)
    }

    pub fn emulation_calls(&self) -> usize {
        self.emulation_calls.load(Ordering::SeqCst)
    }

    pub fn broadcast_calls(&self) -> usize {
        self.broadcast_calls.load(Ordering::SeqCst)
    }

    /// Account overrides sent with the most recent emulation
    pub fn last_emulation_params(&self) -> Option<Vec<EmulationParams>> {
        self.last_params
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Wire message of the most recent broadcast
    pub fn last_broadcast(&self) -> Option<String> {
        self.last_boc
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl LedgerQueryClient for MockLedgerClient {
    async fn get_account(&self, address: &Address) -> RpcResult<Account> {
        self.account_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_accounts {
            return Err(mock_transport_error("/v2/accounts"));
        }
        Ok(self
            .accounts
            .get(address)
            .map(|a| a.value().clone())
            .unwrap_or_else(|| uninit_account(*address)))
    }

    async fn get_seqno(&self, _address: &Address) -> RpcResult<u32> {
        self.seqno_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_seqno {
            return Err(mock_transport_error("/v2/wallet/seqno"));
        }
        Ok(self.seqno)
    }

    async fn emulate_message(&self, _boc: &str, params: &[EmulationParams]) -> RpcResult<EmulationResult> {
        self.emulation_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_params.lock().unwrap_or_else(|e| e.into_inner()) = Some(params.to_vec());
        if self.fail_emulation {
            return Err(mock_transport_error("/v2/wallet/emulate"));
        }
        Ok(self
            .emulation
            .clone()
            .unwrap_or_else(|| emulation_result(DEFAULT_MOCK_FEE, &[ActionStatus::Ok])))
    }

    async fn broadcast_message(&self, boc: &str) -> RpcResult<String> {
        self.broadcast_calls.fetch_add(1, Ordering::SeqCst);
        let root = decode_boc_base64(boc).map_err(|e| RpcError::InvalidRequest(format!("wire message: {}", e)))?;
        if self.fail_broadcast {
            return Err(RpcError::Ledger {
                endpoint: "/v2/blockchain/message".to_string(),
                code: 500,
                message: "mock broadcast rejected".to_string(),
            });
        }
        *self.last_boc.lock().unwrap_or_else(|e| e.into_inner()) = Some(boc.to_string());
        Ok(cell_hash_hex(&root))
    }
}

pub fn active_account(address: Address, balance: u64) -> Account {
    Account::new(address, balance, AccountStatus::Active)
}

pub fn uninit_account(address: Address) -> Account {
    Account::new(address, 0, AccountStatus::Uninitialized)
}

/// Emulation outcome with the given net value change and action statuses
pub fn emulation_result(extra: i64, statuses: &[ActionStatus]) -> EmulationResult {
    EmulationResult {
        event: EmulatedEvent {
            event_id: Some("mock-event".to_string()),
            actions: statuses
                .iter()
                .map(|s| EmulatedAction {
                    kind: "TonTransfer".to_string(),
                    status: *s,
                })
                .collect(),
            extra,
        },
        risk: RiskSummary::default(),
        trace: serde_json::Value::Null,
    }
}

/// Internal messages of a signed transfer body, in on-chain execution order
///
/// V4R2 keeps them as ordered references of the body. V5R1 chains them in
/// an output action list whose root holds the last action, so the chain is
/// walked from the root and reversed.
pub fn signed_body_actions(generation: WalletGeneration, body: &Cell) -> Vec<ArcCell> {
    match generation {
        WalletGeneration::V4R2 => body.references().to_vec(),
        WalletGeneration::V5R1 => {
            let mut actions = Vec::new();
            let Some(mut node) = body.references().first().cloned() else {
                return actions;
            };
            while node.references().len() == 2 {
                actions.push(node.references()[1].clone());
                let prev = node.references()[0].clone();
                node = prev;
            }
            actions.reverse();
            actions
        }
    }
}

/// Deterministic signing identity from a fixed seed
pub fn sample_identity() -> SigningIdentity {
    SigningIdentity::from_seed(&[7u8; 32])
}

/// Signed V5R1 message carrying one 1 TON transfer
pub fn sample_message(seqno: u32) -> AssembledMessage {
    let identity = sample_identity();
    let contract = WalletFactory::new(0)
        .open(WalletGeneration::V5R1, identity.public_key(), Network::Mainnet)
        .expect("sample wallet opens");
    let plan = InstructionBuilder::new(50_000_000, 1_000_000_000)
        .build(
            &TransferSpec::Native {
                recipient: Address::new(0, [1; 32]),
                value: 1_000_000_000,
                bounce: true,
                memo: None,
            },
            None,
        )
        .expect("sample plan builds");
    ExternalMessageAssembler::new(60)
        .assemble(&contract, &plan, &identity, seqno, 1_700_000_000)
        .expect("sample message assembles")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_account_is_uninitialized() {
        let client = MockLedgerClient::new().with_account(active_account(Address::new(0, [1; 32]), 10));
        let known = client.get_account(&Address::new(0, [1; 32])).await.unwrap();
        assert!(known.status.is_active());

        let unknown = client.get_account(&Address::new(0, [2; 32])).await.unwrap();
        assert_eq!(unknown.status, AccountStatus::Uninitialized);
        assert_eq!(client.account_calls(), 2);
    }

    #[tokio::test]
    async fn test_broadcast_returns_root_hash() {
        let client = MockLedgerClient::new();
        let message = sample_message(1);
        let id = client.broadcast_message(message.boc_base64()).await.unwrap();
        assert_eq!(id, message.hash());
        assert_eq!(client.last_broadcast().as_deref(), Some(message.boc_base64()));

        assert!(client.broadcast_message("not base64!").await.is_err());
    }

    #[tokio::test]
    async fn test_failure_switches() {
        let client = MockLedgerClient::new().failing_seqno().failing_emulation();
        assert!(client.get_seqno(&Address::new(0, [1; 32])).await.unwrap_err().is_network());
        assert!(client.emulate_message("", &[]).await.is_err());
        assert_eq!(client.last_emulation_params(), Some(vec![]));
    }
}
