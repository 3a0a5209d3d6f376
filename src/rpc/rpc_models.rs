//! JSON shapes exchanged with the ledger HTTP API

use crate::cell::Address;
use crate::types::{Account, AccountStatus};
use serde::{Deserialize, Serialize};

use super::{RpcError, RpcResult};

/// `GET /v2/accounts/{address}`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AccountResponse {
    pub address: String,
    #[serde(default)]
    pub balance: u64,
    pub status: String,
    /// Reported by wallet-aware backends only
    #[serde(default)]
    pub seqno: Option<u32>,
}

impl AccountResponse {
    pub(crate) fn into_account(self, endpoint: &str) -> RpcResult<Account> {
        let address: Address = self.address.parse().map_err(|e| RpcError::Decode {
            endpoint: endpoint.to_string(),
            message: format!("account address: {}", e),
        })?;
        let account = Account::new(address, self.balance, AccountStatus::from_api(&self.status));
        Ok(match self.seqno {
            Some(seqno) => account.with_seqno(seqno),
            None => account,
        })
    }
}

/// `GET /v2/wallet/{address}/seqno`
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SeqnoResponse {
    pub seqno: u32,
}

/// Error payload of a non-success response
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub error: String,
}

/// Assumed state of one account during emulation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmulationParams {
    pub address: Address,
    /// Balance to assume; the account's real balance when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<u64>,
}

impl EmulationParams {
    pub fn new(address: Address, balance: Option<u64>) -> Self {
        Self { address, balance }
    }
}

/// `POST /v2/wallet/emulate` request
#[derive(Debug, Serialize)]
pub(crate) struct EmulateRequest<'a> {
    pub boc: &'a str,
    pub params: &'a [EmulationParams],
}

/// `POST /v2/blockchain/message` request
#[derive(Debug, Serialize)]
pub(crate) struct BroadcastRequest<'a> {
    pub boc: &'a str,
}

/// Outcome of one emulated action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Ok,
    Failed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmulatedAction {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub status: ActionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmulatedEvent {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub actions: Vec<EmulatedAction>,
    /// Net value change of the wallet; negative when it paid fees
    #[serde(default)]
    pub extra: i64,
}

/// What the emulated message would move out of the wallet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskSummary {
    #[serde(default)]
    pub transfer_all_remaining_balance: bool,
    #[serde(default)]
    pub ton: i64,
    #[serde(default)]
    pub jettons: Vec<serde_json::Value>,
    #[serde(default)]
    pub nfts: Vec<serde_json::Value>,
}

/// One-shot emulation snapshot; never cached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmulationResult {
    pub event: EmulatedEvent,
    #[serde(default)]
    pub risk: RiskSummary,
    #[serde(default)]
    pub trace: serde_json::Value,
}

impl EmulationResult {
    /// Indices of actions that failed in emulation
    pub fn failed_actions(&self) -> Vec<usize> {
        self.event
            .actions
            .iter()
            .enumerate()
            .filter(|(_, a)| a.status == ActionStatus::Failed)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn has_failed_action(&self) -> bool {
        self.event
            .actions
            .iter()
            .any(|a| a.status == ActionStatus::Failed)
    }

    /// Aggregate fee as a positive amount (`|extra|`)
    pub fn network_fee(&self) -> u64 {
        self.event.extra.unsigned_abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emulation_result_parsing() {
        let json = r#"{
            "event": {
                "event_id": "abc",
                "actions": [
                    {"type": "TonTransfer", "status": "ok"},
                    {"type": "JettonTransfer", "status": "failed"},
                    {"type": "Unknown", "status": "pending"}
                ],
                "extra": -4532100,
                "lt": 1
            },
            "risk": {"transfer_all_remaining_balance": false, "ton": 1000, "jettons": [], "nfts": []},
            "trace": {"transaction": {}}
        }"#;
        let result: EmulationResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.network_fee(), 4_532_100);
        assert!(result.has_failed_action());
        assert_eq!(result.failed_actions(), vec![1]);
        assert_eq!(result.event.actions[2].status, ActionStatus::Unknown);
        assert_eq!(result.risk.ton, 1000);
    }

    #[test]
    fn test_emulation_params_skip_missing_balance() {
        let addr = Address::new(0, [1u8; 32]);
        let json = serde_json::to_value(EmulationParams::new(addr, None)).unwrap();
        assert!(json.get("balance").is_none());
        assert_eq!(json["address"], addr.to_raw_string());

        let json = serde_json::to_value(EmulationParams::new(addr, Some(5))).unwrap();
        assert_eq!(json["balance"], 5);
    }

    #[test]
    fn test_account_response_mapping() {
        let body = AccountResponse {
            address: format!("0:{}", "ab".repeat(32)),
            balance: 42,
            status: "nonexist".to_string(),
            seqno: None,
        };
        let account = body.into_account("/v2/accounts/x").unwrap();
        assert_eq!(account.balance, 42);
        assert_eq!(account.status, AccountStatus::Uninitialized);
        assert_eq!(account.seqno, None);

        let bad = AccountResponse {
            address: "garbage".to_string(),
            balance: 0,
            status: "active".to_string(),
            seqno: None,
        };
        assert!(matches!(
            bad.into_account("/v2/accounts/x"),
            Err(RpcError::Decode { .. })
        ));
    }

    #[test]
    fn test_account_response_keeps_reported_seqno() {
        let json = format!(
            r#"{{"address": "0:{}", "balance": 7, "status": "active", "seqno": 31}}"#,
            "cd".repeat(32)
        );
        let body: AccountResponse = serde_json::from_str(&json).unwrap();
        let account = body.into_account("/v2/accounts/x").unwrap();
        assert_eq!(account.seqno, Some(31));
        assert!(account.status.is_active());

        let json = format!(r#"{{"address": "0:{}", "status": "active"}}"#, "cd".repeat(32));
        let body: AccountResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(body.into_account("/v2/accounts/x").unwrap().seqno, None);
    }
}
