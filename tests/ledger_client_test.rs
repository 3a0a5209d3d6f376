//! Integration tests for the ledger HTTP client
//!
//! This test validates:
//! - Request paths and bearer authentication
//! - Response decoding into accounts, seqnos and emulation results
//! - Error classification (ledger vs. decode vs. transport)
//! - The emulation request body

use mockito::Matcher;
use serde_json::json;
use ton_transfer::cell::Address;
use ton_transfer::rpc::{
    ActionStatus, EmulationParams, HttpLedgerClient, LedgerApiConfig, LedgerQueryClient, RpcError,
};
use ton_transfer::test_utils::sample_message;
use ton_transfer::types::AccountStatus;

const RAW: &str = "0:0101010101010101010101010101010101010101010101010101010101010101";

fn client(url: &str) -> HttpLedgerClient {
    HttpLedgerClient::new(LedgerApiConfig::new(url).with_api_key("secret").with_timeout_ms(5_000)).unwrap()
}

fn address() -> Address {
    RAW.parse().unwrap()
}

#[tokio::test]
async fn test_get_account_decodes_snapshot() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", format!("/v2/accounts/{}", RAW).as_str())
        .match_header("authorization", "Bearer secret")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"address": RAW, "balance": 10_000_000_000u64, "status": "active", "seqno": 17}).to_string())
        .create_async()
        .await;

    let account = client(&server.url()).get_account(&address()).await.unwrap();
    assert_eq!(account.address, address());
    assert_eq!(account.balance, 10_000_000_000);
    assert_eq!(account.status, AccountStatus::Active);
    assert_eq!(account.seqno, Some(17));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_nonexistent_account_is_uninitialized() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", format!("/v2/accounts/{}", RAW).as_str())
        .with_status(200)
        .with_body(json!({"address": RAW, "status": "nonexist"}).to_string())
        .create_async()
        .await;

    let account = client(&server.url()).get_account(&address()).await.unwrap();
    assert_eq!(account.balance, 0);
    assert_eq!(account.status, AccountStatus::Uninitialized);
    assert_eq!(account.seqno, None);
}

#[tokio::test]
async fn test_get_seqno() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", format!("/v2/wallet/{}/seqno", RAW).as_str())
        .with_status(200)
        .with_body(r#"{"seqno": 42}"#)
        .create_async()
        .await;

    assert_eq!(client(&server.url()).get_seqno(&address()).await.unwrap(), 42);
}

#[tokio::test]
async fn test_ledger_error_keeps_api_message() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", format!("/v2/wallet/{}/seqno", RAW).as_str())
        .with_status(404)
        .with_body(r#"{"error": "entity not found"}"#)
        .create_async()
        .await;

    let err = client(&server.url()).get_seqno(&address()).await.unwrap_err();
    match err {
        RpcError::Ledger { code, message, .. } => {
            assert_eq!(code, 404);
            assert_eq!(message, "entity not found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", format!("/v2/wallet/{}/seqno", RAW).as_str())
        .with_status(200)
        .with_body("not json")
        .create_async()
        .await;

    let err = client(&server.url()).get_seqno(&address()).await.unwrap_err();
    assert!(matches!(err, RpcError::Decode { .. }));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_emulation_sends_balance_overrides() {
    let mut server = mockito::Server::new_async().await;
    let message = sample_message(3);
    let mock = server
        .mock("POST", "/v2/wallet/emulate")
        .match_body(Matcher::PartialJson(json!({
            "boc": message.boc_base64(),
            "params": [{"address": RAW, "balance": 100_000_000_000u64}]
        })))
        .with_status(200)
        .with_body(
            json!({
                "event": {
                    "event_id": "e1",
                    "actions": [{"type": "TonTransfer", "status": "ok"}],
                    "extra": -7_000_000
                },
                "risk": {"transfer_all_remaining_balance": false, "ton": 1_000_000_000},
                "trace": {}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let result = client(&server.url())
        .emulate_message(
            message.boc_base64(),
            &[EmulationParams::new(address(), Some(100_000_000_000))],
        )
        .await
        .unwrap();
    assert_eq!(result.network_fee(), 7_000_000);
    assert_eq!(result.event.actions[0].status, ActionStatus::Ok);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_broadcast_returns_message_hash() {
    let mut server = mockito::Server::new_async().await;
    let message = sample_message(1);
    let mock = server
        .mock("POST", "/v2/blockchain/message")
        .match_body(Matcher::Json(json!({"boc": message.boc_base64()})))
        .with_status(200)
        .create_async()
        .await;

    let tx_id = client(&server.url())
        .broadcast_message(message.boc_base64())
        .await
        .unwrap();
    assert_eq!(tx_id, message.hash());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_broadcast_rejects_garbage_before_sending() {
    let server = mockito::Server::new_async().await;
    let err = client(&server.url())
        .broadcast_message("%%%")
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    // Nothing listens on port 9 on loopback
    let err = client("http://127.0.0.1:9")
        .get_seqno(&address())
        .await
        .unwrap_err();
    assert!(err.is_network());
    assert!(err.is_retryable());
}
