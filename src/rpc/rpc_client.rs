//! Ledger query client
//!
//! [`LedgerQueryClient`] is the seam the transaction pipeline talks through;
//! [`HttpLedgerClient`] implements it over the ledger's HTTP API. Every call
//! is single-attempt: the client applies a finite timeout and never retries.

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::rpc_config::LedgerApiConfig;
use super::rpc_models::{
    AccountResponse, ApiErrorBody, BroadcastRequest, EmulateRequest, EmulationParams,
    EmulationResult, SeqnoResponse,
};
use super::{RpcError, RpcResult};
use crate::cell::{cell_hash_hex, decode_boc_base64, Address};
use crate::metrics::{metrics, Timer};
use crate::types::Account;

/// Read and submit operations the pipeline needs from the ledger
#[async_trait]
pub trait LedgerQueryClient: Send + Sync {
    /// Current account snapshot (balance, status)
    async fn get_account(&self, address: &Address) -> RpcResult<Account>;

    /// Current seqno; only meaningful for active wallets
    async fn get_seqno(&self, address: &Address) -> RpcResult<u32>;

    /// Emulate a base64 wire message against assumed account balances
    async fn emulate_message(
        &self,
        boc: &str,
        params: &[EmulationParams],
    ) -> RpcResult<EmulationResult>;

    /// Submit a base64 wire message; returns the message hash (hex)
    async fn broadcast_message(&self, boc: &str) -> RpcResult<String>;
}

/// HTTP implementation of [`LedgerQueryClient`]
#[derive(Debug, Clone)]
pub struct HttpLedgerClient {
    client: Client,
    config: LedgerApiConfig,
}

impl HttpLedgerClient {
    pub fn new(config: LedgerApiConfig) -> RpcResult<Self> {
        config.validate()?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        if let Some(key) = config.api_key.as_deref() {
            let value = header::HeaderValue::from_str(&format!("Bearer {}", key))
                .map_err(|_| RpcError::Configuration("api key is not a valid header value".to_string()))?;
            headers.insert(header::AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| RpcError::Configuration(format!("http client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &LedgerApiConfig {
        &self.config
    }

    fn map_send_error(&self, endpoint: &str, err: reqwest::Error) -> RpcError {
        if err.is_timeout() {
            RpcError::Timeout {
                endpoint: endpoint.to_string(),
                timeout_ms: self.config.timeout_ms,
            }
        } else {
            RpcError::Transport {
                endpoint: endpoint.to_string(),
                message: err.to_string(),
            }
        }
    }

    /// Send a request and return the raw body of a success response
    async fn execute(&self, endpoint: &str, request: reqwest::RequestBuilder) -> RpcResult<String> {
        let timer = Timer::new();
        metrics().rpc_requests.inc();

        let result = async {
            let response = request
                .send()
                .await
                .map_err(|e| self.map_send_error(endpoint, e))?;
            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| self.map_send_error(endpoint, e))?;

            if status.is_success() {
                Ok(body)
            } else {
                Err(ledger_error(endpoint, status, &body))
            }
        }
        .await;

        timer.observe_duration(&metrics().rpc_latency);
        if let Err(e) = &result {
            metrics().rpc_errors.inc();
            warn!(endpoint = %endpoint, category = e.category(), error = %e, "Ledger API call failed");
        }
        result
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> RpcResult<T> {
        let request = self.client.get(self.config.endpoint_url(endpoint));
        let body = self.execute(endpoint, request).await?;
        decode(endpoint, &body)
    }

    async fn post_json<B: Serialize + Sync>(&self, endpoint: &str, payload: &B) -> RpcResult<String> {
        let request = self
            .client
            .post(self.config.endpoint_url(endpoint))
            .json(payload);
        self.execute(endpoint, request).await
    }
}

fn decode<T: DeserializeOwned>(endpoint: &str, body: &str) -> RpcResult<T> {
    serde_json::from_str(body).map_err(|e| RpcError::Decode {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })
}

fn ledger_error(endpoint: &str, status: StatusCode, body: &str) -> RpcError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| {
            if body.trim().is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("unknown error")
                    .to_string()
            } else {
                body.trim().to_string()
            }
        });
    RpcError::Ledger {
        endpoint: endpoint.to_string(),
        code: status.as_u16(),
        message,
    }
}

#[async_trait]
impl LedgerQueryClient for HttpLedgerClient {
    #[instrument(skip(self, address), fields(address = %address.to_raw_string()))]
    async fn get_account(&self, address: &Address) -> RpcResult<Account> {
        let endpoint = format!("/v2/accounts/{}", address.to_raw_string());
        let response: AccountResponse = self.get_json(&endpoint).await?;
        let account = response.into_account(&endpoint)?;
        debug!(balance = account.balance, status = ?account.status, "Account fetched");
        Ok(account)
    }

    #[instrument(skip(self, address), fields(address = %address.to_raw_string()))]
    async fn get_seqno(&self, address: &Address) -> RpcResult<u32> {
        let endpoint = format!("/v2/wallet/{}/seqno", address.to_raw_string());
        let response: SeqnoResponse = self.get_json(&endpoint).await?;
        debug!(seqno = response.seqno, "Seqno fetched");
        Ok(response.seqno)
    }

    #[instrument(skip(self, boc, params), fields(accounts = params.len()))]
    async fn emulate_message(
        &self,
        boc: &str,
        params: &[EmulationParams],
    ) -> RpcResult<EmulationResult> {
        let endpoint = "/v2/wallet/emulate";
        let body = self
            .post_json(endpoint, &EmulateRequest { boc, params })
            .await?;
        let result: EmulationResult = decode(endpoint, &body)?;
        debug!(
            actions = result.event.actions.len(),
            extra = result.event.extra,
            "Emulation finished"
        );
        Ok(result)
    }

    #[instrument(skip(self, boc))]
    async fn broadcast_message(&self, boc: &str) -> RpcResult<String> {
        let root = decode_boc_base64(boc)
            .map_err(|e| RpcError::InvalidRequest(format!("wire message: {}", e)))?;
        let endpoint = "/v2/blockchain/message";
        self.post_json(endpoint, &BroadcastRequest { boc }).await?;
        let tx_id = cell_hash_hex(&root);
        debug!(tx_id = %tx_id, "Message broadcast");
        Ok(tx_id)
    }
}
