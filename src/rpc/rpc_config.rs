use serde::{Deserialize, Serialize};

use super::{RpcError, RpcResult};

/// Connection settings for the ledger HTTP API
///
/// Passed to the client constructor; there is no process-wide client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerApiConfig {
    /// Base URL, without trailing slash
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token sent with every request
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_base_url() -> String {
    "https://tonapi.io".to_string()
}

fn default_timeout_ms() -> u64 {
    60_000
}

impl Default for LedgerApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl LedgerApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Apply `TON_API_BASE_URL`, `TON_API_TOKEN` and `TON_API_TIMEOUT_MS`
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("TON_API_BASE_URL") {
            if !url.trim().is_empty() {
                self.base_url = url;
            }
        }
        if let Ok(token) = std::env::var("TON_API_TOKEN") {
            if !token.trim().is_empty() {
                self.api_key = Some(token);
            }
        }
        if let Some(ms) = std::env::var("TON_API_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.timeout_ms = ms;
        }
    }

    pub fn validate(&self) -> RpcResult<()> {
        if self.timeout_ms == 0 {
            return Err(RpcError::Configuration(
                "api timeout_ms must be greater than 0".to_string(),
            ));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(RpcError::Configuration(format!(
                "api base_url '{}' must be an http(s) URL",
                self.base_url
            )));
        }
        Ok(())
    }

    pub(crate) fn endpoint_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}
