use thiserror::Error;

/// Ledger query client errors
///
/// Network failures (`Transport`, `Timeout`) are kept apart from errors the
/// ledger API itself reported (`Ledger`), so callers can tell "could not ask"
/// from "asked and was told no".
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RpcError {
    /// Connection refused, reset, DNS failure and friends
    #[error("Transport error: {message} (endpoint: {endpoint})")]
    Transport { endpoint: String, message: String },

    /// No response within the configured timeout
    #[error("Timeout after {timeout_ms}ms (endpoint: {endpoint})")]
    Timeout { endpoint: String, timeout_ms: u64 },

    /// Non-success status with the ledger's own error message
    #[error("Ledger error: {message} (endpoint: {endpoint}, code: {code})")]
    Ledger {
        endpoint: String,
        code: u16,
        message: String,
    },

    /// Response body did not match the expected shape
    #[error("Decode error: {message} (endpoint: {endpoint})")]
    Decode { endpoint: String, message: String },

    /// Request could not be formed from the given input
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl RpcError {
    /// The request never got an answer from the ledger
    pub fn is_network(&self) -> bool {
        matches!(self, RpcError::Transport { .. } | RpcError::Timeout { .. })
    }

    /// A fresh attempt could succeed; the client itself never retries
    pub fn is_retryable(&self) -> bool {
        match self {
            RpcError::Transport { .. } | RpcError::Timeout { .. } => true,
            RpcError::Ledger { code, .. } => *code == 429 || *code >= 500,
            RpcError::Decode { .. } | RpcError::InvalidRequest(_) | RpcError::Configuration(_) => {
                false
            }
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            RpcError::Transport { .. } => "transport",
            RpcError::Timeout { .. } => "timeout",
            RpcError::Ledger { .. } => "ledger",
            RpcError::Decode { .. } => "decode",
            RpcError::InvalidRequest(_) => "invalid_request",
            RpcError::Configuration(_) => "configuration",
        }
    }
}

pub type RpcResult<T> = std::result::Result<T, RpcError>;
