//! Sequence number resolution
//!
//! Decides which seqno a new external message is signed with. The answer
//! carries its [`SeqnoSource`] so callers can tell a fetched value from the
//! degraded zero that follows a failed lookup.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use super::errors::{TransactionBuilderError, TxResult};
use crate::metrics::metrics;
use crate::rpc::LedgerQueryClient;
use crate::types::Account;

/// What to do when the seqno lookup for an active account fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeqnoFallback {
    /// Sign with seqno 0 and report [`SeqnoSource::FallbackAfterLookupFailure`]
    #[default]
    Zero,
    /// Fail the call with [`TransactionBuilderError::SeqnoUnavailable`]
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeqnoSource {
    CallerSupplied,
    Fetched,
    /// Account is not active; a fresh wallet always starts at 0
    Undeployed,
    FallbackAfterLookupFailure,
}

impl fmt::Display for SeqnoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SeqnoSource::CallerSupplied => "caller_supplied",
            SeqnoSource::Fetched => "fetched",
            SeqnoSource::Undeployed => "undeployed",
            SeqnoSource::FallbackAfterLookupFailure => "fallback_after_lookup_failure",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeqnoResolution {
    pub seqno: u32,
    pub source: SeqnoSource,
}

impl SeqnoResolution {
    pub fn new(seqno: u32, source: SeqnoSource) -> Self {
        Self { seqno, source }
    }

    /// The value is a guess made after a failed lookup
    pub fn is_fallback(&self) -> bool {
        self.source == SeqnoSource::FallbackAfterLookupFailure
    }

    /// Messages signed with seqno 0 carry the wallet's deploy data
    pub fn needs_state_init(&self) -> bool {
        self.seqno == 0
    }
}

/// Resolves the seqno for a sender account
///
/// Holds no per-account state: two concurrent calls for the same sender can
/// resolve the same value. Callers serialize requests per sender.
#[derive(Clone)]
pub struct SequenceNumberResolver {
    client: Arc<dyn LedgerQueryClient>,
    fallback: SeqnoFallback,
}

impl SequenceNumberResolver {
    pub fn new(client: Arc<dyn LedgerQueryClient>, fallback: SeqnoFallback) -> Self {
        Self { client, fallback }
    }

    pub fn fallback(&self) -> SeqnoFallback {
        self.fallback
    }

    /// Resolve the seqno for `account`
    ///
    /// A non-active account resolves to 0 without a lookup. For an active
    /// account a caller-supplied value is used verbatim; otherwise the
    /// ledger is asked once.
    pub async fn resolve(&self, account: &Account, supplied: Option<u32>) -> TxResult<SeqnoResolution> {
        if !account.status.is_active() {
            return Ok(SeqnoResolution::new(0, SeqnoSource::Undeployed));
        }

        if let Some(seqno) = supplied {
            return Ok(SeqnoResolution::new(seqno, SeqnoSource::CallerSupplied));
        }

        metrics().seqno_fetches.inc();
        match self.client.get_seqno(&account.address).await {
            Ok(seqno) => {
                debug!(address = %account.address.to_raw_string(), seqno, "Seqno fetched");
                Ok(SeqnoResolution::new(seqno, SeqnoSource::Fetched))
            }
            Err(e) => match self.fallback {
                SeqnoFallback::Zero => {
                    metrics().seqno_fallbacks.inc();
                    warn!(
                        address = %account.address.to_raw_string(),
                        error = %e,
                        "Seqno lookup failed, signing with seqno 0"
                    );
                    Ok(SeqnoResolution::new(0, SeqnoSource::FallbackAfterLookupFailure))
                }
                SeqnoFallback::Abort => Err(TransactionBuilderError::SeqnoUnavailable(e)),
            },
        }
    }
}

impl fmt::Debug for SequenceNumberResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequenceNumberResolver")
            .field("fallback", &self.fallback)
            .finish_non_exhaustive()
    }
}
