//! Fee estimation through emulation
//!
//! Emulation is a one-shot dry run. Results are never cached: balances and
//! fees drift between emulation and broadcast.

use std::sync::Arc;
use tracing::{debug, warn};

use super::assemble::AssembledMessage;
use super::errors::{TransactionBuilderError, TxResult};
use crate::cell::Address;
use crate::metrics::{metrics, Timer};
use crate::rpc::{EmulationParams, EmulationResult, LedgerQueryClient};

/// Sender balance the emulator assumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmulationBalance {
    /// Whatever the ledger currently holds for the sender
    Ledger,
    /// An explicit balance, real or synthetic
    Assumed(u64),
}

impl EmulationBalance {
    fn as_param(&self) -> Option<u64> {
        match self {
            EmulationBalance::Ledger => None,
            EmulationBalance::Assumed(b) => Some(*b),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeeEstimate {
    pub result: EmulationResult,
    /// `|extra|` of the emulated event
    pub network_fee: u64,
    /// `network_fee` with the safety margin, rounded up
    pub fee_with_margin: u64,
}

/// `ceil(fee * (100 + margin_percent) / 100)`
pub fn apply_margin(fee: u64, margin_percent: u64) -> u64 {
    let scaled = (fee as u128) * (100 + margin_percent as u128);
    u64::try_from(scaled.div_ceil(100)).unwrap_or(u64::MAX)
}

#[derive(Clone)]
pub struct FeeEstimator {
    client: Arc<dyn LedgerQueryClient>,
    margin_percent: u64,
}

impl FeeEstimator {
    pub fn new(client: Arc<dyn LedgerQueryClient>, margin_percent: u64) -> Self {
        Self {
            client,
            margin_percent,
        }
    }

    pub fn margin_percent(&self) -> u64 {
        self.margin_percent
    }

    /// Emulate `message` sent by `sender`
    ///
    /// Fails with `EmulationFailed` if any emulated action failed, even
    /// when others succeeded; no partial fee is reported.
    pub async fn estimate(
        &self,
        message: &AssembledMessage,
        sender: &Address,
        balance: EmulationBalance,
    ) -> TxResult<FeeEstimate> {
        let timer = Timer::new();
        metrics().emulations_total.inc();

        let params = [EmulationParams::new(*sender, balance.as_param())];
        let result = self
            .client
            .emulate_message(message.boc_base64(), &params)
            .await;
        timer.observe_duration(&metrics().emulation_latency);
        let result = result?;

        let failed = result.failed_actions();
        if !failed.is_empty() {
            metrics().emulations_failed.inc();
            warn!(
                hash = %message.hash(),
                failed = ?failed,
                total = result.event.actions.len(),
                "Emulated action failed"
            );
            return Err(TransactionBuilderError::EmulationFailed {
                failed_actions: failed,
                total_actions: result.event.actions.len(),
            });
        }

        let network_fee = result.network_fee();
        let fee_with_margin = apply_margin(network_fee, self.margin_percent);
        debug!(
            hash = %message.hash(),
            network_fee,
            fee_with_margin,
            actions = result.event.actions.len(),
            "Emulation succeeded"
        );
        Ok(FeeEstimate {
            result,
            network_fee,
            fee_with_margin,
        })
    }
}

impl std::fmt::Debug for FeeEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeeEstimator")
            .field("margin_percent", &self.margin_percent)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::ActionStatus;
    use crate::test_utils::{emulation_result, sample_message, MockLedgerClient};

    #[test]
    fn test_margin_rounds_up() {
        assert_eq!(apply_margin(0, 5), 0);
        assert_eq!(apply_margin(100, 5), 105);
        assert_eq!(apply_margin(7_000_001, 5), 7_350_002);
        assert_eq!(apply_margin(10, 0), 10);
    }

    #[tokio::test]
    async fn test_fee_from_extra() {
        let client = Arc::new(
            MockLedgerClient::new()
                .with_emulation(emulation_result(-12_345_678, &[ActionStatus::Ok, ActionStatus::Ok])),
        );
        let estimator = FeeEstimator::new(client.clone(), 5);
        let message = sample_message(3);

        let est = estimator
            .estimate(&message, &Address::new(0, [1; 32]), EmulationBalance::Assumed(100))
            .await
            .unwrap();
        assert_eq!(est.network_fee, 12_345_678);
        assert_eq!(est.fee_with_margin, 12_962_962);

        let params = client.last_emulation_params().unwrap();
        assert_eq!(params[0].balance, Some(100));
    }

    #[tokio::test]
    async fn test_any_failed_action_fails_estimate() {
        let client = Arc::new(MockLedgerClient::new().with_emulation(emulation_result(
            -1_000,
            &[ActionStatus::Ok, ActionStatus::Failed],
        )));
        let estimator = FeeEstimator::new(client, 5);

        let err = estimator
            .estimate(&sample_message(3), &Address::new(0, [1; 32]), EmulationBalance::Ledger)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            TransactionBuilderError::EmulationFailed {
                failed_actions: vec![1],
                total_actions: 2
            }
        );
    }

    #[tokio::test]
    async fn test_transport_failure_is_network_error() {
        let client = Arc::new(MockLedgerClient::new().failing_emulation());
        let err = FeeEstimator::new(client, 5)
            .estimate(&sample_message(3), &Address::new(0, [1; 32]), EmulationBalance::Ledger)
            .await
            .unwrap_err();
        assert_eq!(err.category(), "network");
    }
}
