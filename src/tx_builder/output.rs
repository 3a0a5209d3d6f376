//! Orchestrator results

use serde::Serialize;

use super::assemble::AssembledMessage;
use super::seqno::SeqnoResolution;
use super::simulate::FeeEstimate;

/// A built transfer, ready for the caller to broadcast
///
/// Holds the only copy of the signed message. Broadcasting consumes it;
/// after the wallet's seqno moves on, build a new one instead of resending.
#[derive(Debug)]
pub struct TransferOutput {
    pub message: AssembledMessage,
    /// Emulation outcome, when the transfer kind or the caller asked for one
    pub fee: Option<FeeEstimate>,
    /// Seqno the message is signed with and where it came from
    pub seqno: SeqnoResolution,
    /// Correlation id of the orchestrator call that built this
    pub correlation_id: String,
}

impl TransferOutput {
    pub fn current_seqno(&self) -> u32 {
        self.seqno.seqno
    }

    /// Fee with safety margin, if estimated
    pub fn fee_with_margin(&self) -> Option<u64> {
        self.fee.as_ref().map(|f| f.fee_with_margin)
    }

    pub fn into_message(self) -> AssembledMessage {
        self.message
    }
}

/// Largest native amount that can leave the wallet after fees
///
/// `network_fee` already includes the safety margin. The admin fee is taken
/// from what remains after the network fee, not from the gross balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MaxAmountEstimate {
    pub balance: u64,
    pub network_fee: u64,
    pub max_admin_fee: u64,
    pub max_amount: u64,
    /// `network_fee + max_admin_fee`
    pub total_fee: u64,
}

impl MaxAmountEstimate {
    /// Split `balance` into network fee, admin fee and sendable amount
    ///
    /// Returns `None` when the network fee alone exceeds the balance.
    pub fn compute(balance: u64, network_fee: u64, admin_percent: f64) -> Option<Self> {
        let remain = balance.checked_sub(network_fee)?;
        let max_admin_fee = (remain as f64 * admin_percent).floor() as u64;
        let max_admin_fee = max_admin_fee.min(remain);
        Some(Self {
            balance,
            network_fee,
            max_admin_fee,
            max_amount: remain - max_admin_fee,
            total_fee: network_fee + max_admin_fee,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_fee_from_remainder() {
        let est = MaxAmountEstimate::compute(10_000_000_000, 10_500_000, 0.05).unwrap();
        let remain = 10_000_000_000 - 10_500_000;
        assert_eq!(est.max_admin_fee, remain / 20);
        assert_eq!(est.max_amount, remain - remain / 20);
        assert_eq!(est.total_fee, 10_500_000 + remain / 20);
        assert_eq!(est.max_amount + est.total_fee, est.balance);
    }

    #[test]
    fn test_fee_above_balance() {
        assert!(MaxAmountEstimate::compute(1_000, 1_001, 0.1).is_none());
        let est = MaxAmountEstimate::compute(1_000, 1_000, 0.1).unwrap();
        assert_eq!(est.max_amount, 0);
    }

    #[test]
    fn test_zero_percent() {
        let est = MaxAmountEstimate::compute(5_000, 100, 0.0).unwrap();
        assert_eq!(est.max_admin_fee, 0);
        assert_eq!(est.max_amount, 4_900);
    }
}
