//! Per-call state machine of an orchestrator
//!
//! `init -> wallet-initialized -> account-resolved -> instructions-built ->
//! message-assembled -> (fee-estimated) -> done | failed`
//!
//! Linear, no loops or retries. A [`TransferContext`] records the stage
//! reached, logs each step under one correlation id and records metrics
//! when the call ends.

use std::fmt;

use super::assemble::AssembledMessage;
use super::errors::TxResult;
use super::instructions::{InstructionPlan, TransferKind};
use super::seqno::SeqnoResolution;
use super::simulate::FeeEstimate;
use crate::metrics::{metrics, Timer};
use crate::structured_logging::TransferLogger;
use crate::types::Account;
use crate::wallet::WalletContract;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TransferStage {
    Init,
    WalletInitialized,
    AccountResolved,
    InstructionsBuilt,
    MessageAssembled,
    FeeEstimated,
    Done,
    Failed,
}

impl TransferStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStage::Init => "init",
            TransferStage::WalletInitialized => "wallet-initialized",
            TransferStage::AccountResolved => "account-resolved",
            TransferStage::InstructionsBuilt => "instructions-built",
            TransferStage::MessageAssembled => "message-assembled",
            TransferStage::FeeEstimated => "fee-estimated",
            TransferStage::Done => "done",
            TransferStage::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferStage::Done | TransferStage::Failed)
    }
}

impl fmt::Display for TransferStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub struct TransferContext {
    kind: TransferKind,
    stage: TransferStage,
    logger: TransferLogger,
    timer: Timer,
}

impl TransferContext {
    pub fn new(operation: &'static str, kind: TransferKind) -> Self {
        let logger = TransferLogger::new(operation);
        logger.log_started();
        Self {
            kind,
            stage: TransferStage::Init,
            logger,
            timer: Timer::new(),
        }
    }

    pub fn kind(&self) -> TransferKind {
        self.kind
    }

    pub fn stage(&self) -> TransferStage {
        self.stage
    }

    pub fn correlation_id(&self) -> &str {
        self.logger.context_id()
    }

    fn enter(&mut self, next: TransferStage) {
        debug_assert!(
            next > self.stage && !self.stage.is_terminal(),
            "stage {} cannot follow {}",
            next,
            self.stage
        );
        self.stage = next;
    }

    pub fn wallet_initialized(&mut self, contract: &WalletContract) {
        self.enter(TransferStage::WalletInitialized);
        self.logger.log_wallet_initialized(
            &contract.address().to_raw_string(),
            &contract.descriptor().generation.to_string(),
        );
    }

    pub fn account_resolved(&mut self, account: &Account, seqno: &SeqnoResolution) {
        self.enter(TransferStage::AccountResolved);
        self.logger.log_account_resolved(
            account.balance,
            &account.status.to_string(),
            seqno.seqno,
            &seqno.source.to_string(),
        );
    }

    pub fn instructions_built(&mut self, plan: &InstructionPlan) {
        self.enter(TransferStage::InstructionsBuilt);
        self.logger
            .log_instructions_built(plan.len(), plan.admin_fee().is_some());
    }

    pub fn message_assembled(&mut self, message: &AssembledMessage) {
        self.enter(TransferStage::MessageAssembled);
        self.logger
            .log_message_assembled(message.hash(), message.has_state_init());
    }

    pub fn fee_estimated(&mut self, estimate: &FeeEstimate) {
        self.enter(TransferStage::FeeEstimated);
        self.logger
            .log_fee_estimated(estimate.network_fee, estimate.fee_with_margin);
    }

    /// Close the call: `Done` on success, `Failed` with the cause logged
    /// otherwise. The result is passed through unchanged.
    pub fn finish<T>(mut self, result: TxResult<T>) -> TxResult<T> {
        self.timer.observe_duration(&metrics().build_latency);
        match &result {
            Ok(_) => {
                self.stage = TransferStage::Done;
                metrics().transfers_built.inc();
                self.logger.log_done(self.timer.elapsed_ms());
            }
            Err(e) => {
                let reached = self.stage;
                self.stage = TransferStage::Failed;
                metrics().transfers_failed.inc();
                self.logger.log_failed(
                    reached.as_str(),
                    e.category(),
                    &e.to_string(),
                    self.timer.elapsed_ms(),
                );
            }
        }
        result
    }
}

impl fmt::Debug for TransferContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferContext")
            .field("correlation_id", &self.correlation_id())
            .field("kind", &self.kind)
            .field("stage", &self.stage)
            .finish()
    }
}
