//! Structured logging for orchestrator calls
//!
//! Every orchestrator call gets a [`TransferLogger`] bound to a fresh
//! correlation id; all events it emits carry that id and the operation name
//! so one transfer attempt can be followed end to end.

use uuid::Uuid;

/// Structured logger for one transfer attempt
#[derive(Debug, Clone)]
pub struct TransferLogger {
    context_id: String,
    operation: &'static str,
}

impl TransferLogger {
    pub fn new(operation: &'static str) -> Self {
        Self::with_context_id(operation, Uuid::new_v4().to_string())
    }

    pub fn with_context_id(operation: &'static str, context_id: String) -> Self {
        Self {
            context_id,
            operation,
        }
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    pub fn operation(&self) -> &'static str {
        self.operation
    }

    pub fn log_started(&self) {
        tracing::debug!(
            context_id = %self.context_id,
            operation = self.operation,
            "Transfer started"
        );
    }

    pub fn log_wallet_initialized(&self, address: &str, generation: &str) {
        tracing::debug!(
            context_id = %self.context_id,
            operation = self.operation,
            address = %address,
            generation = %generation,
            "Wallet initialized"
        );
    }

    pub fn log_account_resolved(&self, balance: u64, status: &str, seqno: u32, source: &str) {
        tracing::debug!(
            context_id = %self.context_id,
            operation = self.operation,
            balance = balance,
            status = %status,
            seqno = seqno,
            seqno_source = %source,
            "Account resolved"
        );
    }

    pub fn log_instructions_built(&self, count: usize, has_admin_leg: bool) {
        tracing::debug!(
            context_id = %self.context_id,
            operation = self.operation,
            count = count,
            has_admin_leg = has_admin_leg,
            "Instructions built"
        );
    }

    pub fn log_message_assembled(&self, hash: &str, has_state_init: bool) {
        tracing::debug!(
            context_id = %self.context_id,
            operation = self.operation,
            hash = %hash,
            has_state_init = has_state_init,
            "Message assembled"
        );
    }

    pub fn log_fee_estimated(&self, network_fee: u64, fee_with_margin: u64) {
        tracing::debug!(
            context_id = %self.context_id,
            operation = self.operation,
            network_fee = network_fee,
            fee_with_margin = fee_with_margin,
            "Fee estimated"
        );
    }

    pub fn log_done(&self, latency_ms: u64) {
        tracing::info!(
            context_id = %self.context_id,
            operation = self.operation,
            latency_ms = latency_ms,
            "Transfer built"
        );
    }

    pub fn log_failed(&self, stage: &str, category: &str, error: &str, latency_ms: u64) {
        tracing::warn!(
            context_id = %self.context_id,
            operation = self.operation,
            stage = %stage,
            category = %category,
            error = %error,
            latency_ms = latency_ms,
            "Transfer failed"
        );
    }
}
