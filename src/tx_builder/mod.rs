//! Transaction Builder
//!
//! Builds signed external messages for wallet contracts and estimates their
//! fees through emulation.
//!
//! ## Architecture
//!
//! The pipeline is split into focused modules:
//! - **errors**: Error taxonomy with retry classification
//! - **seqno**: Sequence number resolution and lookup-failure policy
//! - **bodies**: Comment, token and NFT message bodies
//! - **instructions**: Per-kind instruction planning with admin fee legs
//! - **assemble**: Internal/external message cells, signing, wire encoding
//! - **simulate**: Emulation-based fee estimation with safety margin
//! - **context**: Per-call stage tracking, correlation ids, metrics
//! - **requests** / **output**: Caller-facing inputs and results
//! - **builder**: The orchestrators tying it all together
//!
//! ## Key Properties
//!
//! ### Seqno
//! - Undeployed wallets always sign with seqno 0 and attach their state-init
//! - A caller-supplied seqno is used verbatim, never validated
//! - Lookup failure falls back to 0 or aborts, per configuration
//!
//! ### Fees
//! - Network fee is `|extra|` from emulation, reported with a 5% margin
//!   (rounded up)
//! - Token transfers attach at least the configured fee floor as forward value
//!
//! ### Concurrency
//! - No per-sender serialization; callers must not build two messages for
//!   the same sender concurrently
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use ton_transfer::config::Config;
//! use ton_transfer::tx_builder::{TransferOrchestrator, TransferRequest, TransactionBuilderError};
//! use ton_transfer::wallet::SigningIdentity;
//! use ton_transfer::cell::Address;
//!
//! # async fn example(identity: SigningIdentity, to: Address) -> Result<(), TransactionBuilderError> {
//! let orchestrator = TransferOrchestrator::from_config(&Config::default())?;
//!
//! let mut request = TransferRequest::new(identity, to, 1_000_000_000);
//! request.estimate_fee = true;
//! let output = orchestrator.create_transfer(request).await?;
//!
//! let tx_id = orchestrator.broadcast(output.into_message()).await?;
//! # let _ = tx_id;
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub use errors::{TransactionBuilderError, TxResult};

pub mod assemble;
pub mod bodies;
pub mod builder;
pub mod context;
pub mod instructions;
pub mod output;
pub mod requests;
pub mod seqno;
pub mod simulate;

pub use assemble::{AssembledMessage, ExternalMessageAssembler};
pub use builder::TransferOrchestrator;
pub use context::{TransferContext, TransferStage};
pub use instructions::{
    AdminLeg, InstructionBuilder, InstructionPlan, InstructionRole, MessageBody, PaymentInstruction,
    TransferKind, TransferSpec,
};
pub use output::{MaxAmountEstimate, TransferOutput};
pub use requests::{
    AdminFeeSpec, JettonTransferRequest, LockTransferRequest, MaxEstimateRequest, NativeSwapRequest,
    NftTransferRequest, SwapTransferRequest, TransferRequest,
};
pub use seqno::{SeqnoFallback, SeqnoResolution, SeqnoSource, SequenceNumberResolver};
pub use simulate::{EmulationBalance, FeeEstimate, FeeEstimator};
