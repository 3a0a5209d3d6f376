//! Transfer orchestrators
//!
//! [`TransferOrchestrator`] runs one linear pipeline per transfer kind:
//! open the wallet, resolve the sender account and seqno, plan the
//! instructions, sign and serialize, and (depending on the kind) emulate.
//!
//! ## Concurrency
//! There is no per-sender locking. Two concurrent calls for the same sender
//! can resolve the same seqno and only one of the resulting messages will
//! be accepted by the ledger. Callers must serialize requests per sender
//! address.
//!
//! ## Failure
//! Every call returns `Err` as the "did not transfer" marker and logs the
//! cause with the call's correlation id before returning it.

use std::sync::Arc;
use tracing::{info, instrument};

use super::assemble::{AssembledMessage, ExternalMessageAssembler};
use super::context::TransferContext;
use super::errors::{TransactionBuilderError, TxResult};
use super::instructions::{AdminLeg, InstructionBuilder, InstructionPlan, TransferKind, TransferSpec};
use super::output::{MaxAmountEstimate, TransferOutput};
use super::requests::{
    AdminFeeSpec, JettonTransferRequest, LockTransferRequest, MaxEstimateRequest, NativeSwapRequest,
    NftTransferRequest, SwapTransferRequest, TransferRequest,
};
use super::seqno::{SeqnoResolution, SequenceNumberResolver};
use super::simulate::{EmulationBalance, FeeEstimate, FeeEstimator};
use crate::cell::Address;
use crate::config::{Config, FeeConfig};
use crate::rpc::{HttpLedgerClient, LedgerQueryClient};
use crate::types::{Account, AdminFee, Network, WalletGeneration};
use crate::wallet::{SigningIdentity, WalletContract, WalletContractDescriptor, WalletFactory};

/// Sender-side state shared by every pipeline once the account is resolved
struct Prepared {
    contract: WalletContract,
    account: Account,
    seqno: SeqnoResolution,
}

pub struct TransferOrchestrator {
    client: Arc<dyn LedgerQueryClient>,
    wallets: Arc<WalletFactory>,
    network: Network,
    default_generation: WalletGeneration,
    fees: FeeConfig,
    seqno: SequenceNumberResolver,
    instructions: InstructionBuilder,
    assembler: ExternalMessageAssembler,
    estimator: FeeEstimator,
    fixed_now: Option<u32>,
}

impl TransferOrchestrator {
    pub fn new(client: Arc<dyn LedgerQueryClient>, wallets: Arc<WalletFactory>, config: &Config) -> Self {
        Self {
            seqno: SequenceNumberResolver::new(client.clone(), config.seqno.fallback),
            estimator: FeeEstimator::new(client.clone(), config.fees.fee_margin_percent),
            instructions: InstructionBuilder::from_config(&config.fees),
            assembler: ExternalMessageAssembler::new(config.fees.message_ttl_secs),
            client,
            wallets,
            network: config.wallet.network,
            default_generation: config.wallet.generation,
            fees: config.fees.clone(),
            fixed_now: None,
        }
    }

    /// HTTP client and wallet factory built from `config`
    pub fn from_config(config: &Config) -> TxResult<Self> {
        let client = HttpLedgerClient::new(config.api.clone())?;
        let wallets = WalletFactory::new(config.wallet.workchain);
        Ok(Self::new(Arc::new(client), Arc::new(wallets), config))
    }

    pub fn with_instruction_builder(mut self, instructions: InstructionBuilder) -> Self {
        self.instructions = instructions;
        self
    }

    /// Pin the validity reference time (seconds) used when signing
    pub fn with_fixed_time(mut self, now: u32) -> Self {
        self.fixed_now = Some(now);
        self
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn client(&self) -> &Arc<dyn LedgerQueryClient> {
        &self.client
    }

    /// Wallet descriptor for a public key, cached per (generation, key, network)
    pub fn derive_descriptor(
        &self,
        generation: Option<WalletGeneration>,
        public_key: &[u8],
    ) -> TxResult<WalletContractDescriptor> {
        let generation = generation.unwrap_or(self.default_generation);
        Ok(self
            .wallets
            .derive_descriptor(generation, public_key, self.network)?)
    }

    fn open_wallet(
        &self,
        ctx: &mut TransferContext,
        generation: Option<WalletGeneration>,
        identity: &SigningIdentity,
    ) -> TxResult<WalletContract> {
        let generation = generation.unwrap_or(self.default_generation);
        let contract = self
            .wallets
            .open(generation, identity.public_key(), self.network)?;
        ctx.wallet_initialized(&contract);
        Ok(contract)
    }

    async fn prepare(
        &self,
        ctx: &mut TransferContext,
        generation: Option<WalletGeneration>,
        identity: &SigningIdentity,
        sender_account: Option<Account>,
        supplied_seqno: Option<u32>,
    ) -> TxResult<Prepared> {
        let contract = self.open_wallet(ctx, generation, identity)?;
        let account = match sender_account {
            Some(account) => account,
            None => self.client.get_account(contract.address()).await?,
        };
        let seqno = self.seqno.resolve(&account, supplied_seqno).await?;
        ctx.account_resolved(&account, &seqno);
        Ok(Prepared {
            contract,
            account,
            seqno,
        })
    }

    /// Caller override, else whether the recipient is an active account
    async fn recipient_bounce(
        &self,
        bounce: Option<bool>,
        recipient_account: Option<&Account>,
        recipient: &Address,
    ) -> TxResult<bool> {
        if let Some(bounce) = bounce {
            return Ok(bounce);
        }
        match recipient_account {
            Some(account) => Ok(account.status.is_active()),
            None => Ok(self.client.get_account(recipient).await?.status.is_active()),
        }
    }

    fn plan(
        &self,
        ctx: &mut TransferContext,
        spec: &TransferSpec,
        admin: Option<&AdminLeg>,
    ) -> TxResult<InstructionPlan> {
        let plan = self.instructions.build(spec, admin)?;
        ctx.instructions_built(&plan);
        Ok(plan)
    }

    fn assemble(
        &self,
        ctx: &mut TransferContext,
        prepared: &Prepared,
        plan: &InstructionPlan,
        identity: &SigningIdentity,
    ) -> TxResult<AssembledMessage> {
        let message = match self.fixed_now {
            Some(now) => self
                .assembler
                .assemble(&prepared.contract, plan, identity, prepared.seqno.seqno, now)?,
            None => self
                .assembler
                .assemble_now(&prepared.contract, plan, identity, prepared.seqno.seqno)?,
        };
        ctx.message_assembled(&message);
        Ok(message)
    }

    async fn estimate(
        &self,
        ctx: &mut TransferContext,
        message: &AssembledMessage,
        sender: &Address,
        balance: EmulationBalance,
    ) -> TxResult<FeeEstimate> {
        let estimate = self.estimator.estimate(message, sender, balance).await?;
        ctx.fee_estimated(&estimate);
        Ok(estimate)
    }

    fn output(
        ctx: &TransferContext,
        message: AssembledMessage,
        fee: Option<FeeEstimate>,
        seqno: SeqnoResolution,
    ) -> TransferOutput {
        TransferOutput {
            message,
            fee,
            seqno,
            correlation_id: ctx.correlation_id().to_string(),
        }
    }

    /// Plain native-currency transfer with an optional admin fee leg
    ///
    /// Emulates only when `estimate_fee` is set, against the sender's real
    /// balance.
    #[instrument(skip_all, fields(kind = "native", recipient = %req.recipient.to_raw_string(), value = req.value))]
    pub async fn create_transfer(&self, req: TransferRequest) -> TxResult<TransferOutput> {
        let mut ctx = TransferContext::new("create_transfer", TransferKind::Native);
        let result = self.run_transfer(&mut ctx, req).await;
        ctx.finish(result)
    }

    async fn run_transfer(&self, ctx: &mut TransferContext, req: TransferRequest) -> TxResult<TransferOutput> {
        let admin = resolve_admin(req.admin.as_ref(), req.value as u128)?;
        let prepared = self
            .prepare(ctx, req.generation, &req.identity, req.sender_account, req.seqno)
            .await?;
        let bounce = self
            .recipient_bounce(req.bounce, req.recipient_account.as_ref(), &req.recipient)
            .await?;

        let spec = TransferSpec::Native {
            recipient: req.recipient,
            value: req.value,
            bounce,
            memo: req.memo,
        };
        let plan = self.plan(ctx, &spec, admin.as_ref())?;
        let message = self.assemble(ctx, &prepared, &plan, &req.identity)?;

        let fee = if req.estimate_fee {
            let balance = EmulationBalance::Assumed(prepared.account.balance);
            Some(self.estimate(ctx, &message, &prepared.account.address, balance).await?)
        } else {
            None
        };
        Ok(Self::output(ctx, message, fee, prepared.seqno))
    }

    /// Token transfer with an optional admin fee paid in tokens
    ///
    /// Always emulates. With `estimate_fee` the emulator assumes the
    /// configured emulation balance, otherwise the ledger's current balance.
    /// A failed emulated action aborts the transfer.
    #[instrument(skip_all, fields(kind = "token", token_wallet = %req.token_wallet.to_raw_string()))]
    pub async fn create_jetton_transfer(&self, req: JettonTransferRequest) -> TxResult<TransferOutput> {
        let mut ctx = TransferContext::new("create_jetton_transfer", TransferKind::Token);
        let result = self.run_jetton_transfer(&mut ctx, req).await;
        ctx.finish(result)
    }

    async fn run_jetton_transfer(
        &self,
        ctx: &mut TransferContext,
        req: JettonTransferRequest,
    ) -> TxResult<TransferOutput> {
        let admin = resolve_admin(req.admin.as_ref(), req.amount)?;
        let prepared = self
            .prepare(ctx, req.generation, &req.identity, req.sender_account, req.seqno)
            .await?;
        let bounce = self
            .recipient_bounce(req.bounce, req.recipient_account.as_ref(), &req.recipient)
            .await?;

        let spec = TransferSpec::Token {
            token_wallet: req.token_wallet,
            recipient: req.recipient,
            response: prepared.account.address,
            amount: req.amount,
            bounce,
            network_fee: req.network_fee,
            min_fee: req.min_fee,
            memo: req.memo,
        };
        let plan = self.plan(ctx, &spec, admin.as_ref())?;
        self.finalize_token(ctx, prepared, &plan, &req.identity, req.estimate_fee)
            .await
    }

    /// Token transfer into a lock contract; same fee rules as a token
    /// transfer, no admin leg
    #[instrument(skip_all, fields(kind = "lock", token_wallet = %req.token_wallet.to_raw_string()))]
    pub async fn create_lock_transfer(&self, req: LockTransferRequest) -> TxResult<TransferOutput> {
        let mut ctx = TransferContext::new("create_lock_transfer", TransferKind::Lock);
        let result = self.run_lock_transfer(&mut ctx, req).await;
        ctx.finish(result)
    }

    async fn run_lock_transfer(
        &self,
        ctx: &mut TransferContext,
        req: LockTransferRequest,
    ) -> TxResult<TransferOutput> {
        let prepared = self
            .prepare(ctx, req.generation, &req.identity, req.sender_account, req.seqno)
            .await?;
        let bounce = self
            .recipient_bounce(req.bounce, req.recipient_account.as_ref(), &req.recipient)
            .await?;

        let spec = TransferSpec::Lock {
            token_wallet: req.token_wallet,
            recipient: req.recipient,
            response: prepared.account.address,
            amount: req.amount,
            bounce,
            network_fee: req.network_fee,
            min_fee: req.min_fee,
            memo: req.memo,
        };
        let plan = self.plan(ctx, &spec, None)?;
        self.finalize_token(ctx, prepared, &plan, &req.identity, req.estimate_fee)
            .await
    }

    /// Token leg of a swap: attaches `max(network_fee, floor)`, never bounces
    #[instrument(skip_all, fields(kind = "swap", token_wallet = %req.token_wallet.to_raw_string()))]
    pub async fn create_swap_transfer(&self, req: SwapTransferRequest) -> TxResult<TransferOutput> {
        let mut ctx = TransferContext::new("create_swap_transfer", TransferKind::Swap);
        let result = self.run_swap_transfer(&mut ctx, req).await;
        ctx.finish(result)
    }

    async fn run_swap_transfer(
        &self,
        ctx: &mut TransferContext,
        req: SwapTransferRequest,
    ) -> TxResult<TransferOutput> {
        let prepared = self
            .prepare(ctx, req.generation, &req.identity, req.sender_account, req.seqno)
            .await?;

        let spec = TransferSpec::Swap {
            token_wallet: req.token_wallet,
            recipient: req.recipient,
            response: prepared.account.address,
            amount: req.amount,
            network_fee: req.network_fee,
            min_fee: req.min_fee,
            memo: req.memo,
        };
        let plan = self.plan(ctx, &spec, None)?;
        self.finalize_token(ctx, prepared, &plan, &req.identity, req.estimate_fee)
            .await
    }

    async fn finalize_token(
        &self,
        ctx: &mut TransferContext,
        prepared: Prepared,
        plan: &InstructionPlan,
        identity: &SigningIdentity,
        estimate_fee: bool,
    ) -> TxResult<TransferOutput> {
        let message = self.assemble(ctx, &prepared, plan, identity)?;
        let balance = if estimate_fee {
            EmulationBalance::Assumed(self.fees.emulation_balance)
        } else {
            EmulationBalance::Ledger
        };
        let fee = self
            .estimate(ctx, &message, &prepared.account.address, balance)
            .await?;
        Ok(Self::output(ctx, message, Some(fee), prepared.seqno))
    }

    /// Native value to a swap router: no admin leg, never bounces
    ///
    /// With `estimate_fee` the reported fee is `ceil(|extra| * margin)`
    /// against the sender's real balance.
    #[instrument(skip_all, fields(kind = "native_swap", recipient = %req.recipient.to_raw_string(), value = req.value))]
    pub async fn create_transfer_for_swap(&self, req: NativeSwapRequest) -> TxResult<TransferOutput> {
        let mut ctx = TransferContext::new("create_transfer_for_swap", TransferKind::NativeSwap);
        let result = self.run_transfer_for_swap(&mut ctx, req).await;
        ctx.finish(result)
    }

    async fn run_transfer_for_swap(
        &self,
        ctx: &mut TransferContext,
        req: NativeSwapRequest,
    ) -> TxResult<TransferOutput> {
        let prepared = self
            .prepare(ctx, req.generation, &req.identity, req.sender_account, req.seqno)
            .await?;
        let spec = TransferSpec::NativeSwap {
            recipient: req.recipient,
            value: req.value,
        };
        let plan = self.plan(ctx, &spec, None)?;
        let message = self.assemble(ctx, &prepared, &plan, &req.identity)?;

        let fee = if req.estimate_fee {
            let balance = EmulationBalance::Assumed(prepared.account.balance);
            Some(self.estimate(ctx, &message, &prepared.account.address, balance).await?)
        } else {
            None
        };
        Ok(Self::output(ctx, message, fee, prepared.seqno))
    }

    /// NFT ownership transfer with an optional native admin fee leg
    ///
    /// Always emulates, against a synthetic balance unless `realistic` is
    /// set. Any failed emulated action fails the call.
    #[instrument(skip_all, fields(kind = "nft", item = %req.item.to_raw_string()))]
    pub async fn create_nft_transfer(&self, req: NftTransferRequest) -> TxResult<TransferOutput> {
        let mut ctx = TransferContext::new("create_nft_transfer", TransferKind::Nft);
        let result = self.run_nft_transfer(&mut ctx, req).await;
        ctx.finish(result)
    }

    async fn run_nft_transfer(&self, ctx: &mut TransferContext, req: NftTransferRequest) -> TxResult<TransferOutput> {
        let admin = resolve_admin(req.admin.as_ref(), req.value as u128)?;
        let prepared = self
            .prepare(ctx, req.generation, &req.identity, req.sender_account, req.seqno)
            .await?;

        let spec = TransferSpec::Nft {
            item: req.item,
            new_owner: req.new_owner,
            response: prepared.account.address,
            value: req.value,
        };
        let plan = self.plan(ctx, &spec, admin.as_ref())?;
        let message = self.assemble(ctx, &prepared, &plan, &req.identity)?;

        let balance = if req.realistic {
            prepared.account.balance
        } else {
            self.fees.nft_emulation_balance
        };
        let fee = self
            .estimate(ctx, &message, &prepared.account.address, EmulationBalance::Assumed(balance))
            .await?;
        Ok(Self::output(ctx, message, Some(fee), prepared.seqno))
    }

    /// Largest amount the sender can transfer after network and admin fees
    ///
    /// Emulates a message that sends the whole balance plus the admin skim,
    /// then splits `balance - network_fee` into admin fee and amount. The
    /// emulated message is never returned.
    #[instrument(skip_all, fields(kind = "max_estimate", recipient = %req.recipient.to_raw_string()))]
    pub async fn estimate_max(&self, req: MaxEstimateRequest) -> TxResult<MaxAmountEstimate> {
        let mut ctx = TransferContext::new("estimate_max", TransferKind::MaxEstimate);
        let result = self.run_estimate_max(&mut ctx, req).await;
        ctx.finish(result)
    }

    async fn run_estimate_max(
        &self,
        ctx: &mut TransferContext,
        req: MaxEstimateRequest,
    ) -> TxResult<MaxAmountEstimate> {
        let percent = req.admin_percent;
        if !(0.0..=1.0).contains(&percent) {
            return Err(TransactionBuilderError::invalid_input(
                "admin_percent",
                format!("{} outside [0, 1]", percent),
            ));
        }

        let prepared = self
            .prepare(ctx, req.generation, &req.identity, req.sender_account, None)
            .await?;
        let balance = prepared.account.balance;

        let skim_admin = AdminFeeSpec::new(req.admin_address, AdminFee::Percent(percent)).with_bounce(true);
        let admin = resolve_admin(Some(&skim_admin), balance as u128)?;
        let spec = TransferSpec::MaxEstimate {
            recipient: req.recipient,
            balance,
        };
        let plan = self.plan(ctx, &spec, admin.as_ref())?;
        let message = self.assemble(ctx, &prepared, &plan, &req.identity)?;

        let fee = self
            .estimate(
                ctx,
                &message,
                &prepared.account.address,
                EmulationBalance::Assumed(self.fees.emulation_balance),
            )
            .await?;

        MaxAmountEstimate::compute(balance, fee.fee_with_margin, percent).ok_or(
            TransactionBuilderError::InsufficientBalance {
                balance,
                required: fee.fee_with_margin,
            },
        )
    }

    /// Submit a built message; returns its content hash
    #[instrument(skip_all, fields(hash = %message.hash(), seqno = message.seqno()))]
    pub async fn broadcast(&self, message: AssembledMessage) -> TxResult<String> {
        let tx_id = self.client.broadcast_message(message.boc_base64()).await?;
        info!(tx_id = %tx_id, "Message broadcast");
        Ok(tx_id)
    }
}

impl std::fmt::Debug for TransferOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferOrchestrator")
            .field("network", &self.network)
            .field("default_generation", &self.default_generation)
            .field("seqno", &self.seqno)
            .field("assembler", &self.assembler)
            .finish_non_exhaustive()
    }
}

fn resolve_admin(spec: Option<&AdminFeeSpec>, base: u128) -> TxResult<Option<AdminLeg>> {
    spec.map(|s| {
        let amount = s
            .fee
            .resolve(base)
            .map_err(|reason| TransactionBuilderError::invalid_input("admin_fee", reason))?;
        Ok(AdminLeg {
            address: s.address,
            amount,
            bounce: s.bounce,
        })
    })
    .transpose()
}
