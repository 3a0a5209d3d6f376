//! Payment instruction planning
//!
//! Every transfer kind is reduced to an ordered list of internal payment
//! instructions, each tagged with its role:
//! 1. the primary instruction (value transfer, token transfer, NFT transfer)
//! 2. an optional admin fee leg, present only when its amount is non-zero
//!
//! Ledger actions execute in list order and emulation reports outcomes by
//! action index, so the index of the admin leg depends on whether it exists.
//! Consumers look instructions up by [`InstructionRole`] instead of position.
//!
//! ## Fee floors
//! Token transfers attach native value to pay for the token contract's
//! work. That value never drops below the configured floor:
//! - Plain token and lock transfers: `max(ceil(network_fee / 2), floor)`
//! - Swap token transfers: `max(network_fee, floor)`
//! - No network fee supplied: the configured default forward value

use std::fmt;
use std::sync::Arc;

use super::bodies::{comment_body, jetton_transfer_body, new_query_id, nft_transfer_body};
use super::errors::{TransactionBuilderError, TxResult};
use crate::cell::{Address, Cell, CellResult};
use crate::config::FeeConfig;

/// Memo carried by every admin fee leg
pub const ADMIN_FEE_MEMO: &str = "Admin fee";

/// Payload of an internal message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    Empty,
    /// Text comment, encoded as op 0 followed by UTF-8
    Comment(String),
    /// Pre-built payload such as a token or NFT transfer request
    Cell(Arc<Cell>),
}

impl MessageBody {
    pub fn from_memo(memo: Option<&str>) -> Self {
        match memo {
            Some(text) => MessageBody::Comment(text.to_string()),
            None => MessageBody::Empty,
        }
    }

    /// Encoded payload, `None` for an empty body
    pub fn to_cell(&self) -> CellResult<Option<Arc<Cell>>> {
        match self {
            MessageBody::Empty => Ok(None),
            MessageBody::Comment(text) => comment_body(text).map(Some),
            MessageBody::Cell(cell) => Ok(Some(cell.clone())),
        }
    }
}

/// One internal value transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentInstruction {
    pub destination: Address,
    /// Native value in the smallest unit
    pub value: u64,
    pub bounce: bool,
    pub body: MessageBody,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstructionRole {
    Primary,
    AdminFee,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransferKind {
    Native,
    NativeSwap,
    Token,
    Lock,
    Swap,
    Nft,
    /// Full-balance transfer used only to emulate the maximum sendable amount
    MaxEstimate,
}

impl TransferKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferKind::Native => "native",
            TransferKind::NativeSwap => "native_swap",
            TransferKind::Token => "token",
            TransferKind::Lock => "lock",
            TransferKind::Swap => "swap",
            TransferKind::Nft => "nft",
            TransferKind::MaxEstimate => "max_estimate",
        }
    }

    /// Whether this kind may carry an admin fee leg
    pub fn accepts_admin_fee(&self) -> bool {
        matches!(
            self,
            TransferKind::Native | TransferKind::Token | TransferKind::Nft | TransferKind::MaxEstimate
        )
    }
}

impl fmt::Display for TransferKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedInstruction {
    pub role: InstructionRole,
    pub instruction: PaymentInstruction,
}

/// Ordered instructions for one transfer, addressable by role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionPlan {
    kind: TransferKind,
    entries: Vec<PlannedInstruction>,
}

impl InstructionPlan {
    pub fn new(kind: TransferKind, primary: PaymentInstruction) -> Self {
        Self {
            kind,
            entries: vec![PlannedInstruction {
                role: InstructionRole::Primary,
                instruction: primary,
            }],
        }
    }

    /// Append the admin leg; a zero-value leg is dropped
    fn push_admin_fee(&mut self, instruction: PaymentInstruction, amount: u128) {
        if amount > 0 {
            self.entries.push(PlannedInstruction {
                role: InstructionRole::AdminFee,
                instruction,
            });
        }
    }

    pub fn kind(&self) -> TransferKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PlannedInstruction] {
        &self.entries
    }

    /// Instructions in execution order
    pub fn instructions(&self) -> impl Iterator<Item = &PaymentInstruction> {
        self.entries.iter().map(|e| &e.instruction)
    }

    pub fn by_role(&self, role: InstructionRole) -> Option<&PaymentInstruction> {
        self.entries
            .iter()
            .find(|e| e.role == role)
            .map(|e| &e.instruction)
    }

    pub fn primary(&self) -> Option<&PaymentInstruction> {
        self.by_role(InstructionRole::Primary)
    }

    pub fn admin_fee(&self) -> Option<&PaymentInstruction> {
        self.by_role(InstructionRole::AdminFee)
    }

    /// Action index the ledger will report for `role`
    pub fn action_index(&self, role: InstructionRole) -> Option<usize> {
        self.entries.iter().position(|e| e.role == role)
    }

    /// Sum of attached native value
    pub fn total_value(&self) -> u128 {
        self.instructions().map(|i| i.value as u128).sum()
    }
}

/// Admin fee leg parameters, with the amount already resolved
///
/// For token transfers `amount` is in token units and the leg goes through
/// the sender's token wallet; for every other kind it is native value paid
/// straight to `address`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminLeg {
    pub address: Address,
    pub amount: u128,
    pub bounce: bool,
}

/// What to transfer, per kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferSpec {
    Native {
        recipient: Address,
        value: u64,
        bounce: bool,
        memo: Option<String>,
    },
    NativeSwap {
        recipient: Address,
        value: u64,
    },
    Token {
        /// Sender's token wallet; the message destination
        token_wallet: Address,
        /// Token owner credited with `amount`, carried inside the body
        recipient: Address,
        /// Receives the excess native value
        response: Address,
        amount: u128,
        bounce: bool,
        network_fee: Option<u64>,
        min_fee: Option<u64>,
        memo: Option<String>,
    },
    Lock {
        token_wallet: Address,
        recipient: Address,
        response: Address,
        amount: u128,
        bounce: bool,
        network_fee: Option<u64>,
        min_fee: Option<u64>,
        memo: Option<String>,
    },
    Swap {
        token_wallet: Address,
        recipient: Address,
        response: Address,
        amount: u128,
        network_fee: u64,
        min_fee: Option<u64>,
        memo: Option<String>,
    },
    Nft {
        item: Address,
        new_owner: Address,
        response: Address,
        value: u64,
    },
    MaxEstimate {
        recipient: Address,
        balance: u64,
    },
}

impl TransferSpec {
    pub fn kind(&self) -> TransferKind {
        match self {
            TransferSpec::Native { .. } => TransferKind::Native,
            TransferSpec::NativeSwap { .. } => TransferKind::NativeSwap,
            TransferSpec::Token { .. } => TransferKind::Token,
            TransferSpec::Lock { .. } => TransferKind::Lock,
            TransferSpec::Swap { .. } => TransferKind::Swap,
            TransferSpec::Nft { .. } => TransferKind::Nft,
            TransferSpec::MaxEstimate { .. } => TransferKind::MaxEstimate,
        }
    }
}

/// Builds instruction plans for every transfer kind
///
/// Stateless apart from the fee policy. Query ids are random per body
/// unless pinned with [`InstructionBuilder::with_query_id`].
#[derive(Debug, Clone)]
pub struct InstructionBuilder {
    jetton_min_fee: u64,
    default_jetton_forward_value: u64,
    query_id: Option<u64>,
}

impl InstructionBuilder {
    pub fn new(jetton_min_fee: u64, default_jetton_forward_value: u64) -> Self {
        Self {
            jetton_min_fee,
            default_jetton_forward_value,
            query_id: None,
        }
    }

    pub fn from_config(fees: &FeeConfig) -> Self {
        Self::new(fees.jetton_min_fee, fees.default_jetton_forward_value)
    }

    /// Use a fixed query id for every body (deterministic output)
    pub fn with_query_id(mut self, query_id: u64) -> Self {
        self.query_id = Some(query_id);
        self
    }

    fn query_id(&self) -> u64 {
        self.query_id.unwrap_or_else(new_query_id)
    }

    /// Native value attached to a token or lock transfer
    ///
    /// `max(ceil(network_fee / 2), floor)` when a fee is supplied, the
    /// configured default otherwise. `min_fee` overrides the floor.
    pub fn jetton_forward_value(&self, network_fee: Option<u64>, min_fee: Option<u64>) -> u64 {
        let floor = min_fee.unwrap_or(self.jetton_min_fee);
        match network_fee {
            Some(fee) => fee.div_ceil(2).max(floor),
            None => self.default_jetton_forward_value,
        }
    }

    /// Native value attached to a swap token transfer: `max(network_fee, floor)`
    pub fn swap_forward_value(&self, network_fee: u64, min_fee: Option<u64>) -> u64 {
        network_fee.max(min_fee.unwrap_or(self.jetton_min_fee))
    }

    /// Build the ordered instructions for `spec`
    ///
    /// # Arguments
    ///
    /// * `spec` - What to transfer
    /// * `admin` - Optional admin fee leg; appended only when its amount is
    ///   strictly positive
    ///
    /// # Errors
    ///
    /// Returns `TransactionBuilderError::InstructionBuild` when an admin leg
    /// is given for a kind that takes none, or when a body cannot be encoded.
    /// Returns `TransactionBuilderError::InvalidInput` when a native admin
    /// amount does not fit the native value range.
    pub fn build(&self, spec: &TransferSpec, admin: Option<&AdminLeg>) -> TxResult<InstructionPlan> {
        let kind = spec.kind();
        if let Some(leg) = admin {
            if leg.amount > 0 && !kind.accepts_admin_fee() {
                return Err(TransactionBuilderError::instruction_failed(
                    kind.as_str(),
                    "admin fee leg is not supported for this transfer kind",
                ));
            }
        }
        let encode_err = |e: crate::cell::CellError| {
            TransactionBuilderError::instruction_failed(kind.as_str(), e.to_string())
        };

        let plan = match spec {
            TransferSpec::Native {
                recipient,
                value,
                bounce,
                memo,
            } => {
                let mut plan = InstructionPlan::new(
                    kind,
                    PaymentInstruction {
                        destination: *recipient,
                        value: *value,
                        bounce: *bounce,
                        body: MessageBody::from_memo(memo.as_deref()),
                    },
                );
                if let Some(leg) = admin {
                    plan.push_admin_fee(native_admin_instruction(leg)?, leg.amount);
                }
                plan
            }

            TransferSpec::NativeSwap { recipient, value } => InstructionPlan::new(
                kind,
                PaymentInstruction {
                    destination: *recipient,
                    value: *value,
                    bounce: false,
                    body: MessageBody::Empty,
                },
            ),

            TransferSpec::Token {
                token_wallet,
                recipient,
                response,
                amount,
                bounce,
                network_fee,
                min_fee,
                memo,
            } => {
                let forward = self.jetton_forward_value(*network_fee, *min_fee);
                let body = jetton_transfer_body(self.query_id(), *amount, recipient, response, memo.as_deref())
                    .map_err(encode_err)?;
                let mut plan = InstructionPlan::new(
                    kind,
                    PaymentInstruction {
                        destination: *token_wallet,
                        value: forward,
                        bounce: *bounce,
                        body: MessageBody::Cell(body),
                    },
                );
                if let Some(leg) = admin.filter(|leg| leg.amount > 0) {
                    let admin_body = jetton_transfer_body(
                        self.query_id(),
                        leg.amount,
                        &leg.address,
                        response,
                        Some(ADMIN_FEE_MEMO),
                    )
                    .map_err(encode_err)?;
                    plan.push_admin_fee(
                        PaymentInstruction {
                            destination: *token_wallet,
                            value: forward,
                            bounce: leg.bounce,
                            body: MessageBody::Cell(admin_body),
                        },
                        leg.amount,
                    );
                }
                plan
            }

            TransferSpec::Lock {
                token_wallet,
                recipient,
                response,
                amount,
                bounce,
                network_fee,
                min_fee,
                memo,
            } => {
                let forward = self.jetton_forward_value(*network_fee, *min_fee);
                let body = jetton_transfer_body(self.query_id(), *amount, recipient, response, memo.as_deref())
                    .map_err(encode_err)?;
                InstructionPlan::new(
                    kind,
                    PaymentInstruction {
                        destination: *token_wallet,
                        value: forward,
                        bounce: *bounce,
                        body: MessageBody::Cell(body),
                    },
                )
            }

            TransferSpec::Swap {
                token_wallet,
                recipient,
                response,
                amount,
                network_fee,
                min_fee,
                memo,
            } => {
                let forward = self.swap_forward_value(*network_fee, *min_fee);
                let body = jetton_transfer_body(self.query_id(), *amount, recipient, response, memo.as_deref())
                    .map_err(encode_err)?;
                InstructionPlan::new(
                    kind,
                    PaymentInstruction {
                        destination: *token_wallet,
                        value: forward,
                        bounce: false,
                        body: MessageBody::Cell(body),
                    },
                )
            }

            TransferSpec::Nft {
                item,
                new_owner,
                response,
                value,
            } => {
                let body = nft_transfer_body(self.query_id(), new_owner, response).map_err(encode_err)?;
                let mut plan = InstructionPlan::new(
                    kind,
                    PaymentInstruction {
                        destination: *item,
                        value: *value,
                        bounce: true,
                        body: MessageBody::Cell(body),
                    },
                );
                if let Some(leg) = admin {
                    plan.push_admin_fee(native_admin_instruction(leg)?, leg.amount);
                }
                plan
            }

            TransferSpec::MaxEstimate { recipient, balance } => {
                let mut plan = InstructionPlan::new(
                    kind,
                    PaymentInstruction {
                        destination: *recipient,
                        value: *balance,
                        bounce: true,
                        body: MessageBody::Empty,
                    },
                );
                if let Some(leg) = admin {
                    let mut fee = native_admin_instruction(leg)?;
                    fee.bounce = true;
                    plan.push_admin_fee(fee, leg.amount);
                }
                plan
            }
        };

        tracing::trace!(
            kind = %kind,
            count = plan.len(),
            has_admin_leg = plan.admin_fee().is_some(),
            "Instruction plan built"
        );
        Ok(plan)
    }
}

fn native_admin_instruction(leg: &AdminLeg) -> TxResult<PaymentInstruction> {
    let value = u64::try_from(leg.amount).map_err(|_| {
        TransactionBuilderError::invalid_input("admin_fee", format!("{} exceeds native value range", leg.amount))
    })?;
    Ok(PaymentInstruction {
        destination: leg.address,
        value,
        bounce: leg.bounce,
        body: MessageBody::Comment(ADMIN_FEE_MEMO.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx_builder::bodies::OP_JETTON_TRANSFER;

    fn addr(b: u8) -> Address {
        Address::new(0, [b; 32])
    }

    fn builder() -> InstructionBuilder {
        InstructionBuilder::new(50_000_000, 1_000_000_000).with_query_id(42)
    }

    fn native(value: u64) -> TransferSpec {
        TransferSpec::Native {
            recipient: addr(1),
            value,
            bounce: true,
            memo: None,
        }
    }

    fn admin(amount: u128) -> AdminLeg {
        AdminLeg {
            address: addr(9),
            amount,
            bounce: false,
        }
    }

    #[test]
    fn test_admin_leg_only_when_positive() {
        let b = builder();

        let plan = b.build(&native(1_000), Some(&admin(0))).unwrap();
        assert_eq!(plan.len(), 1);
        assert!(plan.admin_fee().is_none());
        assert_eq!(plan.action_index(InstructionRole::AdminFee), None);

        let plan = b.build(&native(1_000), Some(&admin(1))).unwrap();
        assert_eq!(plan.len(), 2);
        let fee = plan.admin_fee().unwrap();
        assert_eq!(fee.value, 1);
        assert_eq!(fee.destination, addr(9));
        assert!(!fee.bounce);
        assert_eq!(fee.body, MessageBody::Comment("Admin fee".to_string()));
        assert_eq!(plan.action_index(InstructionRole::AdminFee), Some(1));
    }

    #[test]
    fn test_jetton_forward_value_floor() {
        let b = builder();
        assert_eq!(b.jetton_forward_value(Some(30_000_000), None), 50_000_000);
        assert_eq!(b.jetton_forward_value(Some(200_000_001), None), 100_000_001);
        assert_eq!(b.jetton_forward_value(Some(3), Some(1)), 2);
        assert_eq!(b.jetton_forward_value(None, None), 1_000_000_000);
        assert_eq!(b.swap_forward_value(80_000_000, None), 80_000_000);
        assert_eq!(b.swap_forward_value(10, None), 50_000_000);
    }

    #[test]
    fn test_token_transfer_routes_through_token_wallet() {
        let spec = TransferSpec::Token {
            token_wallet: addr(5),
            recipient: addr(1),
            response: addr(2),
            amount: 700,
            bounce: true,
            network_fee: Some(120_000_000),
            min_fee: None,
            memo: Some("invoice 7".to_string()),
        };
        let plan = builder().build(&spec, Some(&admin(35))).unwrap();
        assert_eq!(plan.len(), 2);
        for ix in plan.instructions() {
            assert_eq!(ix.destination, addr(5));
            assert_eq!(ix.value, 60_000_000);
            match &ix.body {
                MessageBody::Cell(c) => assert_eq!(&c.data()[..4], &OP_JETTON_TRANSFER.to_be_bytes()),
                other => panic!("unexpected body {:?}", other),
            }
        }
        assert!(plan.primary().unwrap().bounce);
        assert!(!plan.admin_fee().unwrap().bounce);
    }

    #[test]
    fn test_swap_kinds_never_bounce() {
        let plan = builder()
            .build(
                &TransferSpec::NativeSwap {
                    recipient: addr(1),
                    value: 10,
                },
                None,
            )
            .unwrap();
        assert!(!plan.primary().unwrap().bounce);

        let plan = builder()
            .build(
                &TransferSpec::Swap {
                    token_wallet: addr(5),
                    recipient: addr(1),
                    response: addr(2),
                    amount: 1,
                    network_fee: 90_000_000,
                    min_fee: None,
                    memo: None,
                },
                None,
            )
            .unwrap();
        let primary = plan.primary().unwrap();
        assert!(!primary.bounce);
        assert_eq!(primary.value, 90_000_000);
    }

    #[test]
    fn test_admin_leg_rejected_for_lock() {
        let spec = TransferSpec::Lock {
            token_wallet: addr(5),
            recipient: addr(1),
            response: addr(2),
            amount: 1,
            bounce: true,
            network_fee: None,
            min_fee: None,
            memo: None,
        };
        let err = builder().build(&spec, Some(&admin(3))).unwrap_err();
        assert!(matches!(err, TransactionBuilderError::InstructionBuild { .. }));
        assert!(builder().build(&spec, Some(&admin(0))).is_ok());
    }

    #[test]
    fn test_nft_and_max_estimate_layout() {
        let plan = builder()
            .build(
                &TransferSpec::Nft {
                    item: addr(7),
                    new_owner: addr(1),
                    response: addr(2),
                    value: 50_000_000,
                },
                Some(&admin(10)),
            )
            .unwrap();
        let primary = plan.primary().unwrap();
        assert_eq!(primary.destination, addr(7));
        assert!(primary.bounce);
        assert_eq!(plan.admin_fee().unwrap().destination, addr(9));

        let plan = builder()
            .build(
                &TransferSpec::MaxEstimate {
                    recipient: addr(1),
                    balance: 10_000,
                },
                Some(&admin(500)),
            )
            .unwrap();
        assert_eq!(plan.total_value(), 10_500);
        assert!(plan.instructions().all(|i| i.bounce));
    }

    #[test]
    fn test_same_query_id_gives_same_bodies() {
        let spec = TransferSpec::Token {
            token_wallet: addr(5),
            recipient: addr(1),
            response: addr(2),
            amount: 700,
            bounce: true,
            network_fee: None,
            min_fee: None,
            memo: None,
        };
        assert_eq!(builder().build(&spec, None).unwrap(), builder().build(&spec, None).unwrap());
    }
}
