//! External message assembly
//!
//! Turns an [`InstructionPlan`] into internal message cells, has the wallet
//! contract sign them into a transfer body and wraps that body into an
//! external message addressed to the wallet itself. Deploy data rides along
//! only at seqno 0.

use std::fmt;
use std::sync::Arc;

use super::errors::{TransactionBuilderError, TxResult};
use super::instructions::{InstructionPlan, PaymentInstruction};
use crate::cell::{cell_hash_hex, coins, encode_boc, encode_boc_base64, ArcCell, CellBuilder, CellResult};
use crate::wallet::{SigningIdentity, WalletContract};

const MAX_CELL_BITS: usize = 1023;
const MAX_CELL_REFS: usize = 4;

/// Signed, serialized external message
///
/// Bound to one seqno and one instruction set. Broadcast at most once, so
/// not `Clone`.
pub struct AssembledMessage {
    hash: String,
    cell: ArcCell,
    boc_base64: String,
    seqno: u32,
    has_state_init: bool,
}

impl AssembledMessage {
    /// Content hash of the message cell (hex)
    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn cell(&self) -> &ArcCell {
        &self.cell
    }

    /// Base64 bag-of-cells wire encoding
    pub fn boc_base64(&self) -> &str {
        &self.boc_base64
    }

    pub fn boc_bytes(&self) -> CellResult<Vec<u8>> {
        encode_boc(&self.cell)
    }

    pub fn seqno(&self) -> u32 {
        self.seqno
    }

    pub fn has_state_init(&self) -> bool {
        self.has_state_init
    }
}

impl fmt::Debug for AssembledMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssembledMessage")
            .field("hash", &self.hash)
            .field("seqno", &self.seqno)
            .field("has_state_init", &self.has_state_init)
            .field("boc_len", &self.boc_base64.len())
            .finish()
    }
}

/// Signs and serializes instruction plans
#[derive(Debug, Clone, Copy)]
pub struct ExternalMessageAssembler {
    ttl_secs: u32,
}

impl ExternalMessageAssembler {
    pub fn new(ttl_secs: u32) -> Self {
        Self { ttl_secs }
    }

    pub fn ttl_secs(&self) -> u32 {
        self.ttl_secs
    }

    /// Assemble with the wall clock as the validity reference
    pub fn assemble_now(
        &self,
        contract: &WalletContract,
        plan: &InstructionPlan,
        identity: &SigningIdentity,
        seqno: u32,
    ) -> TxResult<AssembledMessage> {
        let now = u32::try_from(chrono::Utc::now().timestamp())
            .map_err(|_| TransactionBuilderError::internal("system clock outside u32 seconds"))?;
        self.assemble(contract, plan, identity, seqno, now)
    }

    /// Sign `plan` at `seqno` and wrap it as an external message
    ///
    /// Output is a pure function of the inputs: the same plan, seqno, key
    /// and `now` always give the same hash. Messages are handed to the
    /// wallet in role order, so the primary leg executes first.
    pub fn assemble(
        &self,
        contract: &WalletContract,
        plan: &InstructionPlan,
        identity: &SigningIdentity,
        seqno: u32,
        now: u32,
    ) -> TxResult<AssembledMessage> {
        if plan.is_empty() {
            return Err(TransactionBuilderError::instruction_failed(
                plan.kind().as_str(),
                "no instructions to sign",
            ));
        }

        let messages = plan
            .instructions()
            .map(internal_message_cell)
            .collect::<TxResult<Vec<_>>>()?;

        let valid_until = now.saturating_add(self.ttl_secs);
        let body = contract.create_transfer(&messages, seqno, valid_until, identity)?;

        let has_state_init = seqno == 0;
        let cell = Arc::new(contract.external_message(body, has_state_init)?);

        Ok(AssembledMessage {
            hash: cell_hash_hex(&cell),
            boc_base64: encode_boc_base64(&cell)?,
            cell,
            seqno,
            has_state_init,
        })
    }
}

/// Relaxed internal message: no source, zero forwarding fees and timestamps
///
/// The body is stored inline when it fits next to the header, otherwise
/// as a reference.
pub fn internal_message_cell(ix: &PaymentInstruction) -> TxResult<ArcCell> {
    let body = ix.body.to_cell()?;

    let mut head = CellBuilder::new();
    head.store_bit(false)? // int_msg_info$0
        .store_bit(true)? // ihr_disabled
        .store_bit(ix.bounce)?
        .store_bit(false)? // bounced
        .store_u8(2, 0)? // addr_none source
        .store_address(&ix.destination.to_ton_address())?
        .store_coins(&coins(ix.value as u128))?
        .store_bit(false)? // no extra currencies
        .store_coins(&coins(0))?
        .store_coins(&coins(0))?
        .store_u64(64, 0)?
        .store_u32(32, 0)?
        .store_bit(false)?; // no init
    let head = head.build()?;

    let mut b = CellBuilder::new();
    b.store_cell(&head)?;
    match body {
        Some(body) => {
            let as_ref = head.bit_len() + 1 + body.bit_len() > MAX_CELL_BITS
                || head.references().len() + body.references().len() > MAX_CELL_REFS;
            if as_ref {
                b.store_bit(true)?.store_reference(&body)?;
            } else {
                b.store_bit(false)?.store_cell(&body)?;
            }
        }
        None => {
            b.store_bit(false)?;
        }
    }
    Ok(Arc::new(b.build()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{decode_boc_base64, Address};
    use crate::test_utils::{sample_identity, signed_body_actions};
    use crate::tx_builder::instructions::{AdminLeg, InstructionBuilder, InstructionRole, MessageBody, TransferSpec};
    use crate::types::{Network, WalletGeneration};
    use crate::wallet::WalletFactory;

    fn contract(generation: WalletGeneration) -> (WalletContract, SigningIdentity) {
        let identity = sample_identity();
        let contract = WalletFactory::new(0)
            .open(generation, identity.public_key(), Network::Mainnet)
            .unwrap();
        (contract, identity)
    }

    fn plan(value: u64) -> InstructionPlan {
        InstructionBuilder::new(50_000_000, 1_000_000_000)
            .build(
                &TransferSpec::Native {
                    recipient: Address::new(0, [1; 32]),
                    value,
                    bounce: true,
                    memo: Some("hello".to_string()),
                },
                None,
            )
            .unwrap()
    }

    fn bit(cell: &ArcCell, i: usize) -> bool {
        cell.data()[i / 8] & (0x80 >> (i % 8)) != 0
    }

    #[test]
    fn test_internal_message_layout() {
        let ix = PaymentInstruction {
            destination: Address::new(0, [1; 32]),
            value: 1_000,
            bounce: true,
            body: MessageBody::Empty,
        };
        let cell = internal_message_cell(&ix).unwrap();
        // 4 flag bits + addr_none + addr_std + coins(2 bytes) + extra bit
        // + 2 zero coins + lt + at + init bit + body bit
        assert_eq!(cell.bit_len(), 4 + 2 + 267 + 20 + 1 + 4 + 4 + 64 + 32 + 1 + 1);
        assert!(bit(&cell, 1));
        assert!(bit(&cell, 2));
        assert!(!bit(&cell, 3));
    }

    #[test]
    fn test_large_body_goes_to_ref() {
        let text = "y".repeat(120);
        let ix = PaymentInstruction {
            destination: Address::new(0, [1; 32]),
            value: 1,
            bounce: false,
            body: MessageBody::Comment(text),
        };
        let cell = internal_message_cell(&ix).unwrap();
        assert_eq!(cell.references().len(), 1);
        assert!(bit(&cell, cell.bit_len() - 1));
    }

    #[test]
    fn test_state_init_only_at_seqno_zero() {
        for generation in [WalletGeneration::V4R2, WalletGeneration::V5R1] {
            let (contract, identity) = contract(generation);
            let assembler = ExternalMessageAssembler::new(60);

            let first = assembler
                .assemble(&contract, &plan(10), &identity, 0, 1_700_000_000)
                .unwrap();
            assert!(first.has_state_init());

            let later = assembler
                .assemble(&contract, &plan(10), &identity, 4, 1_700_000_000)
                .unwrap();
            assert!(!later.has_state_init());
            assert!(later.boc_base64().len() < first.boc_base64().len());
        }
    }

    #[test]
    fn test_assembly_is_deterministic() {
        let (contract, identity) = contract(WalletGeneration::V5R1);
        let assembler = ExternalMessageAssembler::new(60);

        let a = assembler
            .assemble(&contract, &plan(10), &identity, 5, 1_700_000_000)
            .unwrap();
        let b = assembler
            .assemble(&contract, &plan(10), &identity, 5, 1_700_000_000)
            .unwrap();
        let c = assembler
            .assemble(&contract, &plan(10), &identity, 6, 1_700_000_000)
            .unwrap();
        assert_eq!(a.hash(), b.hash());
        assert_ne!(a.hash(), c.hash());
    }

    #[test]
    fn test_wire_encoding_round_trips_to_hash() {
        let (contract, identity) = contract(WalletGeneration::V4R2);
        let msg = ExternalMessageAssembler::new(60)
            .assemble(&contract, &plan(10), &identity, 0, 1_700_000_000)
            .unwrap();
        let decoded = decode_boc_base64(msg.boc_base64()).unwrap();
        assert_eq!(cell_hash_hex(&decoded), msg.hash());
        assert_eq!(msg.hash(), cell_hash_hex(msg.cell()));
    }

    #[test]
    fn test_primary_leg_is_first_action() {
        let admin = AdminLeg {
            address: Address::new(0, [9; 32]),
            amount: 50_000_000,
            bounce: false,
        };
        let plan = InstructionBuilder::new(50_000_000, 1_000_000_000)
            .build(
                &TransferSpec::Native {
                    recipient: Address::new(0, [1; 32]),
                    value: 1_000_000_000,
                    bounce: true,
                    memo: None,
                },
                Some(&admin),
            )
            .unwrap();
        let primary = internal_message_cell(plan.primary().unwrap()).unwrap();
        let admin_fee = internal_message_cell(plan.admin_fee().unwrap()).unwrap();
        let messages: Vec<_> = plan
            .instructions()
            .map(|ix| internal_message_cell(ix).unwrap())
            .collect();

        for generation in [WalletGeneration::V4R2, WalletGeneration::V5R1] {
            let (contract, identity) = contract(generation);
            let body = contract
                .create_transfer(&messages, 3, 1_700_000_060, &identity)
                .unwrap();
            let actions = signed_body_actions(generation, &body);

            assert_eq!(actions.len(), 2, "{generation}");
            let primary_at = plan.action_index(InstructionRole::Primary).unwrap();
            let admin_at = plan.action_index(InstructionRole::AdminFee).unwrap();
            assert_eq!((primary_at, admin_at), (0, 1));
            assert_eq!(actions[primary_at].cell_hash(), primary.cell_hash(), "{generation}");
            assert_eq!(actions[admin_at].cell_hash(), admin_fee.cell_hash(), "{generation}");
        }
    }

    #[test]
    fn test_foreign_key_is_rejected() {
        let (contract, _) = contract(WalletGeneration::V5R1);
        let other = SigningIdentity::from_seed(&[9u8; 32]);
        let err = ExternalMessageAssembler::new(60)
            .assemble(&contract, &plan(10), &other, 1, 1_700_000_000)
            .unwrap_err();
        assert!(matches!(err, TransactionBuilderError::Wallet(_)));
    }
}
