//! Message body encoders: text comments, token transfers, NFT transfers

use crate::cell::{coins, Address, ArcCell, CellBuilder, CellResult};
use rand::Rng;
use std::sync::Arc;

/// Token wallet `transfer` operation
pub const OP_JETTON_TRANSFER: u32 = 0x0f8a_7ea5;

/// NFT item `transfer` operation
pub const OP_NFT_TRANSFER: u32 = 0x5fcc_3d14;

/// Text comment prefix
pub const OP_COMMENT: u32 = 0;

/// High half of every query id we issue
pub const QUERY_ID_PREFIX: u32 = 0x546d_e4ef;

/// Amount forwarded to the recipient's wallet with transfer notifications
const FORWARD_NOTIFY_AMOUNT: u128 = 1;

const FIRST_CHUNK_BYTES: usize = 123;
const NEXT_CHUNK_BYTES: usize = 127;

/// Query id: fixed 32-bit prefix followed by 32 random bits
pub fn new_query_id() -> u64 {
    ((QUERY_ID_PREFIX as u64) << 32) | rand::thread_rng().gen::<u32>() as u64
}

/// Text comment: op 0 followed by UTF-8 bytes, continued in a chain of
/// child cells once the first cell is full
pub fn comment_body(text: &str) -> CellResult<ArcCell> {
    let bytes = text.as_bytes();
    let (head, rest) = bytes.split_at(bytes.len().min(FIRST_CHUNK_BYTES));

    let mut tail: Option<ArcCell> = None;
    for chunk in rest.chunks(NEXT_CHUNK_BYTES).rev() {
        let mut b = CellBuilder::new();
        b.store_slice(chunk)?;
        if let Some(next) = tail.take() {
            b.store_reference(&next)?;
        }
        tail = Some(Arc::new(b.build()?));
    }

    let mut b = CellBuilder::new();
    b.store_u32(32, OP_COMMENT)?.store_slice(head)?;
    if let Some(next) = tail {
        b.store_reference(&next)?;
    }
    Ok(Arc::new(b.build()?))
}

/// Token wallet transfer request
///
/// `destination` is the token owner that receives `amount`; `response`
/// receives the excess native value. An optional memo is forwarded as a
/// comment payload.
pub fn jetton_transfer_body(
    query_id: u64,
    amount: u128,
    destination: &Address,
    response: &Address,
    memo: Option<&str>,
) -> CellResult<ArcCell> {
    let forward_payload = memo.map(comment_body).transpose()?;

    let mut b = CellBuilder::new();
    b.store_u32(32, OP_JETTON_TRANSFER)?
        .store_u64(64, query_id)?
        .store_coins(&coins(amount))?
        .store_address(&destination.to_ton_address())?
        .store_address(&response.to_ton_address())?
        // no custom payload
        .store_bit(false)?
        .store_coins(&coins(FORWARD_NOTIFY_AMOUNT))?;
    match forward_payload {
        Some(payload) => {
            b.store_bit(true)?.store_reference(&payload)?;
        }
        None => {
            b.store_bit(false)?;
        }
    }
    Ok(Arc::new(b.build()?))
}

/// NFT item ownership transfer request
pub fn nft_transfer_body(
    query_id: u64,
    new_owner: &Address,
    response: &Address,
) -> CellResult<ArcCell> {
    let mut b = CellBuilder::new();
    b.store_u32(32, OP_NFT_TRANSFER)?
        .store_u64(64, query_id)?
        .store_address(&new_owner.to_ton_address())?
        .store_address(&response.to_ton_address())?
        .store_bit(false)?
        .store_coins(&coins(FORWARD_NOTIFY_AMOUNT))?
        // empty forward payload, inline
        .store_bit(false)?;
    Ok(Arc::new(b.build()?))
}
