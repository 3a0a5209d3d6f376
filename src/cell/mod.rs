//! Ledger serialization primitives
//!
//! Cells, bags of cells and addresses come from `tonlib-core`; this module
//! is the narrow seam the rest of the crate goes through:
//! - **boc**: wire encoding (base64 of a single-root bag of cells) with a
//!   header sanity check ahead of the parser
//! - **address**: the [`Address`] value type with raw (`0:<hex>`) and
//!   user-friendly (base64, checksummed) text forms

pub mod address;
pub mod boc;

pub use address::{Address, FriendlyFlags};
pub use boc::{cell_hash_hex, decode_boc, decode_boc_base64, encode_boc, encode_boc_base64};
pub use tonlib_core::cell::{ArcCell, BagOfCells, Cell, CellBuilder, TonCellError};

use num_bigint::BigUint;
use thiserror::Error;

/// Errors raised while building, encoding or parsing cells
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CellError {
    /// Builder rejected a write (overflow, value range, reference limit)
    #[error("Cell encoding error: {0}")]
    Encoding(String),

    /// Malformed bag-of-cells input
    #[error("Invalid bag of cells: {0}")]
    InvalidBoc(String),

    /// Malformed address text
    #[error("Invalid address '{input}': {reason}")]
    InvalidAddress { input: String, reason: String },
}

impl From<TonCellError> for CellError {
    fn from(err: TonCellError) -> Self {
        CellError::Encoding(err.to_string())
    }
}

pub type CellResult<T> = std::result::Result<T, CellError>;

/// Coin amount in the form the cell builder stores
pub fn coins(value: u128) -> BigUint {
    BigUint::from(value)
}
