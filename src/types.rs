//! Core data types shared across the pipeline

use crate::cell::Address;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ledger-side lifecycle state of an account
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    /// Never deployed (or not yet known to the ledger); seqno is 0
    Uninitialized,
    Active,
    Frozen,
    Other(String),
}

impl AccountStatus {
    /// Map the ledger API's status string
    pub fn from_api(status: &str) -> Self {
        match status {
            "active" => Self::Active,
            "uninit" | "nonexist" => Self::Uninitialized,
            "frozen" => Self::Frozen,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => f.write_str("uninitialized"),
            Self::Active => f.write_str("active"),
            Self::Frozen => f.write_str("frozen"),
            Self::Other(s) => write!(f, "other({})", s),
        }
    }
}

/// Read-only snapshot of an account as seen by the ledger
///
/// A snapshot passed in by the caller is trusted as fresh; the pipeline
/// never refreshes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub address: Address,
    /// Balance in the smallest native unit
    pub balance: u64,
    pub status: AccountStatus,
    /// Raw seqno if the source reported one
    #[serde(default)]
    pub seqno: Option<u32>,
}

impl Account {
    pub fn new(address: Address, balance: u64, status: AccountStatus) -> Self {
        Self {
            address,
            balance,
            status,
            seqno: None,
        }
    }

    pub fn with_seqno(mut self, seqno: u32) -> Self {
        self.seqno = Some(seqno);
        self
    }
}

/// Network discriminator baked into wallet ids and friendly addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Testnet,
}

impl Network {
    /// Global id used by the V5R1 wallet id
    pub fn global_id(&self) -> i32 {
        match self {
            Network::Mainnet => -239,
            Network::Testnet => -3,
        }
    }

    pub fn is_testnet(&self) -> bool {
        matches!(self, Network::Testnet)
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" | "production" => Ok(Network::Mainnet),
            "testnet" | "development" => Ok(Network::Testnet),
            other => Err(format!("unknown network '{}'", other)),
        }
    }
}

/// Supported wallet contract generations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WalletGeneration {
    V4R2,
    #[default]
    V5R1,
}

impl fmt::Display for WalletGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletGeneration::V4R2 => f.write_str("v4r2"),
            WalletGeneration::V5R1 => f.write_str("v5r1"),
        }
    }
}

impl FromStr for WalletGeneration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "v4" | "v4r2" => Ok(WalletGeneration::V4R2),
            "v5" | "v5r1" => Ok(WalletGeneration::V5R1),
            other => Err(format!("unknown wallet generation '{}'", other)),
        }
    }
}

/// How the admin fee skim is specified
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminFee {
    /// Fixed amount in the transfer's unit
    Absolute(u128),
    /// Fraction of the base amount, in `[0, 1]`
    Percent(f64),
}

impl AdminFee {
    pub fn none() -> Self {
        AdminFee::Absolute(0)
    }

    /// Resolve to an absolute amount against `base`, rounding down
    pub fn resolve(&self, base: u128) -> Result<u128, String> {
        match *self {
            AdminFee::Absolute(v) => Ok(v),
            AdminFee::Percent(p) => {
                if !(0.0..=1.0).contains(&p) || p.is_nan() {
                    return Err(format!("admin percent {} outside [0, 1]", p));
                }
                Ok((base as f64 * p).floor() as u128)
            }
        }
    }
}

impl Default for AdminFee {
    fn default() -> Self {
        Self::none()
    }
}
