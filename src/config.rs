//! Configuration loading
//!
//! TOML file with per-field defaults, then `.env`/environment overrides.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::rpc::LedgerApiConfig;
use crate::tx_builder::seqno::SeqnoFallback;
use crate::types::{Network, WalletGeneration};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub api: LedgerApiConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub fees: FeeConfig,
    #[serde(default)]
    pub seqno: SeqnoConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletConfig {
    /// Generation used when a request does not name one
    #[serde(default)]
    pub generation: WalletGeneration,
    #[serde(default)]
    pub network: Network,
    #[serde(default)]
    pub workchain: i8,
}

/// Fee floors, margins and emulation balances (smallest units)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeeConfig {
    /// Lowest value attached to a token transfer message
    #[serde(default = "default_jetton_min_fee")]
    pub jetton_min_fee: u64,
    /// Value attached to a token transfer when no network fee is supplied
    #[serde(default = "default_jetton_forward_value")]
    pub default_jetton_forward_value: u64,
    /// Safety margin applied to emulated fees, in percent
    #[serde(default = "default_fee_margin_percent")]
    pub fee_margin_percent: u64,
    /// Synthetic sender balance for fee estimates
    #[serde(default = "default_emulation_balance")]
    pub emulation_balance: u64,
    /// Synthetic sender balance for NFT transfer emulation
    #[serde(default = "default_nft_emulation_balance")]
    pub nft_emulation_balance: u64,
    /// Lifetime of a signed message
    #[serde(default = "default_message_ttl_secs")]
    pub message_ttl_secs: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeqnoConfig {
    #[serde(default)]
    pub fallback: SeqnoFallback,
}

fn default_jetton_min_fee() -> u64 { 50_000_000 }
fn default_jetton_forward_value() -> u64 { 1_000_000_000 }
fn default_fee_margin_percent() -> u64 { 5 }
fn default_emulation_balance() -> u64 { 100_000_000_000 }
fn default_nft_emulation_balance() -> u64 { 1_000_000_000 }
fn default_message_ttl_secs() -> u32 { 60 }

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            jetton_min_fee: default_jetton_min_fee(),
            default_jetton_forward_value: default_jetton_forward_value(),
            fee_margin_percent: default_fee_margin_percent(),
            emulation_balance: default_emulation_balance(),
            nft_emulation_balance: default_nft_emulation_balance(),
            message_ttl_secs: default_message_ttl_secs(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config file {}", path))?;
        Ok(config)
    }

    /// Load from file, then apply `.env` and environment overrides
    pub fn from_file_with_env(path: &str) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::from_file(path)?;
        config.apply_env()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, for running without a file
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> anyhow::Result<()> {
        self.api.apply_env();
        if let Ok(network) = std::env::var("TON_NETWORK") {
            self.wallet.network = network.parse().map_err(anyhow::Error::msg)?;
        }
        if let Ok(generation) = std::env::var("TON_WALLET_VERSION") {
            self.wallet.generation = generation.parse().map_err(anyhow::Error::msg)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.api.validate()?;
        if self.fees.fee_margin_percent > 100 {
            bail!(
                "fees.fee_margin_percent must be at most 100, got {}",
                self.fees.fee_margin_percent
            );
        }
        if self.fees.message_ttl_secs == 0 {
            bail!("fees.message_ttl_secs must be greater than 0");
        }
        if self.fees.emulation_balance == 0 {
            bail!("fees.emulation_balance must be greater than 0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.fees.jetton_min_fee, 50_000_000);
        assert_eq!(config.fees.default_jetton_forward_value, 1_000_000_000);
        assert_eq!(config.fees.message_ttl_secs, 60);
        assert_eq!(config.wallet.generation, WalletGeneration::V5R1);
        assert_eq!(config.seqno.fallback, SeqnoFallback::Zero);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[api]
base_url = "http://localhost:8081"
timeout_ms = 5000

[wallet]
generation = "v4r2"
network = "testnet"

[fees]
jetton_min_fee = 70000000

[seqno]
fallback = "abort"
"#
        )
        .unwrap();

        let config = Config::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8081");
        assert_eq!(config.api.timeout_ms, 5000);
        assert_eq!(config.wallet.generation, WalletGeneration::V4R2);
        assert_eq!(config.wallet.network, Network::Testnet);
        assert_eq!(config.fees.jetton_min_fee, 70_000_000);
        assert_eq!(config.fees.fee_margin_percent, 5);
        assert_eq!(config.seqno.fallback, SeqnoFallback::Abort);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.fees.fee_margin_percent = 150;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.api.timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_generation_rejected() {
        let parsed: Result<Config, _> = toml::from_str("[wallet]\ngeneration = \"v3r2\"\n");
        assert!(parsed.is_err());
    }
}
