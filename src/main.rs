//! ton-transfer command line
//!
//! Derives wallet addresses, builds and estimates transfers, and submits
//! signed messages through the ledger HTTP API.
//!
//! Key material is read from `TON_SECRET_KEY` (base64 32-byte seed or
//! 64-byte expanded secret), never from the command line.

// Compiler warning configuration
#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(dead_code)]
#![warn(unused_must_use)]

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ton_transfer::cell::Address;
use ton_transfer::config::Config;
use ton_transfer::metrics::metrics;
use ton_transfer::tx_builder::{
    AdminFeeSpec, JettonTransferRequest, MaxEstimateRequest, TransferOrchestrator, TransferOutput, TransferRequest,
};
use ton_transfer::types::{AdminFee, WalletGeneration};
use ton_transfer::units::{from_nano, to_nano};
use ton_transfer::wallet::SigningIdentity;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON log lines
    #[arg(long)]
    json: bool,

    /// Print Prometheus metrics to stderr on exit
    #[arg(long)]
    print_metrics: bool,

    /// Wallet generation (v4r2 or v5r1); defaults to the configured one
    #[arg(long, global = true)]
    wallet: Option<WalletGeneration>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the wallet address for the configured key
    Address,

    /// Print the current seqno of the wallet
    Seqno,

    /// Build (and optionally broadcast) a native transfer
    Transfer {
        #[arg(long)]
        to: Address,
        /// Amount in coins, e.g. "0.5"
        #[arg(long)]
        amount: String,
        #[arg(long)]
        memo: Option<String>,
        #[arg(long)]
        bounce: Option<bool>,
        #[command(flatten)]
        admin: AdminArgs,
        /// Emulate and print the fee
        #[arg(long)]
        estimate: bool,
        #[arg(long)]
        broadcast: bool,
    },

    /// Build (and optionally broadcast) a token transfer
    JettonTransfer {
        /// Sender's token wallet
        #[arg(long)]
        token_wallet: Address,
        #[arg(long)]
        to: Address,
        /// Amount in token units
        #[arg(long)]
        amount: u128,
        #[arg(long)]
        memo: Option<String>,
        /// Caller's fee estimate in coins
        #[arg(long)]
        network_fee: Option<String>,
        #[command(flatten)]
        admin: AdminArgs,
        #[arg(long)]
        estimate: bool,
        #[arg(long)]
        broadcast: bool,
    },

    /// Largest amount the wallet can send after fees
    EstimateMax {
        #[arg(long)]
        to: Address,
        #[arg(long)]
        admin_address: Address,
        /// Fraction in [0, 1]
        #[arg(long, default_value_t = 0.0)]
        admin_percent: f64,
    },

    /// Submit a base64 wire message
    Broadcast {
        boc: String,
    },
}

#[derive(clap::Args, Debug)]
struct AdminArgs {
    #[arg(long)]
    admin_address: Option<Address>,
    /// Fraction of the amount in [0, 1]
    #[arg(long, conflicts_with = "admin_amount")]
    admin_percent: Option<f64>,
    /// Absolute admin fee in the transfer's unit
    #[arg(long)]
    admin_amount: Option<u128>,
    #[arg(long)]
    admin_bounce: bool,
}

impl AdminArgs {
    fn to_spec(&self) -> Result<Option<AdminFeeSpec>> {
        let Some(address) = self.admin_address else {
            if self.admin_percent.is_some() || self.admin_amount.is_some() {
                bail!("--admin-address is required with an admin fee");
            }
            return Ok(None);
        };
        let fee = match (self.admin_percent, self.admin_amount) {
            (Some(p), _) => AdminFee::Percent(p),
            (None, Some(a)) => AdminFee::Absolute(a),
            (None, None) => bail!("--admin-percent or --admin-amount is required with --admin-address"),
        };
        Ok(Some(AdminFeeSpec::new(address, fee).with_bounce(self.admin_bounce)))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose, args.json)?;

    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    let config = load_config(&args.config)?;
    config.validate()?;

    let orchestrator = TransferOrchestrator::from_config(&config)?;
    let result = run(&args, &orchestrator).await;

    if args.print_metrics {
        eprintln!("{}", metrics().encode_text()?);
    }
    result
}

async fn run(args: &Args, orchestrator: &TransferOrchestrator) -> Result<()> {
    match &args.command {
        Command::Address => {
            let identity = load_identity()?;
            let descriptor = orchestrator.derive_descriptor(args.wallet, identity.public_key())?;
            let testnet = descriptor.network.is_testnet();
            println!("raw:          {}", descriptor.address.to_raw_string());
            println!("bounceable:   {}", descriptor.address.to_friendly(true, testnet));
            println!("unbounceable: {}", descriptor.address.to_friendly(false, testnet));
        }
        Command::Seqno => {
            let identity = load_identity()?;
            let descriptor = orchestrator.derive_descriptor(args.wallet, identity.public_key())?;
            let seqno = orchestrator.client().get_seqno(&descriptor.address).await?;
            println!("{}", seqno);
        }
        Command::Transfer {
            to,
            amount,
            memo,
            bounce,
            admin,
            estimate,
            broadcast,
        } => {
            let value = to_nano(amount).map_err(anyhow::Error::msg)?;
            let mut req = TransferRequest::new(load_identity()?, *to, value);
            req.generation = args.wallet;
            req.memo = memo.clone();
            req.bounce = *bounce;
            req.admin = admin.to_spec()?;
            req.estimate_fee = *estimate;

            let output = orchestrator.create_transfer(req).await?;
            finish_output(orchestrator, output, *broadcast).await?;
        }
        Command::JettonTransfer {
            token_wallet,
            to,
            amount,
            memo,
            network_fee,
            admin,
            estimate,
            broadcast,
        } => {
            let mut req = JettonTransferRequest::new(load_identity()?, *token_wallet, *to, *amount);
            req.generation = args.wallet;
            req.memo = memo.clone();
            req.admin = admin.to_spec()?;
            req.estimate_fee = *estimate;
            req.network_fee = network_fee
                .as_deref()
                .map(to_nano)
                .transpose()
                .map_err(anyhow::Error::msg)?;

            let output = orchestrator.create_jetton_transfer(req).await?;
            finish_output(orchestrator, output, *broadcast).await?;
        }
        Command::EstimateMax {
            to,
            admin_address,
            admin_percent,
        } => {
            let mut req = MaxEstimateRequest::new(load_identity()?, *to, *admin_address, *admin_percent);
            req.generation = args.wallet;
            let estimate = orchestrator.estimate_max(req).await?;
            println!("{}", serde_json::to_string_pretty(&estimate)?);
        }
        Command::Broadcast { boc } => {
            let hash = orchestrator
                .client()
                .broadcast_message(boc.trim())
                .await
                .context("broadcast failed")?;
            println!("{}", hash);
        }
    }
    Ok(())
}

async fn finish_output(orchestrator: &TransferOrchestrator, output: TransferOutput, broadcast: bool) -> Result<()> {
    println!("seqno:  {} ({})", output.current_seqno(), output.seqno.source);
    if let Some(fee) = &output.fee {
        println!(
            "fee:    {} (emulated {})",
            from_nano(fee.fee_with_margin),
            from_nano(fee.network_fee)
        );
    }
    println!("hash:   {}", output.message.hash());

    if broadcast {
        let tx_id = orchestrator.broadcast(output.into_message()).await?;
        println!("sent:   {}", tx_id);
    } else {
        println!("boc:    {}", output.message.boc_base64());
    }
    Ok(())
}

/// Load the signing key from `TON_SECRET_KEY`
fn load_identity() -> Result<SigningIdentity> {
    let encoded = std::env::var("TON_SECRET_KEY").context("TON_SECRET_KEY is not set")?;
    let bytes = STANDARD
        .decode(encoded.trim())
        .context("TON_SECRET_KEY is not valid base64")?;
    let identity = match bytes.len() {
        32 => {
            let mut seed = [0u8; 32];
            seed.copy_from_slice(&bytes);
            SigningIdentity::from_seed(&seed)
        }
        64 => SigningIdentity::from_expanded(&bytes)?,
        n => bail!("TON_SECRET_KEY must decode to 32 or 64 bytes, got {}", n),
    };
    Ok(identity)
}

/// Initialize logging subsystem
fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let env_filter = if verbose {
        "ton_transfer=debug,info"
    } else {
        "ton_transfer=info,warn"
    };
    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| env_filter.into());

    if json || cfg!(feature = "json-logs") {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }

    Ok(())
}

/// Load configuration from file with fallback to environment and defaults
fn load_config(path: &str) -> Result<Config> {
    if std::path::Path::new(path).exists() {
        Config::from_file_with_env(path).with_context(|| format!("Failed to load config from {}", path))
    } else {
        warn!("Config file '{}' not found, using environment and defaults", path);
        Config::from_env()
    }
}
