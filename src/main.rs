//! The Sweeper - NFT fill transaction builder
//!
//! Reads a JSON batch of desired fills, synthesizes the aggregated fill
//! transaction, and prints it ready for signing. Never signs, never submits.
//!
//! Run with: cargo run -- fill-listings --batch batch.json

use alloy_primitives::{Address, Bytes, U256};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Result};
use console::style;
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sweeper::onchain::{ChainReader, RpcChainReader};
use sweeper::{
    BidDetail, Config, ContractKind, Fee, FillOptions, FillTransaction, ListingDetail, OrderFlags,
    OrderKind, Router, SignedOrder, NATIVE_ETH,
};

// ============================================
// CLI
// ============================================

#[derive(Parser)]
#[command(name = "sweeper", about = "NFT marketplace fill aggregation")]
struct Cli {
    /// Path to the TOML configuration file; falls back to environment
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build one transaction filling a batch of listings
    FillListings {
        /// JSON batch file
        #[arg(long)]
        batch: PathBuf,
    },

    /// Build one transaction accepting a single bid
    FillBid {
        /// JSON batch file (uses the `bid` entry)
        #[arg(long)]
        batch: PathBuf,
    },

    /// Validate and print the active configuration
    ConfigCheck,
}

fn print_banner() {
    println!();
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!(
        "{}",
        style(" 🧹 THE SWEEPER - NFT Fill Aggregation").cyan().bold()
    );
    println!(
        "{}",
        style("    16 protocols | One transaction | Exact totals").cyan()
    );
    println!(
        "{}",
        style("═══════════════════════════════════════════════════════════════").cyan()
    );
    println!();
}

// ============================================
// BATCH FILE (wire format)
// ============================================
//
// Addresses and amounts arrive as strings and are parsed exactly once,
// here at the boundary.

#[derive(Debug, Deserialize)]
struct BatchFile {
    taker: String,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    global_fees: Vec<WireFee>,
    #[serde(default)]
    partial: Option<bool>,
    #[serde(default)]
    skip_errors: Option<bool>,
    #[serde(default)]
    force_router: Option<bool>,
    #[serde(default)]
    listings: Vec<WireOrder>,
    #[serde(default)]
    bid: Option<WireOrder>,
}

#[derive(Debug, Deserialize)]
struct WireFee {
    recipient: String,
    amount: String,
}

#[derive(Debug, Deserialize)]
struct WireOrder {
    kind: String,
    contract: String,
    token_id: String,
    maker: String,
    price: String,
    raw: String,
    #[serde(default)]
    amount: Option<String>,
    #[serde(default)]
    quantity: Option<String>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    fees: Vec<WireFee>,
    #[serde(default)]
    erc1155: bool,
    #[serde(default)]
    cb_custodied: bool,
    #[serde(default)]
    additive_fee: Option<String>,
}

fn parse_address(s: &str) -> Result<Address> {
    Address::from_str(s).map_err(|e| eyre!("bad address {}: {}", s, e))
}

fn parse_u256(s: &str) -> Result<U256> {
    let parsed = if let Some(hex) = s.strip_prefix("0x") {
        U256::from_str_radix(hex, 16)
    } else {
        U256::from_str_radix(s, 10)
    };
    parsed.map_err(|e| eyre!("bad amount {}: {}", s, e))
}

fn parse_fee(fee: &WireFee) -> Result<Fee> {
    Ok(Fee::new(parse_address(&fee.recipient)?, parse_u256(&fee.amount)?))
}

fn parse_currency(s: Option<&String>) -> Result<Address> {
    match s {
        None => Ok(NATIVE_ETH),
        Some(s) if s.is_empty() || s == "eth" => Ok(NATIVE_ETH),
        Some(s) => parse_address(s),
    }
}

fn parse_order(wire: &WireOrder) -> Result<SignedOrder> {
    let kind = OrderKind::from_str(&wire.kind).map_err(|e| eyre!(e))?;
    let raw = hex::decode(wire.raw.trim_start_matches("0x"))
        .map_err(|e| eyre!("order raw is not hex: {}", e))?;

    let mut order = SignedOrder::new(
        kind,
        parse_address(&wire.maker)?,
        parse_currency(wire.currency.as_ref())?,
        parse_u256(&wire.price)?,
        wire.quantity
            .as_deref()
            .map(parse_u256)
            .transpose()?
            .unwrap_or_else(|| U256::from(1)),
        Bytes::from(raw),
    );
    order.flags = OrderFlags {
        cb_custodied: wire.cb_custodied,
        additive_fee: wire
            .additive_fee
            .as_deref()
            .map(parse_u256)
            .transpose()?
            .unwrap_or(U256::ZERO),
    };
    Ok(order)
}

fn parse_listing(wire: &WireOrder) -> Result<ListingDetail> {
    Ok(ListingDetail {
        contract_kind: if wire.erc1155 {
            ContractKind::Erc1155
        } else {
            ContractKind::Erc721
        },
        contract: parse_address(&wire.contract)?,
        token_id: parse_u256(&wire.token_id)?,
        amount: wire.amount.as_deref().map(parse_u256).transpose()?,
        currency: parse_currency(wire.currency.as_ref())?,
        fees: wire.fees.iter().map(parse_fee).collect::<Result<_>>()?,
        order: parse_order(wire)?,
    })
}

fn parse_bid(wire: &WireOrder) -> Result<BidDetail> {
    Ok(BidDetail {
        contract_kind: if wire.erc1155 {
            ContractKind::Erc1155
        } else {
            ContractKind::Erc721
        },
        contract: parse_address(&wire.contract)?,
        token_id: parse_u256(&wire.token_id)?,
        amount: wire.amount.as_deref().map(parse_u256).transpose()?,
        fees: wire.fees.iter().map(parse_fee).collect::<Result<_>>()?,
        order: parse_order(wire)?,
    })
}

fn parse_options(batch: &BatchFile, config: &Config) -> Result<FillOptions> {
    let mut options = config.fill_options();
    options.global_fees = batch
        .global_fees
        .iter()
        .map(parse_fee)
        .collect::<Result<_>>()?;
    if let Some(partial) = batch.partial {
        options.partial = partial;
    }
    if let Some(skip) = batch.skip_errors {
        options.skip_errors = skip;
    }
    if let Some(force) = batch.force_router {
        options.force_router = force;
    }
    Ok(options)
}

// ============================================
// OUTPUT
// ============================================

async fn print_transaction(tx: &FillTransaction, currency: Address, config: &Config) {
    println!();
    println!("{}", style("Fill transaction ready:").green().bold());
    println!("   to:    {:?}", tx.to);

    if currency == NATIVE_ETH {
        let eth = tx.value.to_string();
        println!("   value: {} wei", eth);
    } else {
        // Scale by the token's decimals where the chain will tell us.
        let book = sweeper::AddressBook::for_chain(config.chain_id);
        match book.map(|b| RpcChainReader::new(config.rpc_url.clone(), &b)) {
            Some(reader) => match reader.token_decimals(currency).await {
                Ok(decimals) => println!(
                    "   value: {} wei (settles in {:?}, {} decimals)",
                    tx.value, currency, decimals
                ),
                Err(_) => println!("   value: {} wei (settles in {:?})", tx.value, currency),
            },
            None => println!("   value: {} wei", tx.value),
        }
    }

    println!("   data:  {} bytes", tx.data.len());
    println!("   0x{}", hex::encode(&tx.data));
    println!();
}

// ============================================
// MAIN
// ============================================

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    print_banner();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    config.validate()?;

    match cli.command {
        Command::ConfigCheck => {
            config.print_summary();
            println!("{}", style("Configuration OK").green());
        }

        Command::FillListings { batch } => {
            let content = std::fs::read_to_string(&batch)?;
            let parsed: BatchFile = serde_json::from_str(&content)?;

            let taker = parse_address(&parsed.taker)?;
            let currency = parse_currency(parsed.currency.as_ref())?;
            let options = parse_options(&parsed, &config)?;
            let details: Vec<ListingDetail> = parsed
                .listings
                .iter()
                .map(parse_listing)
                .collect::<Result<_>>()?;

            info!("building fill for {} listing(s)", details.len());

            let router = Router::from_config(&config)?;
            let fill = router
                .fill_listings(&details, taker, currency, &options)
                .await?;

            print_transaction(&fill.tx, currency, &config).await;

            let filled = fill.success.iter().filter(|s| **s).count();
            println!("   filled:  {}/{}", filled, fill.success.len());
            if !fill.errored.is_empty() {
                warn!("skipped indices: {:?}", fill.errored);
            }
        }

        Command::FillBid { batch } => {
            let content = std::fs::read_to_string(&batch)?;
            let parsed: BatchFile = serde_json::from_str(&content)?;

            let taker = parse_address(&parsed.taker)?;
            let options = parse_options(&parsed, &config)?;
            let detail = parsed
                .bid
                .as_ref()
                .ok_or_else(|| eyre!("batch file has no `bid` entry"))?;
            let detail = parse_bid(detail)?;

            let router = Router::from_config(&config)?;
            let fill = router.fill_bid(&detail, taker, &options).await?;

            print_transaction(&fill.tx, NATIVE_ETH, &config).await;
            println!(
                "   path:    {}",
                if fill.direct {
                    "direct protocol fill"
                } else {
                    "safe-transfer into module (no approval needed)"
                }
            );
        }
    }

    Ok(())
}
