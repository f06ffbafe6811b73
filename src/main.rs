//! Intent Market Sequencer
//!
//! Applies a totally ordered batch of market calls (deposits, accepts,
//! resolves) to the request and offer markets described by the configuration,
//! then prints the receipts and emitted events as JSON.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin intent-market -- --calls calls.json
//! cargo run --bin intent-market -- --config config/market.toml --calls calls.json
//! ```
//!
//! Or set the config path via environment variable:
//!
//! ```bash
//! MARKET_CONFIG_PATH=config/market.toml cargo run --bin intent-market -- --calls calls.json
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use intent_market::config::Config;
use intent_market::sequencer::{Call, Receipt, Sequencer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "intent-market")]
#[command(about = "Apply a batch of calls to the intent markets and print the receipts")]
struct Args {
    /// Path to market configuration file (default: config/market.toml or MARKET_CONFIG_PATH env var)
    #[arg(short, long)]
    config: Option<String>,

    /// JSON file containing an array of calls, in sequencing order
    #[arg(long)]
    calls: String,

    /// Initial clock value (default: timestamp of the first call)
    #[arg(long)]
    start_time: Option<u64>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting Intent Market Sequencer");

    // Priority: CLI arg > env var > default
    let config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            Config::load_from(path)?
        }
        None => Config::load()?,
    };
    info!(
        "Configuration loaded: chain {}, request market {:?}, offer market {:?}",
        config.market.chain_id, config.market.request_market, config.market.offer_market
    );

    let content = std::fs::read_to_string(&args.calls)
        .with_context(|| format!("Failed to read calls file {}", args.calls))?;
    let calls: Vec<Call> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse calls file {}", args.calls))?;
    info!("Loaded {} calls", calls.len());

    let start_time = args
        .start_time
        .or_else(|| calls.first().map(Call::timestamp))
        .unwrap_or_default();
    let sequencer = Sequencer::from_config(&config, start_time)?;

    let receipts = sequencer.apply_all(&calls);
    let failed = receipts
        .iter()
        .filter(|r| matches!(r, Receipt::Failed { .. }))
        .count();
    info!("Applied {} calls, {} failed", receipts.len(), failed);

    let output = serde_json::json!({
        "receipts": receipts,
        "events": sequencer.events(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
