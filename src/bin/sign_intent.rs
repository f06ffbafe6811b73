//! Intent Signing Utility
//!
//! Signs a JSON request or offer intent for the markets in the configuration
//! and prints the signature and the intent id it will be accepted under.
//! The signed intent is then run through the `[validation]` checks a bidder
//! would apply, so an intent nobody would bid on is reported before it is
//! published.
//!
//! ## Usage
//!
//! ```bash
//! INTENT_PRIVATE_KEY=0x... cargo run --bin sign_intent -- --kind request --intent request.json
//! INTENT_PRIVATE_KEY=0x... cargo run --bin sign_intent -- --kind offer --intent offer.json --skip-validation
//! ```

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use intent_market::clock::{Clock, SystemClock};
use intent_market::config::Config;
use intent_market::crypto::{IntentSigner, Signature};
use intent_market::intent::{MarketIntent, ProofOffer, ProofRequest};
use intent_market::validation::{
    validate_offer, validate_request, ValidationContext, VerifierConstraints,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Kind {
    Request,
    Offer,
}

#[derive(Parser, Debug)]
#[command(name = "sign_intent")]
#[command(about = "Sign a request or offer intent with a secp256k1 key")]
struct Args {
    /// Intent kind
    #[arg(long, value_enum)]
    kind: Kind,

    /// JSON file containing the intent
    #[arg(long)]
    intent: String,

    /// Path to market configuration file (default: config/market.toml or MARKET_CONFIG_PATH env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Print the signature without running the bidder-side validation
    #[arg(long)]
    skip_validation: bool,
}

type Validator<I> = fn(&I, &Signature, &ValidationContext<'_>) -> intent_market::Result<()>;

fn sign<I: MarketIntent>(
    content: &str,
    signer: &IntentSigner,
    config: &Config,
    market: intent_market::Address,
    validate: Option<Validator<I>>,
) -> Result<()> {
    let intent: I = serde_json::from_str(content).context("Failed to parse intent JSON")?;
    if intent.signer() != signer.address() {
        return Err(anyhow::anyhow!(
            "Intent signer {:?} does not match key address {:?}",
            intent.signer(),
            signer.address()
        ));
    }

    let domain = config.permit_domain();
    let signature = intent.sign(signer, &domain)?;

    if let Some(validate) = validate {
        let registry = config.build_registry()?;
        let constraints = VerifierConstraints::default();
        let ctx = ValidationContext {
            market,
            domain: &domain,
            registry: &registry,
            config: &config.validation,
            constraints: &constraints,
            latest_timestamp: SystemClock.now(),
        };
        validate(&intent, &signature, &ctx).context("Signed intent fails validation")?;
    }

    let output = serde_json::json!({
        "kind": I::KIND,
        "signature": signature,
        "intent_id": intent.compute_id(&signature),
        "witness": intent.witness(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let private_key = std::env::var("INTENT_PRIVATE_KEY").map_err(|_| {
        anyhow::anyhow!(
            "Environment variable 'INTENT_PRIVATE_KEY' not set. Please set it with your secp256k1 private key (hex encoded)."
        )
    })?;
    let signer = IntentSigner::from_hex(&private_key)?;

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let content = std::fs::read_to_string(&args.intent)
        .with_context(|| format!("Failed to read intent file {}", args.intent))?;

    match args.kind {
        Kind::Request => sign::<ProofRequest>(
            &content,
            &signer,
            &config,
            config.market.request_market,
            (!args.skip_validation).then_some(validate_request as Validator<ProofRequest>),
        ),
        Kind::Offer => sign::<ProofOffer>(
            &content,
            &signer,
            &config,
            config.market.offer_market,
            (!args.skip_validation).then_some(validate_offer as Validator<ProofOffer>),
        ),
    }
}
