//! secp256k1 Key Generation Utility
//!
//! This binary generates a new secp256k1 key for signing intents.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin generate_keys
//! ```
//!
//! ## Output
//!
//! The script outputs:
//! - Private key (hex encoded) - pass it to `sign_intent`
//! - Ethereum address - the `signer` field of intents signed with this key

use intent_market::crypto::IntentSigner;

fn main() {
    let signer = IntentSigner::random();

    println!("Generated secp256k1 Key:");
    println!("Private Key (hex): {}", signer.private_key_hex());
    println!("Address: {:?}", signer.address());
    println!();
    println!("Keep the private key secret; use the address as the intent signer.");
}
