//! Configuration Management Module
//!
//! This module handles loading and managing configuration for the intent
//! markets. Configuration includes the permit domain and market addresses,
//! validation limits, the verifier registry and initial ledger balances.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use crate::crypto::PermitDomain;
use crate::types::{Address, Asset, B256, U256};
use crate::validation::ValidationConfig;
use crate::verification::{
    EcdsaAttestationVerifier, MerkleInclusionVerifier, ProofVerifier, ProvingSystemId,
    VerifierRegistry, VerifierTarget,
};

pub const DEFAULT_CONFIG_PATH: &str = "config/market.toml";
pub const CONFIG_PATH_ENV: &str = "MARKET_CONFIG_PATH";

// ============================================================================
// CONFIGURATION STRUCTURES
// ============================================================================

/// Main configuration structure.
///
/// This structure holds configuration for:
/// - The permit domain and the two market addresses
/// - Validation limits used by bidders
/// - Verification routines available to resolutions
/// - Initial balances credited to the ledger at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub market: MarketConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub verifiers: Vec<VerifierConfig>,
    #[serde(default)]
    pub genesis: Vec<GenesisBalance>,
}

/// Addresses that scope signatures and escrow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Chain id folded into the permit domain separator
    pub chain_id: u64,
    /// Verifying contract of the permit domain
    pub permit_contract: Address,
    /// Address of the request market (spender of request permits)
    pub request_market: Address,
    /// Address of the offer market (spender of offer permits)
    pub offer_market: Address,
}

/// One `[[verifiers]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Verifier address as named in intent descriptors
    pub target: Address,
    /// Entry point selector, 4 bytes hex (e.g. "0x12345678")
    pub selector: String,
    pub system: ProvingSystemId,
    #[serde(flatten)]
    pub kind: VerifierKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerifierKind {
    EcdsaAttestation {
        attester: Address,
    },
    MerkleInclusion {
        #[serde(default)]
        roots: Vec<B256>,
    },
}

/// One `[[genesis]]` balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisBalance {
    pub asset: Asset,
    pub owner: Address,
    pub amount: U256,
}

impl VerifierConfig {
    pub fn selector_bytes(&self) -> anyhow::Result<[u8; 4]> {
        let stripped = self.selector.strip_prefix("0x").unwrap_or(&self.selector);
        let bytes = hex::decode(stripped)
            .with_context(|| format!("Invalid selector hex '{}'", self.selector))?;
        bytes.as_slice().try_into().map_err(|_| {
            anyhow::anyhow!(
                "Invalid selector length: expected 4 bytes, got {}",
                bytes.len()
            )
        })
    }

    pub fn target(&self) -> anyhow::Result<VerifierTarget> {
        Ok(VerifierTarget {
            verifier: self.target,
            selector: self.selector_bytes()?,
        })
    }

    fn build(&self) -> Arc<dyn ProofVerifier> {
        match &self.kind {
            VerifierKind::EcdsaAttestation { attester } => {
                Arc::new(EcdsaAttestationVerifier::new(*attester))
            }
            VerifierKind::MerkleInclusion { roots } => {
                Arc::new(MerkleInclusionVerifier::new(roots.iter().copied()))
            }
        }
    }
}

// ============================================================================
// CONFIGURATION IMPLEMENTATION
// ============================================================================

impl Config {
    /// Loads configuration from `config/market.toml`, or from the path in
    /// `MARKET_CONFIG_PATH` when set.
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated configuration
    /// * `Err(anyhow::Error)` - Missing, unparsable or invalid configuration
    pub fn load() -> anyhow::Result<Self> {
        // Check for custom config path via environment variable (for tests)
        let config_path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&config_path)
    }

    pub fn load_from(config_path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            // Configuration file doesn't exist - user needs to copy template
            return Err(anyhow::anyhow!(
                "Configuration file '{}' not found. Please copy the template:\n\
                cp config/market.template.toml config/market.toml\n\
                Then edit config/market.toml with your actual values.",
                config_path.display()
            ));
        }

        let content = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates configuration consistency.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Configuration is valid
    /// * `Err(anyhow::Error)` - Clashing market addresses, bad selectors or
    ///   duplicate verifier targets
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.market.request_market == self.market.offer_market {
            return Err(anyhow::anyhow!(
                "Configuration error: request and offer markets share the address {:?}. Each market must have its own address.",
                self.market.request_market
            ));
        }
        if self.market.request_market.is_zero() || self.market.offer_market.is_zero() {
            return Err(anyhow::anyhow!(
                "Configuration error: market addresses must not be zero"
            ));
        }

        let mut seen = HashSet::new();
        for verifier in &self.verifiers {
            let target = verifier.target()?;
            if !seen.insert(target) {
                return Err(anyhow::anyhow!(
                    "Configuration error: verifier {} is configured twice",
                    target
                ));
            }
        }
        Ok(())
    }

    pub fn permit_domain(&self) -> PermitDomain {
        PermitDomain::new(self.market.chain_id, self.market.permit_contract)
    }

    /// Builds the verifier registry from the `[[verifiers]]` entries.
    pub fn build_registry(&self) -> anyhow::Result<VerifierRegistry> {
        let mut registry = VerifierRegistry::new();
        for verifier in &self.verifiers {
            registry.register(verifier.target()?, verifier.system, verifier.build());
        }
        Ok(registry)
    }

    /// Creates a configuration with placeholder values, suitable for local
    /// development and testing.
    pub fn default() -> Self {
        Self {
            market: MarketConfig {
                chain_id: 31337,
                permit_contract: Address::from_low_u64_be(0x2000),
                request_market: Address::from_low_u64_be(0x1001),
                offer_market: Address::from_low_u64_be(0x1002),
            },
            validation: ValidationConfig::default(),
            verifiers: Vec::new(),
            genesis: Vec::new(),
        }
    }
}
