//! Verifier registry
//!
//! Maps descriptor targets to verification routines. The set of proving
//! systems a routine may belong to is closed ([`ProvingSystemId`]); the
//! routines themselves are pluggable.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

use super::descriptor::VerifierTarget;
use super::ProofVerifier;

// ============================================================================
// PROVING SYSTEMS
// ============================================================================

/// Proving systems the market knows how to route proofs for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProvingSystemId {
    AlignedLayer,
    Arkworks,
    Gnark,
    Risc0,
    Sp1,
}

impl ProvingSystemId {
    pub const ALL: [ProvingSystemId; 5] = [
        ProvingSystemId::AlignedLayer,
        ProvingSystemId::Arkworks,
        ProvingSystemId::Gnark,
        ProvingSystemId::Risc0,
        ProvingSystemId::Sp1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProvingSystemId::AlignedLayer => "aligned-layer",
            ProvingSystemId::Arkworks => "arkworks",
            ProvingSystemId::Gnark => "gnark",
            ProvingSystemId::Risc0 => "risc0",
            ProvingSystemId::Sp1 => "sp1",
        }
    }
}

impl fmt::Display for ProvingSystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProvingSystemId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProvingSystemId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown proving system '{}'", s))
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

#[derive(Clone)]
struct RegisteredVerifier {
    system: ProvingSystemId,
    verifier: Arc<dyn ProofVerifier>,
}

/// Verification routines keyed by `(verifier address, selector)`.
#[derive(Clone, Default)]
pub struct VerifierRegistry {
    verifiers: HashMap<VerifierTarget, RegisteredVerifier>,
}

impl VerifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `verifier` under `target`, replacing any previous routine.
    pub fn register(
        &mut self,
        target: VerifierTarget,
        system: ProvingSystemId,
        verifier: Arc<dyn ProofVerifier>,
    ) {
        debug!("Registered {} verifier at {}", system, target);
        self.verifiers
            .insert(target, RegisteredVerifier { system, verifier });
    }

    pub fn contains(&self, target: &VerifierTarget) -> bool {
        self.verifiers.contains_key(target)
    }

    /// The proving system a registered target belongs to.
    pub fn system_of(&self, target: &VerifierTarget) -> Option<ProvingSystemId> {
        self.verifiers.get(target).map(|entry| entry.system)
    }

    pub fn len(&self) -> usize {
        self.verifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.verifiers.is_empty()
    }

    /// Runs the routine registered at `target` on `payload`.
    ///
    /// The routine is untrusted: an unknown target, a returned error and a
    /// panic all count as a failed verification.
    pub fn verify(&self, target: &VerifierTarget, payload: &[u8]) -> bool {
        let Some(entry) = self.verifiers.get(target) else {
            warn!("No verifier registered at {}", target);
            return false;
        };

        match catch_unwind(AssertUnwindSafe(|| entry.verifier.verify(payload))) {
            Ok(Ok(verified)) => verified,
            Ok(Err(e)) => {
                warn!("{} verifier at {} failed: {}", entry.system, target, e);
                false
            }
            Err(_) => {
                warn!("{} verifier at {} panicked", entry.system, target);
                false
            }
        }
    }
}

impl fmt::Debug for VerifierRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.verifiers.iter().map(|(target, entry)| (target.to_string(), entry.system)))
            .finish()
    }
}
