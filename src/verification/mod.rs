//! Verification Dispatcher Module
//!
//! Decides at resolution time whether a submission proves the work an active
//! record was accepted for. The dispatcher:
//!
//! 1. Decodes the submission into a [`SubmissionEnvelope`] using the
//!    record's [`VerifierDetails`] (out-of-bounds fields are errors)
//! 2. Checks the declared inputs field against the stored inputs commitment
//! 3. Checks the partial commitment composition, when the descriptor asks for it
//! 4. Hands the full submission to the registered [`ProofVerifier`]
//!
//! A mismatch at step 2 or 3, or a failing routine at step 4, is the normal
//! "not verified" outcome rather than an error.

pub mod descriptor;
pub mod envelope;
pub mod registry;
pub mod systems;

use tracing::{debug, info};

use crate::error::Result;
use crate::types::B256;

pub use descriptor::{CommitmentHash, DescriptorLayout, VerifierDetails, VerifierTarget};
pub use envelope::SubmissionEnvelope;
pub use registry::{ProvingSystemId, VerifierRegistry};
pub use systems::{EcdsaAttestationVerifier, MerkleInclusionVerifier};

/// An external verification routine.
///
/// Implementations receive the complete opaque submission and answer whether
/// it is a valid proof. They are treated as untrusted: errors and panics are
/// collapsed into `false` by the registry.
pub trait ProofVerifier: Send + Sync {
    fn verify(&self, submission: &[u8]) -> anyhow::Result<bool>;
}

/// Runs the full verification pipeline for one submission.
///
/// `partial_commitment` is the resolver's half of a partial commitment; it
/// defaults to the zero word when omitted.
pub fn verify_submission(
    registry: &VerifierRegistry,
    inputs_commitment: B256,
    details: &VerifierDetails,
    submission: &[u8],
    partial_commitment: Option<B256>,
) -> Result<bool> {
    let envelope = SubmissionEnvelope::decode(details, submission)?;
    let hasher = details.commitment_hash();

    if let Some(inputs) = envelope.inputs {
        if hasher.hash(inputs) != inputs_commitment {
            info!("Submitted inputs do not match the inputs commitment");
            return Ok(false);
        }
    }

    if let Some(expected) = envelope.partial_result {
        let submitted_half = partial_commitment.unwrap_or_default();
        let mut preimage = [0u8; 64];
        preimage[..32].copy_from_slice(details.predetermined_partial_commitment.as_bytes());
        preimage[32..].copy_from_slice(submitted_half.as_bytes());
        if hasher.hash(&preimage).as_bytes() != expected {
            info!("Partial commitment composition does not match the submitted result");
            return Ok(false);
        }
    }

    let target = details.target();
    let verified = registry.verify(&target, envelope.payload);
    debug!("Verifier at {} returned {}", target, verified);
    Ok(verified)
}
