//! Built-in verification routines.
//!
//! Real proving-system verifiers live outside the engine; these two cover
//! the common attested-result cases and back the configuration file's
//! `[[verifiers]]` entries.

use std::collections::HashSet;
use std::sync::RwLock;

use super::ProofVerifier;
use crate::crypto::{keccak256, Signature};
use crate::types::{Address, B256, U256};

/// Accepts a submission when it ends with a signature of the attester over
/// `keccak256(body)`, where `body` is everything before the signature.
///
/// Layout: `body || r || s || v`.
#[derive(Debug, Clone)]
pub struct EcdsaAttestationVerifier {
    attester: Address,
}

impl EcdsaAttestationVerifier {
    pub fn new(attester: Address) -> Self {
        Self { attester }
    }
}

impl ProofVerifier for EcdsaAttestationVerifier {
    fn verify(&self, submission: &[u8]) -> anyhow::Result<bool> {
        if submission.len() < Signature::LEN {
            return Err(anyhow::anyhow!(
                "Attestation too short: {} bytes, need at least {}",
                submission.len(),
                Signature::LEN
            ));
        }
        let (body, sig) = submission.split_at(submission.len() - Signature::LEN);
        let signature = Signature::from_slice(sig)?;
        match signature.recover(&keccak256(body)) {
            Ok(signer) => Ok(signer == self.attester),
            Err(_) => Ok(false),
        }
    }
}

/// Accepts a submission proving that a leaf is included in a Merkle root
/// previously attested to this verifier.
///
/// Layout: `leaf (32) || index (32) || sibling_0 (32) || ... || sibling_n (32)`.
/// Nodes are `keccak256(left || right)`; bit `i` of the index says whether
/// the node at level `i` is a right child.
#[derive(Debug, Default)]
pub struct MerkleInclusionVerifier {
    roots: RwLock<HashSet<B256>>,
}

impl MerkleInclusionVerifier {
    pub fn new(roots: impl IntoIterator<Item = B256>) -> Self {
        Self {
            roots: RwLock::new(roots.into_iter().collect()),
        }
    }

    pub fn attest_root(&self, root: B256) -> anyhow::Result<()> {
        self.roots
            .write()
            .map_err(|_| anyhow::anyhow!("Root set lock poisoned"))?
            .insert(root);
        Ok(())
    }

    /// Folds a leaf and its siblings up to the root they imply.
    pub fn compute_root(leaf: B256, index: U256, siblings: &[B256]) -> B256 {
        let mut node = leaf;
        let mut index = index;
        for sibling in siblings {
            let mut preimage = [0u8; 64];
            if index.bit(0) {
                preimage[..32].copy_from_slice(sibling.as_bytes());
                preimage[32..].copy_from_slice(node.as_bytes());
            } else {
                preimage[..32].copy_from_slice(node.as_bytes());
                preimage[32..].copy_from_slice(sibling.as_bytes());
            }
            node = keccak256(&preimage);
            index = index >> 1usize;
        }
        node
    }
}

impl ProofVerifier for MerkleInclusionVerifier {
    fn verify(&self, submission: &[u8]) -> anyhow::Result<bool> {
        if submission.len() < 64 || submission.len() % 32 != 0 {
            return Err(anyhow::anyhow!(
                "Inclusion proof must be a whole number of words, at least two, got {} bytes",
                submission.len()
            ));
        }
        let leaf = B256::from_slice(&submission[..32]);
        let index = U256::from_big_endian(&submission[32..64]);
        let siblings: Vec<B256> = submission[64..].chunks(32).map(B256::from_slice).collect();

        let root = Self::compute_root(leaf, index, &siblings);
        let roots = self
            .roots
            .read()
            .map_err(|_| anyhow::anyhow!("Root set lock poisoned"))?;
        Ok(roots.contains(&root))
    }
}
