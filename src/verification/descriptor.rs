//! Verifier descriptor codec
//!
//! The descriptor travels inside an intent's `extra_data` as a word-encoded
//! tuple. Request intents use the full nine-word layout with the partial
//! commitment check; offer intents use the first five words only.

use serde::{Deserialize, Serialize};

use crate::abi::{AbiError, Decoder, Encoder};
use crate::crypto::{keccak256, sha256};
use crate::types::{Address, B256, U256};

/// Which descriptor layout an intent kind carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorLayout {
    /// verifier, selector, isShaCommitment, inputsOffset, inputsLength,
    /// hasPartialCommitmentResultCheck, submittedPartialCommitmentResultOffset,
    /// submittedPartialCommitmentResultLength, predeterminedPartialCommitment
    WithPartialCommitment,
    /// verifier, selector, isShaCommitment, inputsOffset, inputsLength
    InputsOnly,
}

impl DescriptorLayout {
    pub fn words(&self) -> usize {
        match self {
            DescriptorLayout::WithPartialCommitment => 9,
            DescriptorLayout::InputsOnly => 5,
        }
    }
}

/// Hash algorithm used for the inputs commitment and the partial commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitmentHash {
    Keccak256,
    Sha256,
}

impl CommitmentHash {
    pub fn hash(&self, data: &[u8]) -> B256 {
        match self {
            CommitmentHash::Keccak256 => keccak256(data),
            CommitmentHash::Sha256 => sha256(data),
        }
    }
}

/// Registry key of a verification routine: contract address plus entry
/// point selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerifierTarget {
    pub verifier: Address,
    pub selector: [u8; 4],
}

impl std::fmt::Display for VerifierTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}:0x{}", self.verifier, hex::encode(self.selector))
    }
}

/// Decoded verification descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierDetails {
    pub verifier: Address,
    pub selector: [u8; 4],
    pub is_sha_commitment: bool,
    pub inputs_offset: U256,
    pub inputs_length: U256,
    #[serde(default)]
    pub has_partial_commitment_result_check: bool,
    #[serde(default)]
    pub submitted_partial_commitment_result_offset: U256,
    #[serde(default)]
    pub submitted_partial_commitment_result_length: U256,
    #[serde(default)]
    pub predetermined_partial_commitment: B256,
}

impl VerifierDetails {
    /// Decodes `data` according to `layout`. The data must be exactly the
    /// layout's length and every word must be canonical.
    pub fn decode(data: &[u8], layout: DescriptorLayout) -> Result<Self, AbiError> {
        let mut dec = Decoder::exact(data, layout.words())?;
        let mut details = VerifierDetails {
            verifier: dec.address()?,
            selector: dec.bytes4()?,
            is_sha_commitment: dec.bool()?,
            inputs_offset: dec.uint(),
            inputs_length: dec.uint(),
            has_partial_commitment_result_check: false,
            submitted_partial_commitment_result_offset: U256::zero(),
            submitted_partial_commitment_result_length: U256::zero(),
            predetermined_partial_commitment: B256::zero(),
        };
        if layout == DescriptorLayout::WithPartialCommitment {
            details.has_partial_commitment_result_check = dec.bool()?;
            details.submitted_partial_commitment_result_offset = dec.uint();
            details.submitted_partial_commitment_result_length = dec.uint();
            details.predetermined_partial_commitment = dec.word();
        }
        Ok(details)
    }

    /// Encodes the descriptor in `layout`. Partial commitment fields are
    /// dropped by the inputs-only layout.
    pub fn encode(&self, layout: DescriptorLayout) -> Vec<u8> {
        let enc = Encoder::new()
            .address(self.verifier)
            .bytes4(self.selector)
            .bool(self.is_sha_commitment)
            .uint(self.inputs_offset)
            .uint(self.inputs_length);
        match layout {
            DescriptorLayout::InputsOnly => enc.finish(),
            DescriptorLayout::WithPartialCommitment => enc
                .bool(self.has_partial_commitment_result_check)
                .uint(self.submitted_partial_commitment_result_offset)
                .uint(self.submitted_partial_commitment_result_length)
                .word(self.predetermined_partial_commitment)
                .finish(),
        }
    }

    pub fn target(&self) -> VerifierTarget {
        VerifierTarget {
            verifier: self.verifier,
            selector: self.selector,
        }
    }

    pub fn commitment_hash(&self) -> CommitmentHash {
        if self.is_sha_commitment {
            CommitmentHash::Sha256
        } else {
            CommitmentHash::Keccak256
        }
    }
}
