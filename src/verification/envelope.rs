//! Submission envelope
//!
//! Opaque proof data is decoded against the descriptor into an envelope that
//! names its sub-fields. Bounds are checked once, here; everything after
//! works on typed slices.

use std::ops::Range;

use super::descriptor::VerifierDetails;
use crate::error::{MarketError, Result};
use crate::types::U256;

/// A submission split into the fields its descriptor declares.
#[derive(Debug, Clone, Copy)]
pub struct SubmissionEnvelope<'a> {
    /// The full submission, as handed to the verification routine.
    pub payload: &'a [u8],
    /// The committed inputs, when the descriptor declares a non-empty field.
    pub inputs: Option<&'a [u8]>,
    /// The final-result field of the partial commitment check, when enabled.
    pub partial_result: Option<&'a [u8]>,
}

impl<'a> SubmissionEnvelope<'a> {
    pub fn decode(details: &VerifierDetails, payload: &'a [u8]) -> Result<Self> {
        let inputs = if details.inputs_length.is_zero() {
            None
        } else {
            let range = field_range(details.inputs_offset, details.inputs_length, payload.len())
                .ok_or(MarketError::InvalidCommitmentField)?;
            Some(&payload[range])
        };

        let partial_result = if details.has_partial_commitment_result_check {
            let range = field_range(
                details.submitted_partial_commitment_result_offset,
                details.submitted_partial_commitment_result_length,
                payload.len(),
            )
            .ok_or(MarketError::InvalidExpectedPartialCommitmentResultField)?;
            Some(&payload[range])
        } else {
            None
        };

        Ok(Self {
            payload,
            inputs,
            partial_result,
        })
    }
}

/// `offset..offset + length`, if it lies within `len` bytes.
fn field_range(offset: U256, length: U256, len: usize) -> Option<Range<usize>> {
    let end = offset.checked_add(length)?;
    if end > U256::from(len) {
        return None;
    }
    // both bounded by len, which fits in usize
    Some(offset.low_u64() as usize..end.low_u64() as usize)
}
