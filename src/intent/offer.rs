//! Offer intents: "I will produce this proof for `reward_amount`, and back
//! it with `stake_amount`".

use serde::{Deserialize, Serialize};

use super::{AcceptTerms, IntentKind, MarketIntent};
use crate::abi::Encoder;
use crate::crypto::{keccak256, TokenPermissions};
use crate::error::{MarketError, Result};
use crate::types::{hex_bytes, Address, Asset, Holding, B256, U256};
use crate::verification::DescriptorLayout;

pub const PROOF_OFFER_WITNESS_TYPE_STRING: &str =
    "ProofOffer(address signer,address market,uint256 nonce,address rewardToken,uint256 rewardAmount,address stakeToken,uint256 stakeAmount,uint64 startAuctionTimestamp,uint64 endAuctionTimestamp,uint32 provingTime,bytes32 inputsCommitment,bytes extraData)";

pub const FULL_PROOF_OFFER_WITNESS_TYPE_STRING_STUB: &str =
    "ProofOffer witness)TokenPermissions(address token,uint256 amount)ProofOffer(address signer,address market,uint256 nonce,address rewardToken,uint256 rewardAmount,address stakeToken,uint256 stakeAmount,uint64 startAuctionTimestamp,uint64 endAuctionTimestamp,uint32 provingTime,bytes32 inputsCommitment,bytes extraData)";

/// A provider's signed offer to produce a proof at a fixed price.
///
/// The accepting requester pays `reward_amount` of `reward_token`; the
/// signer's `stake_amount` of `stake_token` is pulled under the permit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofOffer {
    pub signer: Address,
    pub market: Address,
    pub nonce: U256,
    pub reward_token: Address,
    pub reward_amount: U256,
    pub stake_token: Address,
    pub stake_amount: U256,
    pub start_auction_timestamp: u64,
    pub end_auction_timestamp: u64,
    pub proving_time: u32,
    pub inputs_commitment: B256,
    #[serde(with = "hex_bytes")]
    pub extra_data: Vec<u8>,
}

impl MarketIntent for ProofOffer {
    const KIND: IntentKind = IntentKind::Offer;
    const WITNESS_TYPE_STRING: &'static str = PROOF_OFFER_WITNESS_TYPE_STRING;
    const PERMIT_WITNESS_TYPE_STUB: &'static str = FULL_PROOF_OFFER_WITNESS_TYPE_STRING_STUB;
    const DESCRIPTOR_LAYOUT: DescriptorLayout = DescriptorLayout::InputsOnly;

    fn signer(&self) -> Address {
        self.signer
    }

    fn market(&self) -> Address {
        self.market
    }

    fn nonce(&self) -> U256 {
        self.nonce
    }

    fn start_auction_timestamp(&self) -> u64 {
        self.start_auction_timestamp
    }

    fn end_auction_timestamp(&self) -> u64 {
        self.end_auction_timestamp
    }

    fn proving_time(&self) -> u32 {
        self.proving_time
    }

    fn inputs_commitment(&self) -> B256 {
        self.inputs_commitment
    }

    fn extra_data(&self) -> &[u8] {
        &self.extra_data
    }

    fn encode_fields(&self, enc: Encoder) -> Encoder {
        enc.address(self.signer)
            .address(self.market)
            .uint(self.nonce)
            .address(self.reward_token)
            .uint(self.reward_amount)
            .address(self.stake_token)
            .uint(self.stake_amount)
            .u64(self.start_auction_timestamp)
            .u64(self.end_auction_timestamp)
            .u64(self.proving_time as u64)
            .word(self.inputs_commitment)
            .word(keccak256(&self.extra_data))
    }

    fn permitted(&self) -> TokenPermissions {
        TokenPermissions {
            token: self.stake_token,
            amount: self.stake_amount,
        }
    }

    fn accept_terms(&self, caller: Address, _now: u64, caller_stake: U256) -> Result<AcceptTerms> {
        // the offer's collateral comes from the signer, not the caller
        if !caller_stake.is_zero() {
            return Err(MarketError::InvalidIntent(
                "offers do not take a stake from the accepting requester".to_string(),
            ));
        }

        let reward = Holding::new(Asset::from_address(self.reward_token), self.reward_amount);
        let stake = Holding::new(Asset::from_address(self.stake_token), self.stake_amount);
        Ok(AcceptTerms {
            requester: caller,
            provider: self.signer,
            reward,
            stake,
            from_signer: stake,
            from_caller: reward,
        })
    }
}
