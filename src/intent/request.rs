//! Request intents: "pay up to `max_reward` for this work".

use serde::{Deserialize, Serialize};

use super::{AcceptTerms, IntentKind, MarketIntent};
use crate::abi::Encoder;
use crate::auction;
use crate::crypto::{keccak256, TokenPermissions};
use crate::error::{MarketError, Result};
use crate::types::{hex_bytes, Address, Asset, Holding, B256, U256};
use crate::verification::DescriptorLayout;

pub const PROOF_REQUEST_WITNESS_TYPE_STRING: &str =
    "ProofRequest(address signer,address market,uint256 nonce,address rewardToken,uint256 maxRewardAmount,uint256 minRewardAmount,uint128 minimumStake,uint64 startAuctionTimestamp,uint64 endAuctionTimestamp,uint32 provingTime,bytes32 inputsCommitment,bytes extraData)";

pub const FULL_PROOF_REQUEST_WITNESS_TYPE_STRING_STUB: &str =
    "ProofRequest witness)TokenPermissions(address token,uint256 amount)ProofRequest(address signer,address market,uint256 nonce,address rewardToken,uint256 maxRewardAmount,uint256 minRewardAmount,uint128 minimumStake,uint64 startAuctionTimestamp,uint64 endAuctionTimestamp,uint32 provingTime,bytes32 inputsCommitment,bytes extraData)";

/// A requester's signed demand for a proof.
///
/// The reward is auctioned from `min_reward_amount` up to
/// `max_reward_amount` of `reward_token`; the accepting provider must post at
/// least `minimum_stake` of the native asset as collateral.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofRequest {
    pub signer: Address,
    pub market: Address,
    pub nonce: U256,
    pub reward_token: Address,
    pub max_reward_amount: U256,
    pub min_reward_amount: U256,
    pub minimum_stake: u128,
    pub start_auction_timestamp: u64,
    pub end_auction_timestamp: u64,
    pub proving_time: u32,
    pub inputs_commitment: B256,
    #[serde(with = "hex_bytes")]
    pub extra_data: Vec<u8>,
}

impl ProofRequest {
    /// Reward a provider accepting at `now` would lock in.
    pub fn current_reward(&self, now: u64) -> Result<U256> {
        auction::current_reward(
            now,
            self.start_auction_timestamp,
            self.end_auction_timestamp,
            self.min_reward_amount,
            self.max_reward_amount,
        )
    }
}

impl MarketIntent for ProofRequest {
    const KIND: IntentKind = IntentKind::Request;
    const WITNESS_TYPE_STRING: &'static str = PROOF_REQUEST_WITNESS_TYPE_STRING;
    const PERMIT_WITNESS_TYPE_STUB: &'static str = FULL_PROOF_REQUEST_WITNESS_TYPE_STRING_STUB;
    const DESCRIPTOR_LAYOUT: DescriptorLayout = DescriptorLayout::WithPartialCommitment;

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
            .uint(self.max_reward_amount)
            .uint(self.min_reward_amount)
            .uint(U256::from(self.minimum_stake))
            .u64(self.start_auction_timestamp)
            .u64(self.end_auction_timestamp)
            .u64(self.proving_time as u64)
            .word(self.inputs_commitment)
            .word(keccak256(&self.extra_data))
    }

    fn permitted(&self) -> TokenPermissions {
        TokenPermissions {
            token: self.reward_token,
            amount: self.max_reward_amount,
        }
    }

    fn accept_terms(&self, caller: Address, now: u64, caller_stake: U256) -> Result<AcceptTerms> {
        if self.max_reward_amount < self.min_reward_amount {
            return Err(MarketError::InvalidIntent(
                "max reward is below min reward".to_string(),
            ));
        }
        if caller_stake < U256::from(self.minimum_stake) {
            return Err(MarketError::InvalidIntent(format!(
                "stake {} is below the minimum {}",
                caller_stake, self.minimum_stake
            )));
        }

        let reward = Holding::new(Asset::from_address(self.reward_token), self.current_reward(now)?);
        let stake = Holding::new(Asset::Native, caller_stake);
        Ok(AcceptTerms {
            requester: self.signer,
            provider: caller,
            reward,
            stake,
            from_signer: reward,
            from_caller: stake,
        })
    }
}
