//! Permit-with-witness digests
//!
//! A signed intent doubles as a transfer authorization: the signer signs a
//! typed-data digest of "move `amount` of `token` from me to `spender`,
//! valid for `nonce` until `deadline`", extended with a witness hash of the
//! intent itself. Checking that one signature therefore authenticates the
//! intent and authorizes the transfer in one step.

use serde::{Deserialize, Serialize};

use super::keccak256;
use crate::abi::Encoder;
use crate::types::{Address, B256, U256};

pub const PERMIT_TRANSFER_FROM_WITNESS_TYPEHASH_STUB: &str =
    "PermitWitnessTransferFrom(TokenPermissions permitted,address spender,uint256 nonce,uint256 deadline,";

pub const TOKEN_PERMISSIONS_TYPE_STRING: &str = "TokenPermissions(address token,uint256 amount)";

pub const DOMAIN_TYPE_STRING: &str = "EIP712Domain(string name,uint256 chainId,address verifyingContract)";

pub const DOMAIN_NAME: &str = "Permit2";

/// The asset and maximum amount a permit authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPermissions {
    pub token: Address,
    pub amount: U256,
}

impl TokenPermissions {
    pub fn struct_hash(&self) -> B256 {
        let encoded = Encoder::new()
            .word(keccak256(TOKEN_PERMISSIONS_TYPE_STRING.as_bytes()))
            .address(self.token)
            .uint(self.amount)
            .finish();
        keccak256(&encoded)
    }
}

/// The typed-data domain that permits are bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitDomain {
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl PermitDomain {
    pub fn new(chain_id: u64, verifying_contract: Address) -> Self {
        Self {
            chain_id,
            verifying_contract,
        }
    }

    pub fn separator(&self) -> B256 {
        let encoded = Encoder::new()
            .word(keccak256(DOMAIN_TYPE_STRING.as_bytes()))
            .word(keccak256(DOMAIN_NAME.as_bytes()))
            .u64(self.chain_id)
            .address(self.verifying_contract)
            .finish();
        keccak256(&encoded)
    }

    /// Computes the digest a signer signs to authorize `permitted` to be
    /// pulled by `spender`, bound to `witness`.
    ///
    /// `witness_type_stub` completes [`PERMIT_TRANSFER_FROM_WITNESS_TYPEHASH_STUB`]
    /// and names the witness struct, e.g. `"ProofRequest witness)TokenPermissions(...)ProofRequest(...)"`.
    pub fn witness_digest(
        &self,
        witness_type_stub: &str,
        permitted: &TokenPermissions,
        spender: Address,
        nonce: U256,
        deadline: u64,
        witness: B256,
    ) -> B256 {
        let type_hash = keccak256(
            [
                PERMIT_TRANSFER_FROM_WITNESS_TYPEHASH_STUB.as_bytes(),
                witness_type_stub.as_bytes(),
            ]
            .concat()
            .as_slice(),
        );
        let data_hash = keccak256(
            &Encoder::new()
                .word(type_hash)
                .word(permitted.struct_hash())
                .address(spender)
                .uint(nonce)
                .u64(deadline)
                .word(witness)
                .finish(),
        );
        hash_typed_data(self.separator(), data_hash)
    }
}

/// `keccak256("\x19\x01" || domain_separator || data_hash)`
pub fn hash_typed_data(domain_separator: B256, data_hash: B256) -> B256 {
    let mut preimage = Vec::with_capacity(66);
    preimage.extend_from_slice(b"\x19\x01");
    preimage.extend_from_slice(domain_separator.as_bytes());
    preimage.extend_from_slice(data_hash.as_bytes());
    keccak256(&preimage)
}
