//! EIP-712 digest of a user operation as the Safe 4337 module verifies it
//!
//! The module hashes a `SafeOp` struct under the domain
//! `EIP712Domain(uint256 chainId,address verifyingContract)`, with the module itself as
//! verifying contract. Owners sign that digest; the EntryPoint's own user operation hash
//! plays no part.

use crate::safe::user_operation::UserOperation;
use crate::safe::version::SafeVersion;
use crate::{Error, Result};
use alloy::primitives::aliases::U48;
use alloy::primitives::{Address, B256};
use alloy::sol;
use alloy::sol_types::{eip712_domain, SolStruct};
use serde::{Deserialize, Serialize};

sol! {
    #[derive(Debug)]
    struct SafeOp {
        address safe;
        uint256 nonce;
        bytes initCode;
        bytes callData;
        uint256 callGasLimit;
        uint256 verificationGasLimit;
        uint256 preVerificationGas;
        uint256 maxFeePerGas;
        uint256 maxPriorityFeePerGas;
        bytes paymasterAndData;
        uint48 validAfter;
        uint48 validUntil;
        address entryPoint;
    }
}

/// Inputs of the digest that are not part of the user operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DigestOverrides {
    /// Earliest timestamp the operation is valid at; 0 when absent
    pub valid_after: Option<u64>,
    /// Expiry timestamp; 0 (no expiry) when absent
    pub valid_until: Option<u64>,
    pub entrypoint_address: Option<Address>,
    pub safe_4337_module_address: Option<Address>,
}

impl DigestOverrides {
    pub fn validity_window(&self) -> (u64, u64) {
        (self.valid_after.unwrap_or(0), self.valid_until.unwrap_or(0))
    }
}

fn to_uint48(name: &str, value: u64) -> Result<U48> {
    U48::try_from(value)
        .map_err(|_| Error::Encoding(format!("{} {} does not fit in uint48", name, value)))
}

/// Digest the account owners sign for `op` on `chain_id`
pub fn user_operation_eip712_hash(
    op: &UserOperation,
    chain_id: u64,
    overrides: &DigestOverrides,
) -> Result<B256> {
    user_operation_eip712_hash_for_version(op, chain_id, overrides, &SafeVersion::default())
}

pub fn user_operation_eip712_hash_for_version(
    op: &UserOperation,
    chain_id: u64,
    overrides: &DigestOverrides,
    version: &SafeVersion,
) -> Result<B256> {
    let (valid_after, valid_until) = overrides.validity_window();
    let valid_after = to_uint48("validAfter", valid_after)?;
    let valid_until = to_uint48("validUntil", valid_until)?;

    let module = overrides
        .safe_4337_module_address
        .unwrap_or(version.safe_4337_module);
    let entrypoint = overrides.entrypoint_address.unwrap_or(version.entrypoint);

    let safe_op = SafeOp {
        safe: op.sender,
        nonce: op.nonce,
        initCode: op.init_code.clone(),
        callData: op.call_data.clone(),
        callGasLimit: op.call_gas_limit,
        verificationGasLimit: op.verification_gas_limit,
        preVerificationGas: op.pre_verification_gas,
        maxFeePerGas: op.max_fee_per_gas,
        maxPriorityFeePerGas: op.max_priority_fee_per_gas,
        paymasterAndData: op.paymaster_and_data.clone(),
        validAfter: valid_after,
        validUntil: valid_until,
        entryPoint: entrypoint,
    };
    let domain = eip712_domain! {
        chain_id: chain_id,
        verifying_contract: module,
    };

    Ok(safe_op.eip712_signing_hash(&domain))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safe::signature::MAX_UINT48;
    use crate::safe::version::V0_2_0;
    use alloy::primitives::{b256, keccak256, Bytes, U256};

    fn sample_op() -> UserOperation {
        UserOperation {
            sender: Address::repeat_byte(0xaa),
            nonce: U256::from(1),
            call_data: Bytes::from(vec![0x01, 0x02]),
            call_gas_limit: U256::from(100_000),
            verification_gas_limit: U256::from(200_000),
            pre_verification_gas: U256::from(50_000),
            max_fee_per_gas: U256::from(3_000_000_000u64),
            max_priority_fee_per_gas: U256::from(1_000_000_000u64),
            ..Default::default()
        }
    }

    #[test]
    fn safe_op_typehash_matches_module() {
        assert_eq!(
            keccak256(SafeOp::eip712_root_type().as_bytes()),
            b256!("84aa190356f56b8c87825f54884392a9907c23ee0f8e1ea86336b763faf021bd")
        );
    }

    #[test]
    fn domain_has_chain_id_and_verifying_contract_only() {
        let domain = eip712_domain! {
            chain_id: 1u64,
            verifying_contract: V0_2_0.safe_4337_module,
        };
        let typehash = keccak256("EIP712Domain(uint256 chainId,address verifyingContract)");
        let mut preimage = Vec::with_capacity(96);
        preimage.extend_from_slice(typehash.as_slice());
        preimage.extend_from_slice(&U256::from(1).to_be_bytes::<32>());
        preimage.extend_from_slice(V0_2_0.safe_4337_module.into_word().as_slice());

        assert_eq!(domain.separator(), keccak256(preimage));
        assert_eq!(
            domain.separator(),
            b256!("e75fc27bf44b9286532b55b23215c8c9a12369569f3dbac368dc39df9be7384e")
        );
    }

    #[test]
    fn golden_digest() {
        let op = sample_op();
        let digest = user_operation_eip712_hash(&op, 1, &DigestOverrides::default()).unwrap();
        assert_eq!(
            digest,
            b256!("c9da6b2960b12b509d0a23b3d944e12b7fcdaa3e95f9be1bd188722e0bff5eb5")
        );

        let windowed = DigestOverrides {
            valid_after: Some(1_700_000_000),
            valid_until: Some(1_800_000_000),
            ..Default::default()
        };
        assert_eq!(
            user_operation_eip712_hash(&op, 1, &windowed).unwrap(),
            b256!("e7e06985f54395ffcc905cee404b40229ff6a3cc21d3d1c1f7c882051a467c28")
        );
    }

    #[test]
    fn digest_is_pure_and_chain_bound() {
        let op = sample_op();
        let overrides = DigestOverrides::default();
        let first = user_operation_eip712_hash(&op, 1, &overrides).unwrap();
        let second = user_operation_eip712_hash(&op, 1, &overrides).unwrap();
        let other_chain = user_operation_eip712_hash(&op, 10, &overrides).unwrap();

        assert_eq!(first, second);
        assert_ne!(first, other_chain);
    }

    #[test]
    fn signature_field_is_not_hashed() {
        let op = sample_op();
        let signed = UserOperation {
            signature: Bytes::from(vec![0x55; 77]),
            ..op.clone()
        };
        let overrides = DigestOverrides::default();
        assert_eq!(
            user_operation_eip712_hash(&op, 1, &overrides).unwrap(),
            user_operation_eip712_hash(&signed, 1, &overrides).unwrap()
        );
    }

    #[test]
    fn overridden_module_changes_digest() {
        let op = sample_op();
        let overrides = DigestOverrides {
            safe_4337_module_address: Some(Address::repeat_byte(0x42)),
            ..Default::default()
        };
        assert_ne!(
            user_operation_eip712_hash(&op, 1, &DigestOverrides::default()).unwrap(),
            user_operation_eip712_hash(&op, 1, &overrides).unwrap()
        );
    }

    #[test]
    fn oversized_validity_is_rejected() {
        let overrides = DigestOverrides {
            valid_after: Some(MAX_UINT48 + 1),
            ..Default::default()
        };
        let err = user_operation_eip712_hash(&sample_op(), 1, &overrides).unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
    }
}
