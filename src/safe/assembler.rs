//! User operation assembly
//!
//! Turns a list of calls into a complete, unsigned [`UserOperation`]:
//! 1. call data: `executeUserOp` for one call, a MultiSendCallOnly batch for several
//! 2. nonce from the EntryPoint unless overridden
//! 3. fees from the node and limits from the bundler, each fetched at most once and only
//!    when a field is missing from the overrides
//! 4. init code while the account is still counterfactual
//!
//! The signature field holds a dummy signature sized like the real one; callers sign the
//! SafeOp digest of the result and replace it.

use crate::error::EstimationStage;
use crate::rpc::{GasEstimator, NodeProvider};
use crate::safe::abi::{encode_execute_user_op, encode_multisend};
use crate::safe::account::SafeAccount;
use crate::safe::signature::dummy_signature;
use crate::safe::user_operation::{MetaTransaction, Operation, UserOperation};
use crate::{Error, Result};
use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// Caller-supplied values that replace computed or estimated ones
///
/// Every `Some` is used verbatim, including zero values and empty byte strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserOperationOverrides {
    pub nonce: Option<U256>,
    pub call_data: Option<Bytes>,
    pub call_gas_limit: Option<U256>,
    pub verification_gas_limit: Option<U256>,
    pub pre_verification_gas: Option<U256>,
    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,

    /// Percentages added on top of fetched values, e.g. 20 means `value * 1.2`
    pub call_gas_limit_percentage_multiplier: Option<u64>,
    pub verification_gas_limit_percentage_multiplier: Option<u64>,
    pub pre_verification_gas_percentage_multiplier: Option<u64>,
    pub max_fee_per_gas_percentage_multiplier: Option<u64>,
    pub max_priority_fee_per_gas_percentage_multiplier: Option<u64>,

    pub init_code: Option<Bytes>,
    pub paymaster_and_data: Option<Bytes>,
    pub dummy_signature: Option<Bytes>,
    /// Batch target instead of the version's MultiSendCallOnly
    pub multisend_contract_address: Option<Address>,
}

/// Account call data for `transactions`
///
/// Batches go through MultiSendCallOnly, which rejects delegate calls; asking for one
/// inside a batch fails here instead of on chain.
pub fn create_call_data(
    transactions: &[MetaTransaction],
    multisend_call_only: Address,
) -> Result<Bytes> {
    match transactions {
        [] => Err(Error::Encoding(
            "At least one transaction is required".to_string(),
        )),
        [single] => Ok(encode_execute_user_op(single)),
        batch => {
            if let Some(index) = batch
                .iter()
                .position(|tx| tx.operation == Operation::DelegateCall)
            {
                return Err(Error::Encoding(format!(
                    "Transaction {} is a delegate call; batches only support calls",
                    index
                )));
            }
            let batch_call = MetaTransaction::delegate_call(
                multisend_call_only,
                encode_multisend(batch),
            );
            Ok(encode_execute_user_op(&batch_call))
        }
    }
}

/// `value + value * percentage / 100`
fn apply_multiplier(value: U256, percentage: Option<u64>) -> U256 {
    match percentage {
        Some(pct) if pct > 0 => {
            value.saturating_add(value.saturating_mul(U256::from(pct)) / U256::from(100))
        }
        _ => value,
    }
}

/// Builds the unsigned user operation executing `transactions` from `account`
pub async fn assemble<N, G>(
    account: &SafeAccount,
    transactions: &[MetaTransaction],
    node: &N,
    estimator: &G,
    overrides: &UserOperationOverrides,
) -> Result<UserOperation>
where
    N: NodeProvider + ?Sized,
    G: GasEstimator + ?Sized,
{
    let call_data = match &overrides.call_data {
        Some(call_data) => call_data.clone(),
        None => {
            let multisend = overrides
                .multisend_contract_address
                .unwrap_or(account.version().multisend_call_only);
            create_call_data(transactions, multisend)?
        }
    };

    let sender = account.address();
    let entrypoint = account.entrypoint();

    let nonce = match overrides.nonce {
        Some(nonce) => nonce,
        None => node
            .get_nonce(sender, entrypoint)
            .await
            .map_err(|e| Error::EstimationFailed {
                stage: EstimationStage::Nonce,
                reason: e.to_string(),
            })?,
    };

    let init_code = match &overrides.init_code {
        Some(init_code) => init_code.clone(),
        None => account.deployment().init_code(),
    };

    let signature = match &overrides.dummy_signature {
        Some(signature) => signature.clone(),
        None => dummy_signature(account.threshold(), account.passkey_signer())?,
    };

    let mut user_operation = UserOperation {
        sender,
        nonce,
        init_code,
        call_data,
        call_gas_limit: overrides.call_gas_limit.unwrap_or(U256::ZERO),
        verification_gas_limit: overrides.verification_gas_limit.unwrap_or(U256::ZERO),
        pre_verification_gas: overrides.pre_verification_gas.unwrap_or(U256::ZERO),
        max_fee_per_gas: overrides.max_fee_per_gas.unwrap_or(U256::ZERO),
        max_priority_fee_per_gas: overrides.max_priority_fee_per_gas.unwrap_or(U256::ZERO),
        paymaster_and_data: overrides.paymaster_and_data.clone().unwrap_or_default(),
        signature,
    };

    if overrides.max_fee_per_gas.is_none() || overrides.max_priority_fee_per_gas.is_none() {
        let fees = node
            .get_gas_fees()
            .await
            .map_err(|e| Error::EstimationFailed {
                stage: EstimationStage::GasFees,
                reason: e.to_string(),
            })?;
        if overrides.max_fee_per_gas.is_none() {
            user_operation.max_fee_per_gas = apply_multiplier(
                fees.max_fee_per_gas,
                overrides.max_fee_per_gas_percentage_multiplier,
            );
        }
        if overrides.max_priority_fee_per_gas.is_none() {
            user_operation.max_priority_fee_per_gas = apply_multiplier(
                fees.max_priority_fee_per_gas,
                overrides.max_priority_fee_per_gas_percentage_multiplier,
            );
        }
    }

    if overrides.call_gas_limit.is_none()
        || overrides.verification_gas_limit.is_none()
        || overrides.pre_verification_gas.is_none()
    {
        let estimate = estimator
            .estimate_user_operation_gas(&user_operation, entrypoint)
            .await
            .map_err(|e| Error::EstimationFailed {
                stage: EstimationStage::UserOperationGas,
                reason: e.to_string(),
            })?;
        if overrides.call_gas_limit.is_none() {
            user_operation.call_gas_limit = apply_multiplier(
                estimate.call_gas_limit,
                overrides.call_gas_limit_percentage_multiplier,
            );
        }
        if overrides.verification_gas_limit.is_none() {
            user_operation.verification_gas_limit = apply_multiplier(
                estimate.verification_gas_limit,
                overrides.verification_gas_limit_percentage_multiplier,
            );
        }
        if overrides.pre_verification_gas.is_none() {
            user_operation.pre_verification_gas = apply_multiplier(
                estimate.pre_verification_gas,
                overrides.pre_verification_gas_percentage_multiplier,
            );
        }
    }

    tracing::debug!(
        %sender,
        %nonce,
        calls = transactions.len(),
        deploys = user_operation.deploys_account(),
        "Assembled user operation"
    );

    Ok(user_operation)
}
