//! ERC-4337 v0.6 user operation and the calls it carries

use crate::Error;
use alloy::primitives::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};

/// How the Safe executes a call; 0 and 1 on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Operation {
    #[default]
    Call,
    DelegateCall,
}

impl Operation {
    pub fn as_u8(self) -> u8 {
        match self {
            Operation::Call => 0,
            Operation::DelegateCall => 1,
        }
    }
}

impl From<Operation> for u8 {
    fn from(operation: Operation) -> Self {
        operation.as_u8()
    }
}

impl TryFrom<u8> for Operation {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Operation::Call),
            1 => Ok(Operation::DelegateCall),
            other => Err(Error::Encoding(format!("Unknown operation {}", other))),
        }
    }
}

/// One call the account should make; batches execute in list order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaTransaction {
    pub to: Address,
    #[serde(default)]
    pub value: U256,
    #[serde(default)]
    pub data: Bytes,
    #[serde(default)]
    pub operation: Operation,
}

impl MetaTransaction {
    pub fn call(to: Address, value: U256, data: Bytes) -> Self {
        Self {
            to,
            value,
            data,
            operation: Operation::Call,
        }
    }

    pub fn delegate_call(to: Address, data: Bytes) -> Self {
        Self {
            to,
            value: U256::ZERO,
            data,
            operation: Operation::DelegateCall,
        }
    }
}

/// User operation as accepted by EntryPoint v0.6
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    pub sender: Address,
    pub nonce: U256,
    pub init_code: Bytes,
    pub call_data: Bytes,
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    pub paymaster_and_data: Bytes,
    pub signature: Bytes,
}

impl UserOperation {
    /// Whether this operation deploys its sender
    pub fn deploys_account(&self) -> bool {
        !self.init_code.is_empty()
    }

    /// Upper bound of the wei the sender may be charged
    pub fn max_cost(&self) -> U256 {
        let gas = self
            .call_gas_limit
            .saturating_add(self.verification_gas_limit)
            .saturating_add(self.pre_verification_gas);
        gas.saturating_mul(self.max_fee_per_gas)
    }
}
