//! External collaborators of user operation assembly
//!
//! The assembler only talks to these traits:
//! - [`NodeProvider`] reads the EntryPoint nonce and current fee levels from a chain node
//! - [`GasEstimator`] asks a bundler for the gas limits of a user operation
//!
//! [`NodeRpcClient`] and [`BundlerClient`] are the HTTP implementations; tests use
//! in-memory mocks.

pub mod bundler;
pub mod node;

pub use bundler::BundlerClient;
pub use node::NodeRpcClient;

use crate::safe::user_operation::UserOperation;
use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// EIP-1559 fee levels suggested by the node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasFees {
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
}

/// Gas limits returned by `eth_estimateUserOperationGas`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasEstimate {
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
}

/// Error type for collaborator failures
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Invalid RPC URL: {0}")]
    InvalidUrl(String),

    #[error("RPC request failed: {0}")]
    Rpc(String),

    #[error("Invalid RPC response: {0}")]
    InvalidResponse(String),
}

/// Chain node access needed to fill in a user operation
#[async_trait]
pub trait NodeProvider: Send + Sync {
    /// `EntryPoint.getNonce(sender, 0)`
    async fn get_nonce(&self, sender: Address, entrypoint: Address) -> Result<U256, ProviderError>;

    /// Current `maxFeePerGas` / `maxPriorityFeePerGas`
    async fn get_gas_fees(&self) -> Result<GasFees, ProviderError>;
}

/// Bundler-side gas estimation
#[async_trait]
pub trait GasEstimator: Send + Sync {
    async fn estimate_user_operation_gas(
        &self,
        user_operation: &UserOperation,
        entrypoint: Address,
    ) -> Result<GasEstimate, ProviderError>;
}
