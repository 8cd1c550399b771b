//! Chain node access over JSON-RPC
//!
//! Reads only: the EntryPoint nonce of an account and the node's EIP-1559 fee
//! suggestion. Nothing here signs or submits transactions.

use super::{GasFees, NodeProvider, ProviderError};
use alloy::primitives::aliases::U192;
use alloy::primitives::{Address, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::sol;
use async_trait::async_trait;

sol! {
    #[sol(rpc)]
    interface IEntryPoint {
        function getNonce(address sender, uint192 key) external view returns (uint256 nonce);
    }
}

/// [`NodeProvider`] backed by an alloy HTTP provider
#[derive(Clone)]
pub struct NodeRpcClient {
    provider: DynProvider,
    chain_id: u64,
}

impl NodeRpcClient {
    /// Connect to `rpc_url`; no request is made until the first call
    pub fn new(rpc_url: &str, chain_id: u64) -> Result<Self, ProviderError> {
        let url: url::Url = rpc_url
            .parse()
            .map_err(|e| ProviderError::InvalidUrl(format!("{}: {}", rpc_url, e)))?;
        let provider = ProviderBuilder::new().connect_http(url).erased();
        Ok(Self { provider, chain_id })
    }

    /// Create a client from RPC config
    pub fn from_rpc_config(
        rpc_config: &crate::config::RpcConfig,
        chain_id: u64,
    ) -> Result<Self, ProviderError> {
        let rpc_url = rpc_config.node_url(chain_id).ok_or_else(|| {
            ProviderError::InvalidUrl(format!("No node RPC URL configured for chain {}", chain_id))
        })?;
        Self::new(rpc_url, chain_id)
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }
}

impl std::fmt::Debug for NodeRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRpcClient")
            .field("chain_id", &self.chain_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl NodeProvider for NodeRpcClient {
    async fn get_nonce(&self, sender: Address, entrypoint: Address) -> Result<U256, ProviderError> {
        let entrypoint_contract = IEntryPoint::new(entrypoint, &self.provider);
        let nonce = entrypoint_contract
            .getNonce(sender, U192::ZERO)
            .call()
            .await
            .map_err(|e| ProviderError::Rpc(format!("getNonce: {}", e)))?;

        tracing::debug!(%sender, %entrypoint, %nonce, "Fetched EntryPoint nonce");
        Ok(nonce)
    }

    async fn get_gas_fees(&self) -> Result<GasFees, ProviderError> {
        let estimation = self
            .provider
            .estimate_eip1559_fees()
            .await
            .map_err(|e| ProviderError::Rpc(format!("fee estimation: {}", e)))?;

        let fees = GasFees {
            max_fee_per_gas: U256::from(estimation.max_fee_per_gas),
            max_priority_fee_per_gas: U256::from(estimation.max_priority_fee_per_gas),
        };
        tracing::debug!(
            chain_id = self.chain_id,
            max_fee_per_gas = %fees.max_fee_per_gas,
            max_priority_fee_per_gas = %fees.max_priority_fee_per_gas,
            "Fetched gas fees"
        );
        Ok(fees)
    }
}
