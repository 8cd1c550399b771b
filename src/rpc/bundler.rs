//! ERC-4337 bundler JSON-RPC client

use super::{GasEstimate, GasEstimator, ProviderError};
use crate::safe::user_operation::UserOperation;
use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// JSON-RPC error object
#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcError>,
}

/// Bundler endpoint speaking the `eth_*UserOperation*` methods
#[derive(Debug, Clone)]
pub struct BundlerClient {
    client: Client,
    url: url::Url,
    next_id: Arc<AtomicU64>,
}

impl BundlerClient {
    pub fn new(bundler_url: &str) -> Result<Self, ProviderError> {
        let url = bundler_url
            .parse()
            .map_err(|e| ProviderError::InvalidUrl(format!("{}: {}", bundler_url, e)))?;
        Ok(Self {
            client: Client::new(),
            url,
            next_id: Arc::new(AtomicU64::new(1)),
        })
    }

    /// Create a client from RPC config
    pub fn from_rpc_config(
        rpc_config: &crate::config::RpcConfig,
        chain_id: u64,
    ) -> Result<Self, ProviderError> {
        let url = rpc_config.bundler_url(chain_id).ok_or_else(|| {
            ProviderError::InvalidUrl(format!("No bundler URL configured for chain {}", chain_id))
        })?;
        Self::new(url)
    }

    /// Submits a signed user operation; returns its EntryPoint hash
    pub async fn send_user_operation(
        &self,
        user_operation: &UserOperation,
        entrypoint: Address,
    ) -> Result<B256, ProviderError> {
        let hash: B256 = self
            .request("eth_sendUserOperation", json!([user_operation, entrypoint]))
            .await?;
        tracing::info!(sender = %user_operation.sender, %hash, "User operation submitted");
        Ok(hash)
    }

    /// EntryPoints the bundler accepts operations for
    pub async fn supported_entry_points(&self) -> Result<Vec<Address>, ProviderError> {
        self.request("eth_supportedEntryPoints", json!([])).await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, ProviderError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(method, id, "Bundler request");

        let response = self
            .client
            .post(self.url.clone())
            .json(&json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": method,
                "params": params,
            }))
            .send()
            .await
            .map_err(|e| ProviderError::Rpc(format!("{}: {}", method, e)))?;

        let body: RpcResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("{}: {}", method, e)))?;

        parse_result(method, body)
    }
}

fn parse_result<T: DeserializeOwned>(method: &str, body: RpcResponse) -> Result<T, ProviderError> {
    if let Some(error) = body.error {
        return Err(ProviderError::Rpc(format!(
            "{} returned error {}: {}",
            method, error.code, error.message
        )));
    }
    let result = body
        .result
        .ok_or_else(|| ProviderError::InvalidResponse(format!("{}: missing result", method)))?;
    serde_json::from_value(result)
        .map_err(|e| ProviderError::InvalidResponse(format!("{}: {}", method, e)))
}

#[async_trait]
impl GasEstimator for BundlerClient {
    async fn estimate_user_operation_gas(
        &self,
        user_operation: &UserOperation,
        entrypoint: Address,
    ) -> Result<GasEstimate, ProviderError> {
        let estimate: GasEstimate = self
            .request(
                "eth_estimateUserOperationGas",
                json!([user_operation, entrypoint]),
            )
            .await?;
        tracing::debug!(
            sender = %user_operation.sender,
            call_gas_limit = %estimate.call_gas_limit,
            verification_gas_limit = %estimate.verification_gas_limit,
            pre_verification_gas = %estimate.pre_verification_gas,
            "Estimated user operation gas"
        );
        Ok(estimate)
    }
}
