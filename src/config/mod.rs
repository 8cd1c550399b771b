//! Configuration for the Safe account CLI

pub mod rpc;

use crate::safe::assembler::UserOperationOverrides;
use crate::safe::factory::ModuleConfiguration;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use rpc::RpcConfig;

/// Supported blockchain networks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Ethereum,
    Arbitrum,
    Optimism,
    Base,
    Polygon,
    Sepolia,
}

impl Network {
    pub const ALL: [Network; 6] = [
        Network::Ethereum,
        Network::Arbitrum,
        Network::Optimism,
        Network::Base,
        Network::Polygon,
        Network::Sepolia,
    ];

    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Ethereum => 1,
            Network::Arbitrum => 42161,
            Network::Optimism => 10,
            Network::Base => 8453,
            Network::Polygon => 137,
            Network::Sepolia => 11155111,
        }
    }

    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|n| n.chain_id() == chain_id)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Network::Ethereum => "ethereum",
            Network::Arbitrum => "arbitrum",
            Network::Optimism => "optimism",
            Network::Base => "base",
            Network::Polygon => "polygon",
            Network::Sepolia => "sepolia",
        }
    }

    /// Prefix of the `<CHAIN>_RPC_URL` / `<CHAIN>_BUNDLER_URL` env vars
    pub fn env_prefix(&self) -> &'static str {
        match self {
            Network::Ethereum => "ETH",
            Network::Arbitrum => "ARBITRUM",
            Network::Optimism => "OPTIMISM",
            Network::Base => "BASE",
            Network::Polygon => "POLYGON",
            Network::Sepolia => "SEPOLIA",
        }
    }

    fn alchemy_subdomain(&self) -> &'static str {
        match self {
            Network::Ethereum => "eth-mainnet",
            Network::Arbitrum => "arb-mainnet",
            Network::Optimism => "opt-mainnet",
            Network::Base => "base-mainnet",
            Network::Polygon => "polygon-mainnet",
            Network::Sepolia => "eth-sepolia",
        }
    }

    /// Public endpoint (rate limited, for testing only)
    fn public_rpc(&self) -> &'static str {
        match self {
            Network::Ethereum => "https://eth.llamarpc.com",
            Network::Arbitrum => "https://arb1.arbitrum.io/rpc",
            Network::Optimism => "https://mainnet.optimism.io",
            Network::Base => "https://mainnet.base.org",
            Network::Polygon => "https://polygon-rpc.com",
            Network::Sepolia => "https://rpc.sepolia.org",
        }
    }
}

/// Percentages added on top of fetched gas values, e.g. 20 means `value * 1.2`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasSettings {
    pub call_gas_limit_percentage_multiplier: Option<u64>,
    pub verification_gas_limit_percentage_multiplier: Option<u64>,
    pub pre_verification_gas_percentage_multiplier: Option<u64>,
    pub max_fee_per_gas_percentage_multiplier: Option<u64>,
    pub max_priority_fee_per_gas_percentage_multiplier: Option<u64>,
}

impl GasSettings {
    /// Fills in multipliers the overrides leave unset
    pub fn apply(&self, overrides: &mut UserOperationOverrides) {
        overrides.call_gas_limit_percentage_multiplier = overrides
            .call_gas_limit_percentage_multiplier
            .or(self.call_gas_limit_percentage_multiplier);
        overrides.verification_gas_limit_percentage_multiplier = overrides
            .verification_gas_limit_percentage_multiplier
            .or(self.verification_gas_limit_percentage_multiplier);
        overrides.pre_verification_gas_percentage_multiplier = overrides
            .pre_verification_gas_percentage_multiplier
            .or(self.pre_verification_gas_percentage_multiplier);
        overrides.max_fee_per_gas_percentage_multiplier = overrides
            .max_fee_per_gas_percentage_multiplier
            .or(self.max_fee_per_gas_percentage_multiplier);
        overrides.max_priority_fee_per_gas_percentage_multiplier = overrides
            .max_priority_fee_per_gas_percentage_multiplier
            .or(self.max_priority_fee_per_gas_percentage_multiplier);
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Chain the account lives on
    pub chain_id: u64,
    /// Account wiring used when deriving new accounts
    #[serde(default)]
    pub account: ModuleConfiguration,
    /// Gas estimate padding
    #[serde(default)]
    pub gas: GasSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chain_id: Network::Ethereum.chain_id(),
            account: ModuleConfiguration::default(),
            gas: GasSettings::default(),
        }
    }
}

impl Config {
    /// Load a JSON config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }
}
