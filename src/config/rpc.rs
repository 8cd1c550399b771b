//! Node and bundler endpoint configuration
//!
//! Node endpoints, in priority order:
//! 1. Per-chain env vars (ETH_RPC_URL, BASE_RPC_URL, etc.)
//! 2. ALCHEMY_API_KEY - builds URLs for every chain Alchemy serves
//! 3. Public RPC fallbacks - rate limited, for testing only
//!
//! Bundler endpoints come from per-chain `<CHAIN>_BUNDLER_URL` vars only; there is no
//! public fallback.
//!
//! # Examples
//!
//! ```bash
//! export BASE_RPC_URL="https://base-mainnet.g.alchemy.com/v2/YOUR_KEY"
//! export BASE_BUNDLER_URL="https://api.pimlico.io/v1/base/rpc?apikey=YOUR_KEY"
//! ```

use super::Network;
use std::collections::HashMap;

/// Environment variable names
mod env_vars {
    pub const ALCHEMY_API_KEY: &str = "ALCHEMY_API_KEY";
    pub const RPC_URL_SUFFIX: &str = "_RPC_URL";
    pub const BUNDLER_URL_SUFFIX: &str = "_BUNDLER_URL";
}

/// RPC endpoints indexed by chain ID
#[derive(Debug, Clone, Default)]
pub struct RpcConfig {
    nodes: HashMap<u64, String>,
    bundlers: HashMap<u64, String>,
}

impl RpcConfig {
    /// Create RPC config from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same resolution as [`RpcConfig::from_env`] over an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut nodes = HashMap::new();
        let mut bundlers = HashMap::new();

        for network in Network::ALL {
            let prefix = network.env_prefix();
            let node_var = format!("{}{}", prefix, env_vars::RPC_URL_SUFFIX);
            if let Some(url) = lookup(&node_var) {
                tracing::debug!(network = network.name(), "Using {} for node RPC", node_var);
                nodes.insert(network.chain_id(), url);
            }
            let bundler_var = format!("{}{}", prefix, env_vars::BUNDLER_URL_SUFFIX);
            if let Some(url) = lookup(&bundler_var) {
                tracing::debug!(network = network.name(), "Using {} for bundler", bundler_var);
                bundlers.insert(network.chain_id(), url);
            }
        }

        if nodes.is_empty() {
            if let Some(key) = lookup(env_vars::ALCHEMY_API_KEY) {
                tracing::info!("Building node RPC URLs from ALCHEMY_API_KEY");
                for network in Network::ALL {
                    nodes.insert(
                        network.chain_id(),
                        format!("https://{}.g.alchemy.com/v2/{}", network.alchemy_subdomain(), key),
                    );
                }
            }
        }

        for network in Network::ALL {
            nodes.entry(network.chain_id()).or_insert_with(|| {
                tracing::warn!(
                    network = network.name(),
                    "No RPC configured, using public RPC (rate limited)"
                );
                network.public_rpc().to_string()
            });
        }

        Self { nodes, bundlers }
    }

    /// Create with explicit node and bundler URLs
    pub fn with_urls(nodes: HashMap<u64, String>, bundlers: HashMap<u64, String>) -> Self {
        Self { nodes, bundlers }
    }

    /// Get node RPC URL for a chain
    pub fn node_url(&self, chain_id: u64) -> Option<&str> {
        self.nodes.get(&chain_id).map(|s| s.as_str())
    }

    /// Get bundler URL for a chain
    pub fn bundler_url(&self, chain_id: u64) -> Option<&str> {
        self.bundlers.get(&chain_id).map(|s| s.as_str())
    }

    /// Chains with a node endpoint
    pub fn chains(&self) -> impl Iterator<Item = &u64> {
        self.nodes.keys()
    }

    pub fn has_bundler(&self, chain_id: u64) -> bool {
        self.bundlers.contains_key(&chain_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn per_chain_urls_take_priority() {
        let config = RpcConfig::from_lookup(lookup(&[
            ("BASE_RPC_URL", "https://base.custom"),
            ("BASE_BUNDLER_URL", "https://bundler.custom"),
            ("ALCHEMY_API_KEY", "key"),
        ]));

        assert_eq!(config.node_url(8453), Some("https://base.custom"));
        assert_eq!(config.bundler_url(8453), Some("https://bundler.custom"));
        // per-chain vars disable the Alchemy fallback
        assert_eq!(config.node_url(1), Some(Network::Ethereum.public_rpc()));
    }

    #[test]
    fn alchemy_key_builds_node_urls() {
        let config = RpcConfig::from_lookup(lookup(&[("ALCHEMY_API_KEY", "key")]));
        assert_eq!(
            config.node_url(1),
            Some("https://eth-mainnet.g.alchemy.com/v2/key")
        );
        assert_eq!(
            config.node_url(11155111),
            Some("https://eth-sepolia.g.alchemy.com/v2/key")
        );
    }

    #[test]
    fn public_fallbacks_without_bundlers() {
        let config = RpcConfig::from_lookup(lookup(&[]));
        for network in Network::ALL {
            assert_eq!(config.node_url(network.chain_id()), Some(network.public_rpc()));
            assert!(!config.has_bundler(network.chain_id()));
        }
        assert_eq!(config.chains().count(), Network::ALL.len());
    }

    #[test]
    fn explicit_urls() {
        let mut nodes = HashMap::new();
        nodes.insert(1, "https://custom.rpc".to_string());
        let config = RpcConfig::with_urls(nodes, HashMap::new());

        assert_eq!(config.node_url(1), Some("https://custom.rpc"));
        assert_eq!(config.node_url(999), None);
        assert_eq!(config.bundler_url(1), None);
    }
}
