//! Safe Account Kit
//!
//! Counterfactual Safe smart accounts on ERC-4337 (EntryPoint v0.6, Safe 4337 module
//! v0.2.0):
//! - Derive an account's address and init code from its owners, before deployment
//! - Assemble user operations from a list of calls, with nonce and gas filled in
//! - Compute the SafeOp EIP-712 digest owners sign, and pack their signatures
//!
//! Derivation and hashing are pure. Only assembly talks to the outside world, through
//! the [`rpc::NodeProvider`] and [`rpc::GasEstimator`] traits.

pub mod config;
pub mod rpc;
pub mod safe;
pub mod wallet;

mod error;

// Re-export commonly used types
pub use config::{Config, RpcConfig};
pub use error::{Error, EstimationStage, Result};
pub use safe::{
    MetaTransaction, ModuleConfiguration, SafeAccount, Signer, UserOperation,
    UserOperationOverrides,
};
