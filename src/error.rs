//! Error types for Safe account derivation and user operation assembly

use std::fmt;
use thiserror::Error;

/// The collaborator call that failed while assembling a user operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EstimationStage {
    /// EntryPoint nonce lookup on the node
    Nonce,
    /// Fee-per-gas lookup on the node
    GasFees,
    /// `eth_estimateUserOperationGas` on the bundler
    UserOperationGas,
}

impl EstimationStage {
    pub fn name(&self) -> &'static str {
        match self {
            EstimationStage::Nonce => "nonce",
            EstimationStage::GasFees => "gas_fees",
            EstimationStage::UserOperationGas => "user_operation_gas",
        }
    }
}

impl fmt::Display for EstimationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Estimation failed at stage '{stage}': {reason}")]
    EstimationFailed {
        stage: EstimationStage,
        reason: String,
    },

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Bundler error: {0}")]
    Bundler(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Stage name for `EstimationFailed`, `None` for every other variant
    pub fn stage(&self) -> Option<EstimationStage> {
        match self {
            Error::EstimationFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
