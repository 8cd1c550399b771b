//! Handle to one Safe account, deployed or counterfactual

use crate::rpc::{GasEstimator, NodeProvider};
use crate::safe::assembler::{self, UserOperationOverrides};
use crate::safe::factory::{self, concat_init_code, ModuleConfiguration};
use crate::safe::owner::{single_passkey, PasskeyCoordinates, Signer};
use crate::safe::user_operation::{MetaTransaction, UserOperation};
use crate::safe::version::SafeVersion;
use crate::Result;
use alloy::primitives::{Address, Bytes};
use serde::{Deserialize, Serialize};

/// Whether the account contract still has to be deployed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentState {
    Deployed,
    /// Not on chain yet; the first user operation carries the factory call
    Pending {
        factory_address: Address,
        factory_data: Bytes,
    },
}

impl DeploymentState {
    /// `factory_address ++ factory_data` while pending, empty once deployed
    pub fn init_code(&self) -> Bytes {
        match self {
            DeploymentState::Deployed => Bytes::new(),
            DeploymentState::Pending {
                factory_address,
                factory_data,
            } => concat_init_code(*factory_address, factory_data),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, DeploymentState::Pending { .. })
    }
}

/// Optional settings for an account that is already deployed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountOverrides {
    pub safe_4337_module_address: Option<Address>,
    pub entrypoint_address: Option<Address>,
    /// Owner signatures required; sizes the gas-estimation dummy signature
    pub threshold: Option<u64>,
}

/// A Safe account bound to one address
///
/// Immutable after construction: observing the deployment on chain yields a new value
/// through [`SafeAccount::into_deployed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafeAccount {
    address: Address,
    safe_4337_module: Address,
    entrypoint: Address,
    deployment: DeploymentState,
    passkey: Option<PasskeyCoordinates>,
    webauthn_shared_signer: Address,
    threshold: u64,
    version: SafeVersion,
}

impl SafeAccount {
    /// Handle for an account already deployed at `address`
    pub fn new(address: Address, overrides: AccountOverrides) -> Self {
        Self::new_for_version(address, overrides, SafeVersion::default())
    }

    pub fn new_for_version(
        address: Address,
        overrides: AccountOverrides,
        version: SafeVersion,
    ) -> Self {
        Self {
            address,
            safe_4337_module: overrides
                .safe_4337_module_address
                .unwrap_or(version.safe_4337_module),
            entrypoint: overrides.entrypoint_address.unwrap_or(version.entrypoint),
            deployment: DeploymentState::Deployed,
            passkey: None,
            webauthn_shared_signer: version.webauthn_shared_signer,
            threshold: overrides.threshold.unwrap_or(1),
            version,
        }
    }

    /// Handle for a new account owned by `owners`; deployed by its first user operation
    pub fn initialize_new_account(
        owners: &[Signer],
        config: &ModuleConfiguration,
    ) -> Result<Self> {
        Self::initialize_new_account_for_version(owners, config, SafeVersion::default())
    }

    pub fn initialize_new_account_for_version(
        owners: &[Signer],
        config: &ModuleConfiguration,
        version: SafeVersion,
    ) -> Result<Self> {
        let passkey = single_passkey(owners)?;
        let deployment = factory::derive_address_and_deployment(owners, config, &version)?;

        tracing::debug!(
            address = %deployment.address,
            passkey = passkey.is_some(),
            "Initialized new Safe account"
        );

        Ok(Self {
            address: deployment.address,
            safe_4337_module: config
                .safe_4337_module_address
                .unwrap_or(version.safe_4337_module),
            entrypoint: config.entrypoint_address.unwrap_or(version.entrypoint),
            deployment: DeploymentState::Pending {
                factory_address: deployment.factory_address,
                factory_data: deployment.factory_data,
            },
            passkey,
            webauthn_shared_signer: config
                .webauthn_shared_signer
                .unwrap_or(version.webauthn_shared_signer),
            threshold: config.threshold.unwrap_or(1),
            version,
        })
    }

    /// Counterfactual address of the account `owners` would get
    pub fn create_account_address(
        owners: &[Signer],
        config: &ModuleConfiguration,
    ) -> Result<Address> {
        factory::derive_address_only(owners, config, &SafeVersion::default())
    }

    /// Init code deploying the account `owners` would get
    pub fn create_init_code(owners: &[Signer], config: &ModuleConfiguration) -> Result<Bytes> {
        factory::create_init_code(owners, config, &SafeVersion::default())
    }

    /// Same account, recorded as deployed
    pub fn into_deployed(self) -> Self {
        Self {
            deployment: DeploymentState::Deployed,
            ..self
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn safe_4337_module(&self) -> Address {
        self.safe_4337_module
    }

    pub fn entrypoint(&self) -> Address {
        self.entrypoint
    }

    pub fn deployment(&self) -> &DeploymentState {
        &self.deployment
    }

    pub fn passkey(&self) -> Option<&PasskeyCoordinates> {
        self.passkey.as_ref()
    }

    /// Owner-list address standing in for the passkey, if the account has one
    pub fn passkey_signer(&self) -> Option<Address> {
        self.passkey.map(|_| self.webauthn_shared_signer)
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    pub fn version(&self) -> &SafeVersion {
        &self.version
    }

    /// Assembles a user operation executing `transactions` from this account
    pub async fn create_user_operation<N, G>(
        &self,
        transactions: &[MetaTransaction],
        node: &N,
        estimator: &G,
        overrides: &UserOperationOverrides,
    ) -> Result<UserOperation>
    where
        N: NodeProvider + ?Sized,
        G: GasEstimator + ?Sized,
    {
        assembler::assemble(self, transactions, node, estimator, overrides).await
    }
}
