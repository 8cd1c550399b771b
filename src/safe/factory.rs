//! Counterfactual Safe address and deployment payload derivation
//!
//! Everything in this module is a pure function of the owner set, the module
//! configuration and the [`SafeVersion`] record: no network access, no randomness.
//!
//! The account address is the CREATE2 address of a `SafeProxy` deployed by the proxy
//! factory, where the salt commits to the `setup` initializer:
//!
//! ```text
//! salt    = keccak256(keccak256(initializer) ++ uint256(saltNonce))
//! address = create2(factory, salt, keccak256(proxyCreationCode ++ uint256(singleton)))
//! ```

use crate::safe::abi::{
    configureCall, createProxyWithNonceCall, enableModulesCall, encode_multisend, setupCall,
    SharedSignerConfiguration,
};
use crate::safe::owner::{single_passkey, PasskeyCoordinates, Signer};
use crate::safe::user_operation::MetaTransaction;
use crate::safe::version::SafeVersion;
use crate::{Error, Result};
use alloy::primitives::aliases::U176;
use alloy::primitives::{address, keccak256, Address, Bytes, B256, U256};
use alloy::sol_types::SolCall;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Sentinel used by the Safe owner linked list; never a valid owner
const SENTINEL_OWNER: Address = address!("0000000000000000000000000000000000000001");

/// Overrides for the account's initial wiring
///
/// Every field falls back to the value pinned by the [`SafeVersion`]. Overriding any
/// address changes the derived account address.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModuleConfiguration {
    /// Signatures required to execute; defaults to 1
    pub threshold: Option<u64>,
    /// CREATE2 salt nonce; defaults to 0
    pub c2_nonce: Option<U256>,
    pub safe_4337_module_address: Option<Address>,
    pub safe_module_setup_address: Option<Address>,
    pub entrypoint_address: Option<Address>,
    pub safe_account_factory_address: Option<Address>,
    pub safe_account_singleton: Option<Address>,
    pub multisend_contract_address: Option<Address>,
    pub webauthn_shared_signer: Option<Address>,
    pub eip7212_webauthn_precompile_verifier: Option<Address>,
    pub eip7212_webauthn_contract_verifier: Option<Address>,
}

/// Result of a full derivation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    /// Counterfactual account address
    pub address: Address,
    /// Proxy factory the init code calls
    pub factory_address: Address,
    /// `createProxyWithNonce(singleton, initializer, saltNonce)` call data
    pub factory_data: Bytes,
}

impl Deployment {
    /// EntryPoint v0.6 init code: `factory_address ++ factory_data`
    pub fn init_code(&self) -> Bytes {
        concat_init_code(self.factory_address, &self.factory_data)
    }
}

/// `factory ++ factory_data`, the packed form the EntryPoint expects
pub fn concat_init_code(factory_address: Address, factory_data: &[u8]) -> Bytes {
    let mut init_code = Vec::with_capacity(20 + factory_data.len());
    init_code.extend_from_slice(factory_address.as_slice());
    init_code.extend_from_slice(factory_data);
    Bytes::from(init_code)
}

/// Validated inputs shared by the address and deployment derivations
struct Initializer {
    call_data: Bytes,
    factory: Address,
    singleton: Address,
    salt_nonce: U256,
}

/// Derives the account address and the factory call that deploys it
pub fn derive_address_and_deployment(
    owners: &[Signer],
    config: &ModuleConfiguration,
    version: &SafeVersion,
) -> Result<Deployment> {
    let initializer = build_initializer(owners, config, version)?;
    let address = counterfactual_address(&initializer, version);

    let factory_data = createProxyWithNonceCall {
        singleton: initializer.singleton,
        initializer: initializer.call_data,
        saltNonce: initializer.salt_nonce,
    }
    .abi_encode();

    tracing::debug!(
        %address,
        factory = %initializer.factory,
        owners = owners.len(),
        "Derived Safe deployment"
    );

    Ok(Deployment {
        address,
        factory_address: initializer.factory,
        factory_data: factory_data.into(),
    })
}

/// Same address as [`derive_address_and_deployment`], without encoding the factory call
pub fn derive_address_only(
    owners: &[Signer],
    config: &ModuleConfiguration,
    version: &SafeVersion,
) -> Result<Address> {
    let initializer = build_initializer(owners, config, version)?;
    Ok(counterfactual_address(&initializer, version))
}

/// EntryPoint init code for a new account: `factory ++ createProxyWithNonce(...)`
pub fn create_init_code(
    owners: &[Signer],
    config: &ModuleConfiguration,
    version: &SafeVersion,
) -> Result<Bytes> {
    Ok(derive_address_and_deployment(owners, config, version)?.init_code())
}

/// `Safe.setup` call data configuring owners, threshold and the 4337 module
pub fn create_initializer_call_data(
    owners: &[Signer],
    config: &ModuleConfiguration,
    version: &SafeVersion,
) -> Result<Bytes> {
    Ok(build_initializer(owners, config, version)?.call_data)
}

fn build_initializer(
    owners: &[Signer],
    config: &ModuleConfiguration,
    version: &SafeVersion,
) -> Result<Initializer> {
    if owners.is_empty() {
        return Err(Error::InvalidConfiguration(
            "At least one owner is required".to_string(),
        ));
    }
    let passkey = single_passkey(owners)?;

    let threshold = config.threshold.unwrap_or(1);
    if threshold == 0 || threshold > owners.len() as u64 {
        return Err(Error::InvalidConfiguration(format!(
            "Threshold {} must be between 1 and the number of owners ({})",
            threshold,
            owners.len()
        )));
    }

    let safe_4337_module = config
        .safe_4337_module_address
        .unwrap_or(version.safe_4337_module);
    let module_setup = config
        .safe_module_setup_address
        .unwrap_or(version.safe_module_setup);
    let shared_signer = config
        .webauthn_shared_signer
        .unwrap_or(version.webauthn_shared_signer);

    let owner_addresses = owner_addresses(owners, shared_signer)?;

    let enable_modules: Bytes = enableModulesCall {
        modules: vec![safe_4337_module],
    }
    .abi_encode()
    .into();

    let (setup_to, setup_data) = match passkey {
        None => (module_setup, enable_modules),
        Some(coordinates) => {
            if shared_signer.is_zero() {
                return Err(Error::InvalidConfiguration(
                    "WebAuthn shared signer cannot be the zero address".to_string(),
                ));
            }
            let verifiers = webauthn_verifiers(config, version)?;
            let configure = configure_shared_signer(&coordinates, verifiers);
            let multisend = config
                .multisend_contract_address
                .unwrap_or(version.multisend);
            let setup_batch = [
                MetaTransaction::delegate_call(module_setup, enable_modules),
                MetaTransaction::delegate_call(shared_signer, configure),
            ];
            (multisend, encode_multisend(&setup_batch))
        }
    };

    let call_data = setupCall {
        owners: owner_addresses,
        threshold: U256::from(threshold),
        to: setup_to,
        data: setup_data,
        fallbackHandler: safe_4337_module,
        paymentToken: Address::ZERO,
        payment: U256::ZERO,
        paymentReceiver: Address::ZERO,
    }
    .abi_encode();

    Ok(Initializer {
        call_data: call_data.into(),
        factory: config
            .safe_account_factory_address
            .unwrap_or(version.proxy_factory),
        singleton: config
            .safe_account_singleton
            .unwrap_or(version.singleton),
        salt_nonce: config.c2_nonce.unwrap_or(U256::ZERO),
    })
}

/// Owner list as stored by the Safe; rejects entries `setup` would revert on
fn owner_addresses(owners: &[Signer], shared_signer: Address) -> Result<Vec<Address>> {
    let mut seen = HashSet::with_capacity(owners.len());
    let mut addresses = Vec::with_capacity(owners.len());
    for owner in owners {
        let address = owner.owner_address(shared_signer);
        if address.is_zero() || address == SENTINEL_OWNER {
            return Err(Error::InvalidConfiguration(format!(
                "Invalid owner address {}",
                address
            )));
        }
        if !seen.insert(address) {
            return Err(Error::InvalidConfiguration(format!(
                "Duplicate owner {}",
                address
            )));
        }
        addresses.push(address);
    }
    Ok(addresses)
}

/// `uint176 verifiers = uint16(precompile) << 160 | contractVerifier`
fn webauthn_verifiers(config: &ModuleConfiguration, version: &SafeVersion) -> Result<U176> {
    let precompile = config
        .eip7212_webauthn_precompile_verifier
        .unwrap_or(version.webauthn_precompile_verifier);
    let contract_verifier = config
        .eip7212_webauthn_contract_verifier
        .unwrap_or(version.webauthn_contract_verifier);

    let precompile_word = U256::from_be_slice(precompile.as_slice());
    if precompile_word > U256::from(u16::MAX) {
        return Err(Error::InvalidConfiguration(format!(
            "WebAuthn precompile verifier {} does not fit in 16 bits",
            precompile
        )));
    }

    let packed =
        (precompile_word << 160usize) | U256::from_be_slice(contract_verifier.as_slice());
    U176::checked_from_uint(packed).ok_or_else(|| {
        Error::InvalidConfiguration("WebAuthn verifiers do not fit in uint176".to_string())
    })
}

fn configure_shared_signer(coordinates: &PasskeyCoordinates, verifiers: U176) -> Bytes {
    configureCall {
        signer: SharedSignerConfiguration {
            x: coordinates.x,
            y: coordinates.y,
            verifiers,
        },
    }
    .abi_encode()
    .into()
}

fn counterfactual_address(initializer: &Initializer, version: &SafeVersion) -> Address {
    let mut salt_preimage = [0u8; 64];
    salt_preimage[..32].copy_from_slice(keccak256(&initializer.call_data).as_slice());
    salt_preimage[32..].copy_from_slice(&initializer.salt_nonce.to_be_bytes::<32>());
    let salt: B256 = keccak256(salt_preimage);

    let mut deployment_code = Vec::with_capacity(version.proxy_creation_code.len() + 32);
    deployment_code.extend_from_slice(version.proxy_creation_code);
    deployment_code.extend_from_slice(initializer.singleton.into_word().as_slice());

    initializer
        .factory
        .create2_from_code(salt, deployment_code)
}
