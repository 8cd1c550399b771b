//! Pinned contract addresses per Safe 4337 module release
//!
//! Every address here feeds the counterfactual address and the SafeOp digest, so
//! changing any of them changes both. A release is plain data; the derivation code in
//! `factory` and `digest` takes the record as a parameter.

use alloy::hex;
use alloy::primitives::{address, Address};

/// ERC-4337 EntryPoint v0.6
pub const ENTRYPOINT_V6: Address = address!("5FF137D4b0FDCD49DcA30c7CF57E578a026d2789");

/// SafeProxy 1.4.1 creation bytecode (constructor takes the singleton address)
pub const SAFE_PROXY_CREATION_CODE: &[u8] = &hex!(
    "608060405234801561001057600080fd5b506040516101e63803806101e68339818101604052602081101561003357600080fd5b8101908080519060200190929190505050600073ffffffffffffffffffffffffffffffffffffffff168173ffffffffffffffffffffffffffffffffffffffff1614156100ca576040517f08c379a00000000000000000000000000000000000000000000000000000000081526004018080602001828103825260228152602001806101c46022913960400191505060405180910390fd5b806000806101000a81548173ffffffffffffffffffffffffffffffffffffffff021916908373ffffffffffffffffffffffffffffffffffffffff1602179055505060ab806101196000396000f3fe608060405273ffffffffffffffffffffffffffffffffffffffff600054167fa619486e0000000000000000000000000000000000000000000000000000000060003514156050578060005260206000f35b3660008037600080366000845af43d6000803e60008114156070573d6000fd5b3d6000f3fea264697066735822122003d1488ee65e08fa41e58e888a9865554c535f2c77126a82cb4c0f917f31441364736f6c63430007060033496e76616c69642073696e676c65746f6e20616464726573732070726f7669646564"
);

/// Contract set for one Safe 4337 module release
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafeVersion {
    /// Human-readable release tag
    pub name: &'static str,
    /// EntryPoint the module is bound to
    pub entrypoint: Address,
    /// Safe4337Module (also installed as fallback handler)
    pub safe_4337_module: Address,
    /// SafeModuleSetup, delegatecalled during `setup` to enable the module
    pub safe_module_setup: Address,
    /// SafeProxyFactory
    pub proxy_factory: Address,
    /// Safe L2 singleton the proxy points at
    pub singleton: Address,
    /// MultiSend (allows delegatecall), used during initialization
    pub multisend: Address,
    /// MultiSendCallOnly, used for batched user calls
    pub multisend_call_only: Address,
    /// SafeWebAuthnSharedSigner
    pub webauthn_shared_signer: Address,
    /// RIP-7212 P-256 precompile
    pub webauthn_precompile_verifier: Address,
    /// Fallback P-256 verifier contract
    pub webauthn_contract_verifier: Address,
    /// Proxy creation bytecode hashed into the CREATE2 address
    pub proxy_creation_code: &'static [u8],
}

/// Safe 4337 module v0.2.0 on EntryPoint v0.6
pub const V0_2_0: SafeVersion = SafeVersion {
    name: "0.2.0",
    entrypoint: ENTRYPOINT_V6,
    safe_4337_module: address!("a581c4A4DB7175302464fF3C06380BC3270b4037"),
    safe_module_setup: address!("8EcD4ec46D4D2a6B64fE960B3D64e8B94B2234eb"),
    proxy_factory: address!("4e1DCf7AD4e460CfD30791CCC4F9c8a4f820ec67"),
    singleton: address!("29fcB43b46531BcA003ddC8FCB67FFE91900C762"),
    multisend: address!("38869bf66a61cF6bDB996A6aE40D5853Fd43B526"),
    multisend_call_only: address!("9641d764fc13c8B624c04430C7356C1C7C8102e2"),
    webauthn_shared_signer: address!("fD90FAd33ee8b58f32c00aceEad1358e4AFC23f9"),
    webauthn_precompile_verifier: address!("0000000000000000000000000000000000000100"),
    webauthn_contract_verifier: address!("445a0683e494ea0c5AF3E83c5159fBE47Cf9e765"),
    proxy_creation_code: SAFE_PROXY_CREATION_CODE,
};

impl Default for SafeVersion {
    fn default() -> Self {
        V0_2_0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_creation_code_matches_constructor_layout() {
        // constructor copies its argument from offset 0x1e6, i.e. right after the code
        assert_eq!(SAFE_PROXY_CREATION_CODE.len(), 0x1e6);
        assert!(SAFE_PROXY_CREATION_CODE.ends_with(b"Invalid singleton address provided"));
    }

    #[test]
    fn default_version_is_v0_2_0() {
        let version = SafeVersion::default();
        assert_eq!(version.name, "0.2.0");
        assert_eq!(version.entrypoint, ENTRYPOINT_V6);
        assert_ne!(version.multisend, version.multisend_call_only);
    }
}
