//! Safe smart accounts on ERC-4337 (Safe 4337 module v0.2.0, EntryPoint v0.6)

pub mod abi;
pub mod account;
pub mod assembler;
pub mod digest;
pub mod factory;
pub mod owner;
pub mod signature;
pub mod user_operation;
pub mod version;

pub use account::{AccountOverrides, DeploymentState, SafeAccount};
pub use assembler::{assemble, create_call_data, UserOperationOverrides};
pub use digest::{user_operation_eip712_hash, user_operation_eip712_hash_for_version, DigestOverrides};
pub use factory::{
    create_init_code, create_initializer_call_data, derive_address_and_deployment,
    derive_address_only, Deployment, ModuleConfiguration,
};
pub use owner::{PasskeyCoordinates, Signer};
pub use signature::{format_user_operation_signature, SignerSignaturePair};
pub use user_operation::{MetaTransaction, Operation, UserOperation};
pub use version::{SafeVersion, V0_2_0};
