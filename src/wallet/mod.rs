//! Owner key management and user operation signing
//!
//! Private keys never leave this module; callers only see addresses and signatures.

mod signer;

pub use signer::{sign_user_operation, OwnerWallet};

/// Environment variable the CLI reads the owner key from
pub const PRIVATE_KEY_ENV: &str = "PRIVATE_KEY";
