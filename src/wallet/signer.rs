//! Local owner key
//!
//! SECURITY: the only place private keys exist in this crate.
//! - Keys are held in alloy's PrivateKeySigner
//! - Raw key material read from the environment stays in a `SecretString` until parsed
//! - Keys are never serialized or logged

use crate::safe::digest::{user_operation_eip712_hash, DigestOverrides};
use crate::safe::signature::{format_user_operation_signature, SignerSignaturePair};
use crate::safe::user_operation::UserOperation;
use crate::{Error, Result};
use alloy::primitives::{Address, Bytes, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer as _;
use secrecy::{ExposeSecret, SecretString};

/// ECDSA owner of a Safe account
pub struct OwnerWallet {
    signer: PrivateKeySigner,
    address: Address,
}

impl OwnerWallet {
    /// Create a wallet from an environment variable holding a hex private key
    pub fn from_env(var_name: &str) -> Result<Self> {
        let key = std::env::var(var_name).map(SecretString::from).map_err(|_| {
            Error::Wallet(format!(
                "Environment variable {} not set. Required for signing.",
                var_name
            ))
        })?;

        Self::from_secret(&key)
    }

    pub fn from_secret(key: &SecretString) -> Result<Self> {
        Self::from_hex(key.expose_secret())
    }

    /// Create a wallet from a hex-encoded private key, with or without `0x`
    pub fn from_hex(key_hex: &str) -> Result<Self> {
        let key_hex = key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let signer: PrivateKeySigner = key_hex
            .parse()
            .map_err(|e| Error::Wallet(format!("Invalid private key: {}", e)))?;
        let address = signer.address();

        Ok(Self { signer, address })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Signs a 32-byte digest as is, without the EIP-191 prefix
    ///
    /// Returns `r ++ s ++ v` with `v` in {27, 28}, the form Safe's `ecrecover` path
    /// expects.
    pub async fn sign_hash(&self, hash: &B256) -> Result<[u8; 65]> {
        let signature = self
            .signer
            .sign_hash(hash)
            .await
            .map_err(|e| Error::Wallet(format!("Signing failed: {}", e)))?;
        Ok(signature.as_bytes())
    }
}

impl std::fmt::Debug for OwnerWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnerWallet")
            .field("address", &self.address)
            .field("signer", &"[REDACTED]")
            .finish()
    }
}

/// Signs `user_operation` with every wallet and packs the result into its
/// `signature` field format
pub async fn sign_user_operation(
    user_operation: &UserOperation,
    chain_id: u64,
    wallets: &[OwnerWallet],
    overrides: &DigestOverrides,
) -> Result<Bytes> {
    if wallets.is_empty() {
        return Err(Error::Wallet("At least one owner wallet is required".to_string()));
    }

    let digest = user_operation_eip712_hash(user_operation, chain_id, overrides)?;
    let mut pairs = Vec::with_capacity(wallets.len());
    for wallet in wallets {
        let signature = wallet.sign_hash(&digest).await?;
        pairs.push(SignerSignaturePair::ecdsa(wallet.address(), signature.to_vec()));
    }

    tracing::debug!(
        sender = %user_operation.sender,
        %digest,
        signers = pairs.len(),
        "Signed user operation"
    );

    let (valid_after, valid_until) = overrides.validity_window();
    format_user_operation_signature(&pairs, valid_after, valid_until)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, Signature, U256};

    // Well-known development keys (DO NOT use in production!)
    const KEY_0: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const KEY_1: &str = "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";

    #[test]
    fn wallet_from_hex() {
        let wallet = OwnerWallet::from_hex(KEY_0).unwrap();
        assert_eq!(
            wallet.address(),
            address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266")
        );

        let unprefixed = OwnerWallet::from_hex(KEY_1).unwrap();
        assert_eq!(
            unprefixed.address(),
            address!("70997970c51812dc3a010c7d01b50e0d17dc79c8")
        );
    }

    #[test]
    fn debug_redacts_key() {
        let wallet = OwnerWallet::from_hex(KEY_0).unwrap();
        let debug_str = format!("{:?}", wallet);
        assert!(!debug_str.contains("ac0974bec"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn invalid_key_is_rejected() {
        assert!(matches!(OwnerWallet::from_hex("0x1234"), Err(Error::Wallet(_))));
    }

    #[test]
    fn missing_env_var_is_reported() {
        let err = OwnerWallet::from_env("SAFE_ACCOUNT_TEST_UNSET_KEY").unwrap_err();
        assert!(err.to_string().contains("SAFE_ACCOUNT_TEST_UNSET_KEY"));
    }

    #[tokio::test]
    async fn signature_recovers_to_owner() {
        let wallet = OwnerWallet::from_hex(KEY_0).unwrap();
        let hash = B256::repeat_byte(0x42);
        let bytes = wallet.sign_hash(&hash).await.unwrap();

        assert!(bytes[64] == 27 || bytes[64] == 28);
        let signature = Signature::try_from(&bytes[..]).unwrap();
        assert_eq!(
            signature.recover_address_from_prehash(&hash).unwrap(),
            wallet.address()
        );
    }

    #[tokio::test]
    async fn user_operation_signature_is_sorted_and_prefixed() {
        let wallets = vec![
            OwnerWallet::from_hex(KEY_0).unwrap(),
            OwnerWallet::from_hex(KEY_1).unwrap(),
        ];
        let op = UserOperation {
            sender: Address::repeat_byte(0xaa),
            nonce: U256::from(1),
            ..Default::default()
        };
        let overrides = DigestOverrides {
            valid_until: Some(0x0102),
            ..Default::default()
        };
        let packed = sign_user_operation(&op, 1, &wallets, &overrides)
            .await
            .unwrap();
        assert_eq!(packed.len(), 12 + 130);
        assert_eq!(&packed[6..12], &[0, 0, 0, 0, 0x01, 0x02]);

        // 0x7099... sorts before 0xf39f...
        let digest = user_operation_eip712_hash(&op, 1, &overrides).unwrap();
        let first = Signature::try_from(&packed[12..77]).unwrap();
        assert_eq!(
            first.recover_address_from_prehash(&digest).unwrap(),
            wallets[1].address()
        );
    }

    #[tokio::test]
    async fn signing_requires_a_wallet() {
        let err = sign_user_operation(&UserOperation::default(), 1, &[], &DigestOverrides::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Wallet(_)));
    }
}
