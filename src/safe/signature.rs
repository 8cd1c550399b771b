//! User operation signature layout for the Safe 4337 module
//!
//! The module expects `uint48 validAfter ++ uint48 validUntil ++ signatures`, where
//! `signatures` is the classic Safe encoding: one 65-byte static part per owner, sorted
//! by owner address, followed by the dynamic payloads of contract signatures.

use crate::{Error, Result};
use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::SolValue;

/// Largest value a `uint48` validity bound can hold
pub const MAX_UINT48: u64 = (1 << 48) - 1;

/// One owner's signature over the SafeOp digest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignerSignaturePair {
    /// Owner address as listed in the Safe (the shared signer for passkeys)
    pub signer: Address,
    /// 65-byte `r ++ s ++ v` for ECDSA, arbitrary payload for contract signatures
    pub signature: Bytes,
    /// Verified through EIP-1271 instead of `ecrecover`
    pub is_contract_signature: bool,
}

impl SignerSignaturePair {
    pub fn ecdsa(signer: Address, signature: impl Into<Bytes>) -> Self {
        Self {
            signer,
            signature: signature.into(),
            is_contract_signature: false,
        }
    }

    pub fn contract(signer: Address, signature: impl Into<Bytes>) -> Self {
        Self {
            signer,
            signature: signature.into(),
            is_contract_signature: true,
        }
    }
}

/// Packs owner signatures into the user operation `signature` field
pub fn format_user_operation_signature(
    pairs: &[SignerSignaturePair],
    valid_after: u64,
    valid_until: u64,
) -> Result<Bytes> {
    let mut packed = validity_prefix(valid_after, valid_until)?;
    packed.extend_from_slice(&build_signature_bytes(pairs)?);
    Ok(Bytes::from(packed))
}

/// `uint48 validAfter ++ uint48 validUntil`
fn validity_prefix(valid_after: u64, valid_until: u64) -> Result<Vec<u8>> {
    for (name, value) in [("validAfter", valid_after), ("validUntil", valid_until)] {
        if value > MAX_UINT48 {
            return Err(Error::Encoding(format!(
                "{} {} does not fit in uint48",
                name, value
            )));
        }
    }
    let mut prefix = Vec::with_capacity(12);
    prefix.extend_from_slice(&valid_after.to_be_bytes()[2..]);
    prefix.extend_from_slice(&valid_until.to_be_bytes()[2..]);
    Ok(prefix)
}

/// Safe `checkSignatures` encoding of the given pairs
fn build_signature_bytes(pairs: &[SignerSignaturePair]) -> Result<Vec<u8>> {
    if pairs.is_empty() {
        return Err(Error::Encoding("At least one signature is required".to_string()));
    }

    let mut sorted: Vec<&SignerSignaturePair> = pairs.iter().collect();
    sorted.sort_by_key(|pair| pair.signer);
    if sorted.windows(2).any(|w| w[0].signer == w[1].signer) {
        return Err(Error::Encoding(
            "Each owner may only sign once".to_string(),
        ));
    }

    let mut static_part = Vec::with_capacity(65 * sorted.len());
    let mut dynamic_part = Vec::new();
    let static_len = 65 * sorted.len();

    for pair in sorted {
        if pair.is_contract_signature {
            let offset = static_len + dynamic_part.len();
            static_part.extend_from_slice(pair.signer.into_word().as_slice());
            static_part.extend_from_slice(&U256::from(offset).to_be_bytes::<32>());
            static_part.push(0);

            dynamic_part.extend_from_slice(&U256::from(pair.signature.len()).to_be_bytes::<32>());
            dynamic_part.extend_from_slice(&pair.signature);
        } else {
            if pair.signature.len() != 65 {
                return Err(Error::Encoding(format!(
                    "ECDSA signature for {} must be 65 bytes, got {}",
                    pair.signer,
                    pair.signature.len()
                )));
            }
            static_part.extend_from_slice(&pair.signature);
        }
    }

    static_part.extend_from_slice(&dynamic_part);
    Ok(static_part)
}

/// Well-formed ECDSA signature that recovers to no owner; sized like a real one
pub fn dummy_ecdsa_signature() -> [u8; 65] {
    let mut signature = [0u8; 65];
    signature[..15].fill(0xff);
    signature[15] = 0xf0;
    signature[32] = 0x7a;
    signature[33..64].fill(0xaa);
    signature[64] = 0x1c;
    signature
}

/// ABI-encoded WebAuthn assertion with realistic field sizes for gas estimation
pub fn dummy_webauthn_signature() -> Bytes {
    let authenticator_data = Bytes::from(vec![0xfe; 37]);
    let client_data_fields = String::from(
        r#""origin":"https://safe.global","padding":"This pads the clientDataJSON so that we can leave room for additional implementation specific fields for a more accurate 'preVerificationGas' estimate.""#,
    );
    (authenticator_data, client_data_fields, U256::MAX, U256::MAX)
        .abi_encode_params()
        .into()
}

/// Most signatures a dummy is built with
pub const MAX_DUMMY_SIGNERS: u64 = 256;

/// Placeholder signature used while estimating gas
///
/// `threshold` ECDSA dummies, one of them replaced by a shared-signer contract
/// signature when the account was initialized with a passkey.
pub fn dummy_signature(threshold: u64, passkey_signer: Option<Address>) -> Result<Bytes> {
    let threshold = threshold.max(1);
    let capacity = usize::try_from(threshold)
        .ok()
        .filter(|_| threshold <= MAX_DUMMY_SIGNERS)
        .ok_or_else(|| {
            Error::InvalidConfiguration(format!(
                "Threshold {} exceeds the {} signatures a dummy can hold",
                threshold, MAX_DUMMY_SIGNERS
            ))
        })?;
    let mut pairs = Vec::with_capacity(capacity);
    let mut ecdsa_count = threshold;

    if let Some(shared_signer) = passkey_signer {
        pairs.push(SignerSignaturePair::contract(
            shared_signer,
            dummy_webauthn_signature(),
        ));
        ecdsa_count -= 1;
    }
    for i in 0..ecdsa_count {
        // placeholder signers only fix the ordering; ECDSA parts carry no address
        let placeholder = Address::left_padding_from(&(i + 2).to_be_bytes());
        pairs.push(SignerSignaturePair::ecdsa(
            placeholder,
            dummy_ecdsa_signature().to_vec(),
        ));
    }

    format_user_operation_signature(&pairs, 0, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validity_window_prefixes_signatures() {
        let pair = SignerSignaturePair::ecdsa(Address::repeat_byte(0x01), vec![0x11; 65]);
        let packed = format_user_operation_signature(&[pair], 0x0102, 0x0a0b0c).unwrap();

        assert_eq!(packed.len(), 12 + 65);
        assert_eq!(&packed[..6], &[0, 0, 0, 0, 0x01, 0x02]);
        assert_eq!(&packed[6..12], &[0, 0, 0, 0x0a, 0x0b, 0x0c]);
        assert_eq!(&packed[12..], &[0x11; 65]);
    }

    #[test]
    fn signatures_are_sorted_by_signer() {
        let high = SignerSignaturePair::ecdsa(Address::repeat_byte(0xf0), vec![0xbb; 65]);
        let low = SignerSignaturePair::ecdsa(Address::repeat_byte(0x0f), vec![0xaa; 65]);
        let packed = format_user_operation_signature(&[high, low], 0, 0).unwrap();

        assert_eq!(&packed[12..77], &[0xaa; 65]);
        assert_eq!(&packed[77..142], &[0xbb; 65]);
    }

    #[test]
    fn contract_signature_points_at_dynamic_part() {
        let signer = Address::repeat_byte(0x20);
        let eoa = SignerSignaturePair::ecdsa(Address::repeat_byte(0x10), vec![0xaa; 65]);
        let contract = SignerSignaturePair::contract(signer, vec![0xcc; 3]);
        let packed = format_user_operation_signature(&[contract, eoa], 0, 0).unwrap();
        let signatures = &packed[12..];

        // second static slot belongs to the contract signer
        let slot = &signatures[65..130];
        assert_eq!(&slot[12..32], signer.as_slice());
        assert_eq!(U256::from_be_slice(&slot[32..64]), U256::from(130));
        assert_eq!(slot[64], 0);

        assert_eq!(U256::from_be_slice(&signatures[130..162]), U256::from(3));
        assert_eq!(&signatures[162..], &[0xcc; 3]);
    }

    #[test]
    fn malformed_signatures_are_rejected() {
        let short = SignerSignaturePair::ecdsa(Address::repeat_byte(0x01), vec![0x11; 64]);
        assert!(matches!(
            format_user_operation_signature(&[short], 0, 0),
            Err(Error::Encoding(_))
        ));

        let a = SignerSignaturePair::ecdsa(Address::repeat_byte(0x01), vec![0x11; 65]);
        assert!(matches!(
            format_user_operation_signature(&[a.clone(), a], 0, 0),
            Err(Error::Encoding(_))
        ));

        assert!(matches!(
            format_user_operation_signature(&[], 0, 0),
            Err(Error::Encoding(_))
        ));
    }

    #[test]
    fn validity_bounds_must_fit_uint48() {
        let pair = SignerSignaturePair::ecdsa(Address::repeat_byte(0x01), vec![0x11; 65]);
        let err = format_user_operation_signature(&[pair], 0, MAX_UINT48 + 1).unwrap_err();
        assert!(err.to_string().contains("validUntil"));
    }

    #[test]
    fn dummy_signature_sizes() {
        let single = dummy_signature(1, None).unwrap();
        assert_eq!(single.len(), 12 + 65);
        assert_eq!(single[12 + 64], 0x1c);

        let double = dummy_signature(2, None).unwrap();
        assert_eq!(double.len(), 12 + 130);

        let shared_signer = Address::repeat_byte(0xfd);
        let passkey = dummy_signature(1, Some(shared_signer)).unwrap();
        let webauthn = dummy_webauthn_signature();
        assert_eq!(passkey.len(), 12 + 65 + 32 + webauthn.len());
        assert_eq!(&passkey[12 + 12..12 + 32], shared_signer.as_slice());
    }

    #[test]
    fn oversized_threshold_is_an_error() {
        let err = dummy_signature(u64::MAX, None).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));

        assert!(dummy_signature(MAX_DUMMY_SIGNERS + 1, None).is_err());
        let largest = dummy_signature(MAX_DUMMY_SIGNERS, None).unwrap();
        assert_eq!(largest.len() as u64, 12 + 65 * MAX_DUMMY_SIGNERS);
    }
}
