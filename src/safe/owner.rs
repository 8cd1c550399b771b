//! Account owners: plain addresses or WebAuthn passkeys

use crate::{Error, Result};
use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Public key of a P-256 passkey
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PasskeyCoordinates {
    pub x: U256,
    pub y: U256,
}

/// An initial owner of a Safe account
///
/// Passkey owners are not Safe owners themselves: the shared WebAuthn signer
/// contract takes their place in the owner list and stores the coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Signer {
    Address(Address),
    Passkey(PasskeyCoordinates),
}

impl Signer {
    pub fn passkey(x: U256, y: U256) -> Self {
        Signer::Passkey(PasskeyCoordinates { x, y })
    }

    pub fn as_passkey(&self) -> Option<&PasskeyCoordinates> {
        match self {
            Signer::Passkey(coordinates) => Some(coordinates),
            Signer::Address(_) => None,
        }
    }

    /// The address placed in the Safe owner list for this signer
    pub fn owner_address(&self, webauthn_shared_signer: Address) -> Address {
        match self {
            Signer::Address(address) => *address,
            Signer::Passkey(_) => webauthn_shared_signer,
        }
    }
}

impl From<Address> for Signer {
    fn from(address: Address) -> Self {
        Signer::Address(address)
    }
}

impl From<PasskeyCoordinates> for Signer {
    fn from(coordinates: PasskeyCoordinates) -> Self {
        Signer::Passkey(coordinates)
    }
}

impl fmt::Display for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signer::Address(address) => write!(f, "{address}"),
            Signer::Passkey(PasskeyCoordinates { x, y }) => write!(f, "passkey({x:#x}, {y:#x})"),
        }
    }
}

impl FromStr for PasskeyCoordinates {
    type Err = Error;

    /// Parses `x,y` where each coordinate is decimal or 0x-prefixed hex
    fn from_str(s: &str) -> Result<Self> {
        let (x, y) = s.split_once(',').ok_or_else(|| {
            Error::Encoding(format!("Passkey must be given as 'x,y', got '{}'", s))
        })?;
        let parse = |value: &str| {
            U256::from_str(value.trim())
                .map_err(|e| Error::Encoding(format!("Invalid passkey coordinate '{}': {}", value, e)))
        };
        Ok(Self {
            x: parse(x)?,
            y: parse(y)?,
        })
    }
}

/// Returns the coordinates of the only passkey in `owners`, if any.
///
/// Fails when the set holds more than one passkey: the shared signer can hold a
/// single key per account.
pub fn single_passkey(owners: &[Signer]) -> Result<Option<PasskeyCoordinates>> {
    let mut found: Option<PasskeyCoordinates> = None;
    for owner in owners {
        if let Some(coordinates) = owner.as_passkey() {
            if found.is_some() {
                return Err(Error::InvalidConfiguration(
                    "Only one WebAuthn signer is allowed during initialization".to_string(),
                ));
            }
            found = Some(*coordinates);
        }
    }
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn single_passkey_returns_coordinates() {
        let owners = vec![
            Signer::from(address!("00000000000000000000000000000000000000aa")),
            Signer::passkey(U256::from(1), U256::from(2)),
        ];
        let passkey = single_passkey(&owners).unwrap().unwrap();
        assert_eq!(passkey.x, U256::from(1));
        assert_eq!(passkey.y, U256::from(2));
    }

    #[test]
    fn second_passkey_is_rejected() {
        let owners = vec![
            Signer::passkey(U256::from(1), U256::from(2)),
            Signer::passkey(U256::from(3), U256::from(4)),
        ];
        let err = single_passkey(&owners).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));
    }

    #[test]
    fn address_owners_have_no_passkey() {
        let owners = vec![Signer::from(Address::repeat_byte(0xaa))];
        assert!(single_passkey(&owners).unwrap().is_none());
    }

    #[test]
    fn passkey_is_replaced_by_shared_signer() {
        let shared = Address::repeat_byte(0x11);
        let owner = Signer::passkey(U256::from(7), U256::from(8));
        assert_eq!(owner.owner_address(shared), shared);
    }

    #[test]
    fn signer_deserializes_untagged() {
        let owners: Vec<Signer> = serde_json::from_value(serde_json::json!([
            "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
            { "x": "0x1", "y": "0x2" }
        ]))
        .unwrap();
        assert_eq!(owners[0], Signer::Address(Address::repeat_byte(0xaa)));
        assert_eq!(owners[1], Signer::passkey(U256::from(1), U256::from(2)));
    }

    #[test]
    fn passkey_parses_from_pair() {
        let passkey: PasskeyCoordinates = "0x10, 32".parse().unwrap();
        assert_eq!(passkey.x, U256::from(16));
        assert_eq!(passkey.y, U256::from(32));

        assert!("0x10".parse::<PasskeyCoordinates>().is_err());
    }
}
