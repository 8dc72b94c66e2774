//! Player identity (wallet address)

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Address validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("address must start with 0x: {0}")]
    MissingPrefix(String),

    #[error("address must have 40 hex digits: {0}")]
    BadLength(String),

    #[error("address contains non-hex characters: {0}")]
    NotHex(String),
}

/// A `0x`-prefixed, 20-byte hex account address
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Parse and validate an address. Case is preserved as given.
    pub fn parse(s: &str) -> Result<Self, IdentityError> {
        let s = s.trim();
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| IdentityError::MissingPrefix(s.to_string()))?;

        if digits.len() != 40 {
            return Err(IdentityError::BadLength(s.to_string()));
        }
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(IdentityError::NotHex(s.to_string()));
        }

        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Address {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Address::parse(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let addr = Address::parse("0xD45005C45b8b6cBF642CB480A87e2C9e412B724E").unwrap();
        assert_eq!(addr.as_str(), "0xD45005C45b8b6cBF642CB480A87e2C9e412B724E");
    }

    #[test]
    fn test_parse_invalid() {
        assert!(matches!(
            Address::parse("D45005C45b8b6cBF642CB480A87e2C9e412B724E"),
            Err(IdentityError::MissingPrefix(_))
        ));
        assert!(matches!(Address::parse("0x1234"), Err(IdentityError::BadLength(_))));
        assert!(matches!(
            Address::parse("0xZZ5005C45b8b6cBF642CB480A87e2C9e412B724E"),
            Err(IdentityError::NotHex(_))
        ));
    }

    #[test]
    fn test_serde_validates() {
        let ok: Result<Address, _> =
            serde_json::from_str(r#""0x0F0BDEbF0F83cD1EE3974779Bcb7315f9808c714""#);
        assert!(ok.is_ok());

        let bad: Result<Address, _> = serde_json::from_str(r#""not-an-address""#);
        assert!(bad.is_err());
    }
}
