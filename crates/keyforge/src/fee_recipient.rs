use crate::{Error, Result};
use core::fmt;
use core::str::FromStr;

/// Required prefix of a fee recipient address.
pub const ADDRESS_PREFIX: &str = "0x";

/// Number of hex digits following [`ADDRESS_PREFIX`] (20 bytes).
pub const ADDRESS_HEX_LEN: usize = 40;

/// An execution-layer address that receives validator fees.
///
/// Always `0x` followed by exactly 40 hexadecimal digits. Mixed case is
/// accepted and preserved as given; no checksum is verified.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct FeeRecipient(String);

impl FeeRecipient {
    /// Validates `address` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] on a missing prefix, wrong length, or
    /// any non-hex digit.
    pub fn parse(address: &str) -> Result<Self> {
        if Self::is_valid(address) {
            Ok(Self(address.to_owned()))
        } else {
            Err(Error::invalid_input("invalid Ethereum address format"))
        }
    }

    /// Returns `true` if `address` has the shape `0x` + 40 hex digits.
    pub fn is_valid(address: &str) -> bool {
        address.strip_prefix(ADDRESS_PREFIX).is_some_and(|digits| {
            digits.len() == ADDRESS_HEX_LEN && digits.bytes().all(|b| b.is_ascii_hexdigit())
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FeeRecipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for FeeRecipient {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FeeRecipient {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        if Self::is_valid(&value) {
            Ok(Self(value))
        } else {
            Err(Error::invalid_input("invalid Ethereum address format"))
        }
    }
}

impl From<FeeRecipient> for String {
    fn from(value: FeeRecipient) -> Self {
        value.0
    }
}

impl AsRef<str> for FeeRecipient {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = "0x1234567890abcdef1234567890abcdef12345678";

    #[test]
    fn accepts_well_formed_addresses() {
        assert!(FeeRecipient::is_valid(VALID));
        assert!(FeeRecipient::is_valid(
            "0xAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA"
        ));
        assert!(FeeRecipient::is_valid(
            "0xDeaDbeefdEAdbeefdEadbEEFdeadbeEFdEaDbeeF"
        ));
        assert_eq!(FeeRecipient::parse(VALID).unwrap().as_str(), VALID);
    }

    #[test]
    fn rejects_missing_prefix() {
        assert!(!FeeRecipient::is_valid(
            "1234567890abcdef1234567890abcdef12345678"
        ));
        assert!(!FeeRecipient::is_valid(
            "0X1234567890abcdef1234567890abcdef12345678"
        ));
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(!FeeRecipient::is_valid("0x"));
        assert!(!FeeRecipient::is_valid(
            "0x1234567890abcdef1234567890abcdef1234567"
        ));
        assert!(!FeeRecipient::is_valid(
            "0x1234567890abcdef1234567890abcdef123456789"
        ));
    }

    #[test]
    fn rejects_non_hex_digits() {
        assert!(!FeeRecipient::is_valid(
            "0x1234567890abcdef1234567890abcdef1234567g"
        ));
        assert!(!FeeRecipient::is_valid("invalid-address"));
        assert!(!FeeRecipient::is_valid(
            "0x 234567890abcdef1234567890abcdef12345678"
        ));
    }

    #[test]
    fn parse_error_is_invalid_input() {
        let err = FeeRecipient::parse("invalid-address").unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
        assert!(err.to_string().contains("invalid Ethereum address format"));
    }
}
