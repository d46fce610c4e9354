use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors that can occur when parsing a Stipend account string.
#[derive(Debug, thiserror::Error)]
pub enum AccountIdError {
    #[error("account id must start with 's'")]
    InvalidPrefix,
    #[error("account id must be {expected} characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("account id payload is not valid hexadecimal")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("account id payload must be exactly 32 bytes")]
    InvalidPayloadLength,
}

/// Number of raw bytes contained in an account identifier.
pub const ACCOUNT_ID_BYTES: usize = 32;
/// Expected string length of an encoded account id (prefix + 64 hex chars).
pub const ACCOUNT_ID_STRING_LENGTH: usize = 1 + ACCOUNT_ID_BYTES * 2;

/// Identity of a principal: a beneficiary, the admin, or a payer.
///
/// Encoded for humans as `s` followed by 64 lowercase hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(pub [u8; ACCOUNT_ID_BYTES]);

impl AccountId {
    /// The all-zero account. Never a valid recipient of admin rights.
    pub const ZERO: AccountId = AccountId([0u8; ACCOUNT_ID_BYTES]);

    pub fn new(bytes: [u8; ACCOUNT_ID_BYTES]) -> Self {
        Self(bytes)
    }

    /// Deterministically derive an account id from a human label.
    ///
    /// Used by scenario files and tests to name beneficiaries (`"alice"`)
    /// without spelling out 32 bytes.
    pub fn derive(label: &str) -> Self {
        Self(*blake3::hash(label.as_bytes()).as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; ACCOUNT_ID_BYTES] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; ACCOUNT_ID_BYTES]
    }

    /// Short form used in log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

/// Encode a 32-byte identifier into the human readable Stipend format.
pub fn encode_account_id(bytes: &[u8; ACCOUNT_ID_BYTES]) -> String {
    let mut encoded = String::with_capacity(ACCOUNT_ID_STRING_LENGTH);
    encoded.push('s');
    encoded.push_str(&hex::encode(bytes));
    encoded
}

/// Decode a human readable account string into raw bytes.
pub fn decode_account_id(value: &str) -> Result<[u8; ACCOUNT_ID_BYTES], AccountIdError> {
    if !value.starts_with('s') {
        return Err(AccountIdError::InvalidPrefix);
    }

    if value.len() != ACCOUNT_ID_STRING_LENGTH {
        return Err(AccountIdError::InvalidLength {
            expected: ACCOUNT_ID_STRING_LENGTH,
            actual: value.len(),
        });
    }

    let decoded = hex::decode(&value[1..])?;
    decoded
        .try_into()
        .map_err(|_| AccountIdError::InvalidPayloadLength)
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&encode_account_id(&self.0))
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.short())
    }
}

impl FromStr for AccountId {
    type Err = AccountIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_account_id(s).map(AccountId)
    }
}

impl From<[u8; ACCOUNT_ID_BYTES]> for AccountId {
    fn from(value: [u8; ACCOUNT_ID_BYTES]) -> Self {
        AccountId(value)
    }
}

impl From<AccountId> for String {
    fn from(value: AccountId) -> Self {
        encode_account_id(&value.0)
    }
}

impl TryFrom<String> for AccountId {
    type Error = AccountIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_parses_back() {
        let id = AccountId::derive("alice");
        let encoded = id.to_string();
        assert!(encoded.starts_with('s'));
        assert_eq!(encoded.len(), ACCOUNT_ID_STRING_LENGTH);
        assert_eq!(encoded.parse::<AccountId>().unwrap(), id);
    }

    #[test]
    fn derive_is_deterministic_and_distinct() {
        assert_eq!(AccountId::derive("bob"), AccountId::derive("bob"));
        assert_ne!(AccountId::derive("bob"), AccountId::derive("carol"));
        assert!(!AccountId::derive("bob").is_zero());
        assert!(AccountId::ZERO.is_zero());
    }

    #[test]
    fn invalid_prefix_rejected() {
        let bad = "x".to_string() + &"00".repeat(ACCOUNT_ID_BYTES);
        let err = bad.parse::<AccountId>().unwrap_err();
        assert!(matches!(err, AccountIdError::InvalidPrefix));
    }

    #[test]
    fn invalid_length_rejected() {
        let bad = "s".to_string() + &"00".repeat(ACCOUNT_ID_BYTES - 1);
        let err = bad.parse::<AccountId>().unwrap_err();
        assert!(matches!(err, AccountIdError::InvalidLength { .. }));
    }

    #[test]
    fn invalid_hex_rejected() {
        let bad = format!("s{}", "gg".repeat(ACCOUNT_ID_BYTES));
        let err = bad.parse::<AccountId>().unwrap_err();
        assert!(matches!(err, AccountIdError::InvalidHex(_)));
    }

    #[test]
    fn serde_uses_string_form() {
        let id = AccountId::derive("dave");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id));
        let back: AccountId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
