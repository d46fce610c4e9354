use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length of a region code in bytes.
pub const MAX_REGION_CODE_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegionCodeError {
    #[error("region code must not be empty")]
    Empty,
    #[error("region code exceeds {max} bytes: {actual}")]
    TooLong { max: usize, actual: usize },
    #[error("region code contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// Administrative or geographic grouping used for eligibility and quotas.
///
/// Codes are 1 to 16 ASCII alphanumerics, `-` or `_`, and compare
/// case-sensitively (`"KE"` and `"ke"` are different regions).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RegionCode(String);

impl RegionCode {
    pub fn new(code: impl Into<String>) -> Result<Self, RegionCodeError> {
        let code = code.into();
        validate_region_code(&code)?;
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate_region_code(code: &str) -> Result<(), RegionCodeError> {
    if code.is_empty() {
        return Err(RegionCodeError::Empty);
    }
    if code.len() > MAX_REGION_CODE_LEN {
        return Err(RegionCodeError::TooLong {
            max: MAX_REGION_CODE_LEN,
            actual: code.len(),
        });
    }
    if let Some(c) = code
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(RegionCodeError::InvalidCharacter(c));
    }
    Ok(())
}

impl fmt::Display for RegionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for RegionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RegionCode({})", self.0)
    }
}

impl FromStr for RegionCode {
    type Err = RegionCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RegionCode::new(s)
    }
}

impl From<RegionCode> for String {
    fn from(value: RegionCode) -> Self {
        value.0
    }
}

impl TryFrom<String> for RegionCode {
    type Error = RegionCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        RegionCode::new(value)
    }
}
