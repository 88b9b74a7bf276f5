use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MAX_INSTRUMENT_LEN: usize = 32;

/// Storage partition key for one time series.
///
/// Restricted to ASCII letters and digits and normalized to uppercase, so it is
/// safe to use as a namespace identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InstrumentKey(String);

impl InstrumentKey {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyInstrument);
        }

        let len = trimmed.chars().count();
        if len > MAX_INSTRUMENT_LEN {
            return Err(ValidationError::InstrumentTooLong {
                len,
                max: MAX_INSTRUMENT_LEN,
            });
        }

        if let Some((index, ch)) = trimmed
            .chars()
            .enumerate()
            .find(|(_, ch)| !ch.is_ascii_alphanumeric())
        {
            return Err(ValidationError::InstrumentInvalidChar { ch, index });
        }

        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Key for a currency pair, e.g. `USD` + `INR` -> `USDINR`.
    pub fn currency_pair(from: &str, to: &str) -> Result<Self, ValidationError> {
        let from = validate_currency_code(from)?;
        let to = validate_currency_code(to)?;
        Self::parse(&format!("{from}{to}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Normalizes a 3-letter currency code to uppercase.
pub fn validate_currency_code(value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.len() != 3 || !trimmed.chars().all(|ch| ch.is_ascii_alphabetic()) {
        return Err(ValidationError::InvalidCurrency {
            value: value.to_owned(),
        });
    }
    Ok(trimmed.to_ascii_uppercase())
}

impl Display for InstrumentKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for InstrumentKey {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for InstrumentKey {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<InstrumentKey> for String {
    fn from(value: InstrumentKey) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalizes_key() {
        let key = InstrumentKey::parse(" usdinr ").expect("key should parse");
        assert_eq!(key.as_str(), "USDINR");
    }

    #[test]
    fn rejects_sql_shaped_input() {
        let err = InstrumentKey::parse("USD'; DROP TABLE x").expect_err("must fail");
        assert_eq!(err, ValidationError::InstrumentInvalidChar { ch: '\'', index: 3 });
    }

    #[test]
    fn rejects_overlong_key() {
        let err = InstrumentKey::parse(&"A".repeat(33)).expect_err("must fail");
        assert!(matches!(err, ValidationError::InstrumentTooLong { len: 33, .. }));
    }

    #[test]
    fn builds_currency_pair() {
        let key = InstrumentKey::currency_pair("usd", "inr").expect("pair");
        assert_eq!(key.as_str(), "USDINR");
    }

    #[test]
    fn rejects_bad_currency_code() {
        let err = InstrumentKey::currency_pair("US", "INR").expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidCurrency { .. }));
    }
}
