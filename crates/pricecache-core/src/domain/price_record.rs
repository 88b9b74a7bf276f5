use serde::{Deserialize, Serialize};
use time::Date;

use super::date_range::iso_date;
use crate::ValidationError;

/// One daily OHLCV row for an instrument.
///
/// Serializes as `{date, open, high, low, close, adj_close, volume}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(rename = "adj_close")]
    pub adjusted_close: f64,
    pub volume: u64,
}

impl PriceRecord {
    pub fn new(
        date: Date,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        adjusted_close: f64,
        volume: u64,
    ) -> Result<Self, ValidationError> {
        let record = Self {
            date,
            open,
            high,
            low,
            close,
            adjusted_close,
            volume,
        };
        record.validate()?;
        Ok(record)
    }

    /// Checks that every price field is finite.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("adj_close", self.adjusted_close),
        ] {
            if !value.is_finite() {
                return Err(ValidationError::NonFiniteValue { field });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn rejects_non_finite_prices() {
        let err = PriceRecord::new(date!(2024 - 01 - 01), 1.0, f64::NAN, 0.5, 1.0, 1.0, 10)
            .expect_err("must fail");
        assert_eq!(err, ValidationError::NonFiniteValue { field: "high" });
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let record = PriceRecord::new(date!(2024 - 01 - 02), 83.1, 83.4, 82.9, 83.2, 83.2, 0)
            .expect("valid");
        let value = serde_json::to_value(record).expect("serialize");

        assert_eq!(value["date"], "2024-01-02");
        assert_eq!(value["adj_close"], 83.2);
        assert!(value.get("adjusted_close").is_none());
    }
}
