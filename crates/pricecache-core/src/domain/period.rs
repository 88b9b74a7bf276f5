use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::{Date, Duration};

use crate::{DateRange, ValidationError};

/// Coarse lookback tokens accepted at the request boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1W")]
    OneWeek,
    #[serde(rename = "1M")]
    OneMonth,
    #[serde(rename = "3M")]
    ThreeMonths,
    #[serde(rename = "6M")]
    SixMonths,
    #[serde(rename = "1Y")]
    OneYear,
}

impl Period {
    pub const ALL: [Self; 5] = [
        Self::OneWeek,
        Self::OneMonth,
        Self::ThreeMonths,
        Self::SixMonths,
        Self::OneYear,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneWeek => "1W",
            Self::OneMonth => "1M",
            Self::ThreeMonths => "3M",
            Self::SixMonths => "6M",
            Self::OneYear => "1Y",
        }
    }

    pub const fn days(self) -> i64 {
        match self {
            Self::OneWeek => 7,
            Self::OneMonth => 30,
            Self::ThreeMonths => 90,
            Self::SixMonths => 180,
            Self::OneYear => 365,
        }
    }

    /// `[end - days, end]`; both ends included.
    pub fn range_ending(self, end: Date) -> Result<DateRange, ValidationError> {
        let start = end
            .checked_sub(Duration::days(self.days()))
            .ok_or(ValidationError::DateOutOfRange)?;
        DateRange::new(start, end)
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "1W" => Ok(Self::OneWeek),
            "1M" => Ok(Self::OneMonth),
            "3M" => Ok(Self::ThreeMonths),
            "6M" => Ok(Self::SixMonths),
            "1Y" => Ok(Self::OneYear),
            _ => Err(ValidationError::InvalidPeriod {
                value: value.to_owned(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn parses_period_tokens() {
        let parsed = Period::ALL
            .iter()
            .map(|period| Period::from_str(period.as_str()).expect("must parse"))
            .collect::<Vec<_>>();
        assert_eq!(parsed, Period::ALL.to_vec());
        assert_eq!(Period::from_str("1m").expect("lowercase"), Period::OneMonth);
    }

    #[test]
    fn rejects_unknown_period() {
        let err = Period::from_str("2W").expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidPeriod { .. }));
    }

    #[test]
    fn one_week_ends_on_given_day() {
        let range = Period::OneWeek
            .range_ending(date!(2024 - 03 - 08))
            .expect("range");
        assert_eq!(range.start(), date!(2024 - 03 - 01));
        assert_eq!(range.end(), date!(2024 - 03 - 08));
    }

    #[test]
    fn one_year_crosses_leap_day() {
        let range = Period::OneYear
            .range_ending(date!(2024 - 03 - 01))
            .expect("range");
        assert_eq!(range.start(), date!(2023 - 03 - 02));
    }
}
