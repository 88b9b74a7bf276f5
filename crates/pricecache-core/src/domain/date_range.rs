use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::Date;

use crate::ValidationError;

const ISO_DATE: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(input: &str) -> Result<Date, ValidationError> {
    Date::parse(input.trim(), ISO_DATE).map_err(|_| ValidationError::InvalidDate {
        value: input.to_owned(),
    })
}

/// Format a calendar date as `YYYY-MM-DD`.
pub fn format_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Serde adapter storing [`Date`] as `YYYY-MM-DD`.
pub mod iso_date {
    use serde::de::Error as DeError;
    use serde::{Deserialize, Deserializer, Serializer};
    use time::Date;

    pub fn serialize<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_date(*date))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Date, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        super::parse_date(&value).map_err(D::Error::custom)
    }
}

/// Inclusive calendar date interval with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange", into = "RawDateRange")]
pub struct DateRange {
    start: Date,
    end: Date,
}

impl DateRange {
    pub fn new(start: Date, end: Date) -> Result<Self, ValidationError> {
        if start > end {
            return Err(ValidationError::InvalidRange {
                start: format_date(start),
                end: format_date(end),
            });
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<Self, ValidationError> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    pub fn single_day(date: Date) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub const fn start(self) -> Date {
        self.start
    }

    pub const fn end(self) -> Date {
        self.end
    }

    pub fn contains(self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }

    /// `true` when every day of `other` lies inside `self`.
    pub fn encloses(self, other: DateRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn overlaps(self, other: DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Number of calendar days, counting both ends.
    pub fn day_count(self) -> u32 {
        let days = (self.end - self.start).whole_days() + 1;
        u32::try_from(days).unwrap_or(u32::MAX)
    }

    pub fn days(self) -> impl Iterator<Item = Date> {
        let end = self.end;
        std::iter::successors(Some(self.start), move |day| {
            day.next_day().filter(|next| *next <= end)
        })
    }
}

impl Display for DateRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", format_date(self.start), format_date(self.end))
    }
}

#[derive(Serialize, Deserialize)]
struct RawDateRange {
    #[serde(with = "iso_date")]
    start: Date,
    #[serde(with = "iso_date")]
    end: Date,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = ValidationError;

    fn try_from(value: RawDateRange) -> Result<Self, Self::Error> {
        Self::new(value.start, value.end)
    }
}

impl From<DateRange> for RawDateRange {
    fn from(value: DateRange) -> Self {
        Self {
            start: value.start,
            end: value.end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::date;

    #[test]
    fn rejects_start_after_end() {
        let err = DateRange::parse("2024-02-01", "2024-01-01").expect_err("must fail");
        assert_eq!(
            err,
            ValidationError::InvalidRange {
                start: String::from("2024-02-01"),
                end: String::from("2024-01-01"),
            }
        );
    }

    #[test]
    fn accepts_single_day_range() {
        let range = DateRange::parse("2024-01-05", "2024-01-05").expect("valid");
        assert_eq!(range.day_count(), 1);
        assert_eq!(range, DateRange::single_day(date!(2024 - 01 - 05)));
    }

    #[test]
    fn rejects_malformed_date() {
        let err = parse_date("2024/01/05").expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidDate { .. }));
    }

    #[test]
    fn iterates_days_across_month_boundary() {
        let range = DateRange::parse("2024-01-30", "2024-02-02").expect("valid");
        let days = range.days().map(format_date).collect::<Vec<_>>();
        assert_eq!(
            days,
            vec!["2024-01-30", "2024-01-31", "2024-02-01", "2024-02-02"]
        );
        assert_eq!(range.day_count(), 4);
    }

    #[test]
    fn enclosure_and_overlap() {
        let outer = DateRange::parse("2024-01-01", "2024-01-31").expect("valid");
        let inner = DateRange::parse("2024-01-10", "2024-01-15").expect("valid");
        let later = DateRange::parse("2024-02-01", "2024-02-03").expect("valid");

        assert!(outer.encloses(inner));
        assert!(!inner.encloses(outer));
        assert!(outer.overlaps(inner));
        assert!(!outer.overlaps(later));
    }

    #[test]
    fn serde_rejects_reversed_range() {
        let parsed =
            serde_json::from_str::<DateRange>(r#"{"start":"2024-03-01","end":"2024-02-01"}"#);
        assert!(parsed.is_err());
    }
}
