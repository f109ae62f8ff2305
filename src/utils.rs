// Utility functions
use chrono::NaiveDate;

/// Fixed-width storage form of a date: `YYYYMMDD`. Sorting these strings
/// lexicographically is the same as sorting the dates chronologically.
pub const COMPACT_DATE_FORMAT: &str = "%Y%m%d";

/// Form used in chart series: `YYYY-MM-DD`.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a `YYYYMMDD` string into a `NaiveDate`, if possible.
pub fn parse_compact_date(date_str: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(date_str.trim(), COMPACT_DATE_FORMAT).ok()
}

pub fn format_compact_date(date: NaiveDate) -> String {
    date.format(COMPACT_DATE_FORMAT).to_string()
}

/// Rounds to two decimals, ties to even (the way the published figures have
/// always been rounded).
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Arithmetic mean, `None` for an empty input.
pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        None
    } else {
        Some(sum / count as f64)
    }
}

/// Serde adapter for `YYYYMMDD` dates.
pub mod compact_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_compact_date(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_compact_date(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid date '{}', expected YYYYMMDD", raw)))
    }
}

/// Serde adapter for `YYYY-MM-DD` dates (serialize only).
pub mod iso_date {
    use chrono::NaiveDate;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(date: &NaiveDate, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&date.format(super::ISO_DATE_FORMAT).to_string())
    }
}
