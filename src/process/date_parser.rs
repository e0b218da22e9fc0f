use chrono::{Datelike, NaiveDate};

/// Parse a `YYYY-MM-DD` date as written in the portal's `jaar_maand` field.
pub fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Integer key `YYYYMMDD` shared by every table joining on a date.
pub fn date_id(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 10_000 + i64::from(date.month()) * 100 + i64::from(date.day())
}

/// Calendar quarter, 1..=4.
pub fn quarter(date: NaiveDate) -> u32 {
    date.month0() / 3 + 1
}
