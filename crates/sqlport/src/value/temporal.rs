//! Date and time text grammars.
//!
//! Some drivers hand back year-only precision for YEAR columns typed as DATE
//! or TIMESTAMP, so parsing falls back from the full grammar to a date and
//! then to a bare four-digit year.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";
pub(crate) const TIME_FORMAT: &str = "%H:%M:%S";
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const TIMESTAMP_T_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

pub(crate) const EXPECTED_DATE: &str = "date as yyyy-MM-dd or year as yyyy";
pub(crate) const EXPECTED_TIME: &str = "time as HH:mm:ss";
pub(crate) const EXPECTED_TIMESTAMP: &str =
    "timestamp as yyyy-MM-dd HH:mm:ss[.fffffffff], date as yyyy-MM-dd or year as yyyy";

pub(crate) fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub(crate) fn format_year(year: i32) -> String {
    format!("{:04}", year)
}

pub(crate) fn format_time(time: &NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

pub(crate) fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Four ASCII digits, mapped to January 1st of that year.
pub(crate) fn parse_year(s: &str) -> Option<NaiveDate> {
    if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<i32>()
        .ok()
        .and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1))
}

pub(crate) fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).ok()
}

/// Date, then year.
pub(crate) fn parse_date_or_year(s: &str) -> Option<NaiveDate> {
    parse_date(s).or_else(|| parse_year(s))
}

pub(crate) fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, TIME_FORMAT).ok()
}

/// Timestamp, then date, then year; the first grammar that parses wins.
pub(crate) fn parse_timestamp_lenient(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, TIMESTAMP_T_FORMAT))
        .ok()
        .or_else(|| parse_date(s).and_then(|d| d.and_hms_opt(0, 0, 0)))
        .or_else(|| parse_year(s).and_then(|d| d.and_hms_opt(0, 0, 0)))
}

pub(crate) fn is_year_type(type_name: &str) -> bool {
    type_name.trim().eq_ignore_ascii_case("year")
}
