//! Calendar-date helpers shared by the store, projections and serializer.
//!
//! # Responsibility
//! - Normalize mixed date representations to the canonical `YYYY-MM-DD` key.
//! - Enumerate school weekdays (Monday-Friday) inside a date range.
//! - Render short display labels for UI layers.
//!
//! # Invariants
//! - Comparison is on calendar date only; no time-of-day or offset is involved.
//! - Display labels never feed back into comparison or storage paths.

use chrono::{Datelike, NaiveDate, Weekday};

/// `chrono` format string for the canonical date key.
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

const DISPLAY_FORMAT: &str = "%a, %b %-d";

/// Value that can be normalized to a canonical `YYYY-MM-DD` key.
///
/// Implemented for `NaiveDate`, string forms and `Option` wrappers so callers
/// can compare stored keys against concrete dates without converting first.
pub trait DateKey {
    /// Returns the canonical key, or `None` when the value is absent or not a
    /// calendar date.
    fn date_key(&self) -> Option<String>;
}

impl DateKey for NaiveDate {
    fn date_key(&self) -> Option<String> {
        Some(to_date_key(*self))
    }
}

impl DateKey for str {
    fn date_key(&self) -> Option<String> {
        parse_date_key(self).map(to_date_key)
    }
}

impl DateKey for String {
    fn date_key(&self) -> Option<String> {
        self.as_str().date_key()
    }
}

impl<T: DateKey + ?Sized> DateKey for &T {
    fn date_key(&self) -> Option<String> {
        (**self).date_key()
    }
}

impl<T: DateKey> DateKey for Option<T> {
    fn date_key(&self) -> Option<String> {
        self.as_ref().and_then(DateKey::date_key)
    }
}

/// Formats a date as its canonical `YYYY-MM-DD` key.
pub fn to_date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

/// Parses a canonical key, tolerating a trailing ISO time component.
///
/// `"2024-01-02"` and `"2024-01-02T00:00:00.000Z"` both yield 2024-01-02.
pub fn parse_date_key(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    let day_part = trimmed.split('T').next().unwrap_or(trimmed);
    if day_part.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(day_part, DATE_KEY_FORMAT).ok()
}

/// Returns whether both operands name the same calendar day.
///
/// Returns `false` when either operand is absent or unparseable.
pub fn is_same_day<A, B>(a: &A, b: &B) -> bool
where
    A: DateKey + ?Sized,
    B: DateKey + ?Sized,
{
    match (a.date_key(), b.date_key()) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}

/// Returns whether `date` falls on Monday through Friday.
pub fn is_weekday(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Lists every weekday in `start..=end`, ascending.
///
/// Returns an empty list when `start > end`.
pub fn weekdays_in_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    if start > end {
        return Vec::new();
    }
    start
        .iter_days()
        .take_while(|day| *day <= end)
        .filter(|day| is_weekday(*day))
        .collect()
}

/// Renders a short label such as `Tue, Jan 2`.
pub fn format_display(date: NaiveDate) -> String {
    date.format(DISPLAY_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::{format_display, parse_date_key, to_date_key};
    use chrono::NaiveDate;

    #[test]
    fn parse_date_key_drops_time_component() {
        let parsed = parse_date_key("2024-01-02T13:45:00.000Z").unwrap();
        assert_eq!(parsed, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
    }

    #[test]
    fn parse_date_key_rejects_blank_and_garbage() {
        assert_eq!(parse_date_key("   "), None);
        assert_eq!(parse_date_key("not-a-date"), None);
        assert_eq!(parse_date_key("2024-02-30"), None);
    }

    #[test]
    fn to_date_key_zero_pads() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(to_date_key(date), "2024-03-07");
    }

    #[test]
    fn format_display_uses_short_names() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert_eq!(format_display(date), "Tue, Jan 2");
    }
}
