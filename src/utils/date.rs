// src/utils/date.rs

//! Date parsing for link texts and API timestamps.

use chrono::{Datelike, Month, NaiveDate, NaiveDateTime};

/// Timestamp layout used by the events API.
pub const API_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// How the month is spelled in a layout.
///
/// chrono accepts either spelling for both `%B` and `%b`, so the spelling is
/// checked separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MonthToken {
    Numeric,
    Full,
    Abbreviated,
}

/// A date layout tried against link text.
///
/// Every layout ends with a four-digit `%Y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateFormat {
    pattern: &'static str,
    /// Layout carries no day; the first of the month is assumed.
    month_only: bool,
    month: MonthToken,
}

impl DateFormat {
    /// Layout with a full month name, e.g. `%B %d, %Y`.
    pub const fn full(pattern: &'static str) -> Self {
        Self {
            pattern,
            month_only: false,
            month: MonthToken::Full,
        }
    }

    /// Layout with a three-letter month name, e.g. `%b %d, %Y`.
    pub const fn abbreviated(pattern: &'static str) -> Self {
        Self {
            pattern,
            month_only: false,
            month: MonthToken::Abbreviated,
        }
    }

    pub const fn numeric(pattern: &'static str) -> Self {
        Self {
            pattern,
            month_only: false,
            month: MonthToken::Numeric,
        }
    }

    /// Full month name and year. `pattern` must start with `%d ` and the
    /// input is prefixed with `1 `.
    pub const fn month_only(pattern: &'static str) -> Self {
        Self {
            pattern,
            month_only: true,
            month: MonthToken::Full,
        }
    }

    pub fn pattern(&self) -> &'static str {
        self.pattern
    }

    /// Parse `text` with this layout.
    pub fn parse(&self, text: &str) -> Option<NaiveDate> {
        if !has_four_digit_year(text) {
            return None;
        }
        let parsed = if self.month_only {
            NaiveDate::parse_from_str(&format!("1 {text}"), self.pattern)
        } else {
            NaiveDate::parse_from_str(text, self.pattern)
        };
        parsed.ok().filter(|date| self.month_spelled_right(text, *date))
    }

    fn month_spelled_right(&self, text: &str, date: NaiveDate) -> bool {
        let Some(month) = u8::try_from(date.month())
            .ok()
            .and_then(|m| Month::try_from(m).ok())
        else {
            return false;
        };
        let token = text
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .trim_end_matches('.');

        match self.month {
            MonthToken::Numeric => true,
            MonthToken::Full => token.eq_ignore_ascii_case(month.name()),
            MonthToken::Abbreviated => token.eq_ignore_ascii_case(&month.name()[..3]),
        }
    }
}

/// chrono's `%Y` takes any number of digits.
fn has_four_digit_year(text: &str) -> bool {
    text.bytes().rev().take_while(u8::is_ascii_digit).count() == 4
}

/// Link text date layouts, in priority order.
pub const LINK_DATE_FORMATS: &[DateFormat] = &[
    // March 3, 2023
    DateFormat::full("%B %d, %Y"),
    // Mar 3, 2023
    DateFormat::abbreviated("%b %d, %Y"),
    // March 2023
    DateFormat::month_only("%d %B %Y"),
    // Mar. 3, 2023
    DateFormat::abbreviated("%b. %d, %Y"),
    // 03/03/2023
    DateFormat::numeric("%m/%d/%Y"),
];

/// The portion of a link text that carries the date.
///
/// Everything from the first `(` on is a qualifier such as "(Workshop)".
pub fn date_text(link_text: &str) -> &str {
    link_text.split('(').next().unwrap_or_default().trim()
}

/// Parse a date from link text using [`LINK_DATE_FORMATS`].
///
/// Returns `None` when no layout matches; most links on a listing page are
/// not meeting dates.
pub fn parse_link_date(link_text: &str) -> Option<NaiveDate> {
    parse_with(date_text(link_text), LINK_DATE_FORMATS)
}

/// Try each layout in order and return the first match.
pub fn parse_with(text: &str, formats: &[DateFormat]) -> Option<NaiveDate> {
    if text.is_empty() {
        return None;
    }
    formats.iter().find_map(|format| format.parse(text))
}

/// Parse an API timestamp (`2024-03-01T10:00:00Z`) into its calendar date.
pub fn parse_api_date(timestamp: &str) -> Option<NaiveDate> {
    NaiveDateTime::parse_from_str(timestamp.trim(), API_TIMESTAMP_FORMAT)
        .ok()
        .map(|dt| dt.date())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_full_month_name() {
        assert_eq!(parse_link_date("March 3, 2023"), Some(ymd(2023, 3, 3)));
        assert_eq!(parse_link_date("December 14, 2022"), Some(ymd(2022, 12, 14)));
    }

    #[test]
    fn test_abbreviated_month() {
        assert_eq!(parse_link_date("Mar 3, 2023"), Some(ymd(2023, 3, 3)));
        assert_eq!(parse_link_date("Oct 19, 2021"), Some(ymd(2021, 10, 19)));
    }

    #[test]
    fn test_month_and_year_only() {
        assert_eq!(parse_link_date("March 2023"), Some(ymd(2023, 3, 1)));
    }

    #[test]
    fn test_abbreviated_month_with_period() {
        assert_eq!(parse_link_date("Jan. 5, 2024"), Some(ymd(2024, 1, 5)));
    }

    #[test]
    fn test_numeric_date() {
        assert_eq!(parse_link_date("03/15/2023"), Some(ymd(2023, 3, 15)));
        assert_eq!(parse_link_date("3/5/2023"), Some(ymd(2023, 3, 5)));
    }

    #[test]
    fn test_qualifier_is_stripped() {
        assert_eq!(
            parse_link_date("  March 3, 2023 (Workshop) "),
            Some(ymd(2023, 3, 3))
        );
        assert_eq!(date_text("May 2, 2023 (Special) (Amended)"), "May 2, 2023");
    }

    #[test]
    fn test_non_dates_return_none() {
        assert_eq!(parse_link_date("Contact Us"), None);
        assert_eq!(parse_link_date(""), None);
        assert_eq!(parse_link_date("(Workshop)"), None);
        assert_eq!(parse_link_date("February 30, 2023"), None);
        assert_eq!(parse_link_date("2023 Meeting Schedule"), None);
    }

    #[test]
    fn test_year_must_have_four_digits() {
        assert_eq!(parse_link_date("12/01/21"), None);
        assert_eq!(parse_link_date("March 3, 23"), None);
        assert_eq!(parse_link_date("March 3, 20230"), None);
    }

    #[test]
    fn test_month_spelling_follows_layout() {
        assert_eq!(parse_link_date("Mar 2023"), None);
        assert_eq!(parse_link_date("March. 3, 2023"), None);
        assert_eq!(parse_link_date("MARCH 2023"), Some(ymd(2023, 3, 1)));
        assert_eq!(parse_link_date("may 2, 2023"), Some(ymd(2023, 5, 2)));
    }

    #[test]
    fn test_format_order_is_stable() {
        let patterns: Vec<_> = LINK_DATE_FORMATS.iter().map(|f| f.pattern()).collect();
        assert_eq!(
            patterns,
            vec!["%B %d, %Y", "%b %d, %Y", "%d %B %Y", "%b. %d, %Y", "%m/%d/%Y"]
        );
    }

    #[test]
    fn test_api_date() {
        assert_eq!(parse_api_date("2024-03-01T10:00:00Z"), Some(ymd(2024, 3, 1)));
        assert_eq!(parse_api_date("2024-03-01"), None);
        assert_eq!(parse_api_date("not a date"), None);
    }
}
