//! Query window for the events API.

use chrono::{DateTime, NaiveTime, TimeDelta, Utc};

use crate::error::{AppError, Result};
use crate::utils::date::API_TIMESTAMP_FORMAT;

/// Ordering that keeps pagination stable between pages.
pub const EVENT_ORDER_BY: &str = "startDateTime asc, eventName asc";

/// Start/end bounds of one API run, widened to whole UTC days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DateWindow {
    /// Window from `lookback_days` before `now` (00:00:00) to
    /// `lookahead_days` after `now` (23:59:59).
    ///
    /// Negative day counts and windows outside chrono's range are rejected.
    pub fn around(now: DateTime<Utc>, lookback_days: i64, lookahead_days: i64) -> Result<Self> {
        let out_of_range = || {
            AppError::validation(format!(
                "date window -{lookback_days}/+{lookahead_days} days is out of range"
            ))
        };
        if lookback_days < 0 || lookahead_days < 0 {
            return Err(out_of_range());
        }

        let start_day = TimeDelta::try_days(lookback_days)
            .and_then(|d| now.checked_sub_signed(d))
            .ok_or_else(out_of_range)?
            .date_naive();
        let end_day = TimeDelta::try_days(lookahead_days)
            .and_then(|d| now.checked_add_signed(d))
            .ok_or_else(out_of_range)?
            .date_naive();

        let start = start_day.and_time(NaiveTime::MIN).and_utc();
        let end = end_day
            .and_hms_opt(23, 59, 59)
            .ok_or_else(out_of_range)?
            .and_utc();

        Ok(Self { start, end })
    }

    /// OData filter expression over `startDateTime`.
    pub fn filter(&self) -> String {
        format!(
            "startDateTime ge {} and startDateTime le {}",
            self.start.format(API_TIMESTAMP_FORMAT),
            self.end.format(API_TIMESTAMP_FORMAT)
        )
    }

    /// First-page URL: `base_url` with the filter and ordering applied.
    pub fn query_url(&self, base_url: &str) -> String {
        let separator = if base_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}$filter={}&$orderby={}",
            base_url,
            separator,
            encode_spaces(&self.filter()),
            encode_spaces(EVENT_ORDER_BY)
        )
    }
}

fn encode_spaces(s: &str) -> String {
    s.replace(' ', "%20")
}
