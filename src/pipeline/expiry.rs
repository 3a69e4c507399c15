// src/pipeline/expiry.rs

//! Expiry filtering.
//!
//! A record stays eligible while its `expiry` is absent or strictly in the
//! future. Values that cannot be parsed keep the record (fail open).
//!
//! ## Accepted formats
//!
//! | Form                         | Interpretation                       |
//! |------------------------------|--------------------------------------|
//! | `2026-03-01T12:00:00+03:30`  | RFC 3339, taken as-is                |
//! | `2026-03-01T12:00[:00]`      | naive date-time, UTC                 |
//! | `2026-03-01 12:00[:00]`      | naive date-time, UTC                 |
//! | `2026-03-01`, `2026/03/01`   | 00:00 UTC of that day, per calendar  |
//!
//! Only date-only values go through the calendar conversion. Persian and
//! Arabic-Indic digits are accepted everywhere.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

use crate::models::{AdRecord, Calendar};
use crate::utils::normalize_digits;

static DATE_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4})[-/.](\d{1,2})[-/.](\d{1,2})$").expect("valid date regex")
});

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Filters out records whose expiry has passed.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpiryFilter {
    calendar: Calendar,
}

impl ExpiryFilter {
    pub fn new(calendar: Calendar) -> Self {
        Self { calendar }
    }

    /// Whether the record's expiry parses to an instant at or before `now`.
    pub fn is_expired(&self, ad: &AdRecord, now: DateTime<Utc>) -> bool {
        let Some(raw) = ad.expiry.as_deref() else {
            return false;
        };
        if raw.trim().is_empty() {
            return false;
        }
        match parse_expiry(raw, self.calendar) {
            Some(expiry) => expiry <= now,
            None => {
                log::debug!("Unparseable expiry {:?} on {}, keeping it", raw, ad.id);
                false
            }
        }
    }

    /// Keep only records that have not expired.
    pub fn apply(&self, ads: Vec<AdRecord>, now: DateTime<Utc>) -> Vec<AdRecord> {
        let before = ads.len();
        let kept: Vec<AdRecord> = ads
            .into_iter()
            .filter(|ad| !self.is_expired(ad, now))
            .collect();
        if kept.len() < before {
            log::info!("Dropped {} expired ads", before - kept.len());
        }
        kept
    }
}

/// Parse an expiry string into a UTC instant.
pub fn parse_expiry(raw: &str, calendar: Calendar) -> Option<DateTime<Utc>> {
    let value = normalize_digits(raw.trim());

    if let Ok(dt) = DateTime::parse_from_rfc3339(&value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&value, format) {
            return Some(naive.and_utc());
        }
    }

    let caps = DATE_ONLY.captures(&value)?;
    let year: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let day: u32 = caps[3].parse().ok()?;

    let date = match calendar {
        Calendar::Gregorian => NaiveDate::from_ymd_opt(year, month, day)?,
        Calendar::Jalali => jalali_to_gregorian(year, month, day)?,
    };
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

/// First Jalali year the arithmetic below is anchored on (979-01-01 = 1600-03-21).
const JALALI_EPOCH_YEAR: i32 = 979;

/// Days from 1600-01-01 to 1600-03-21.
const EPOCH_OFFSET_DAYS: i64 = 79;

/// Days elapsed from the epoch to Farvardin 1st of `years` Jalali years later.
///
/// Uses the arithmetic 33-year cycle: 8 leap years per cycle.
fn jalali_year_start(years: i64) -> i64 {
    365 * years + (years / 33) * 8 + ((years % 33) + 3) / 4
}

fn jalali_month_length(year: i32, month: u32) -> Option<u32> {
    match month {
        1..=6 => Some(31),
        7..=11 => Some(30),
        12 => Some(if is_jalali_leap(year) { 30 } else { 29 }),
        _ => None,
    }
}

/// Leap years under the 33-year arithmetic cycle.
pub fn is_jalali_leap(year: i32) -> bool {
    let years = i64::from(year - JALALI_EPOCH_YEAR);
    years >= 0 && jalali_year_start(years + 1) - jalali_year_start(years) == 366
}

/// Convert a Jalali (Solar Hijri) date to the Gregorian calendar.
///
/// Valid for years from 979 onwards. Returns `None` for out-of-range
/// components, including Esfand 30th in a common year.
pub fn jalali_to_gregorian(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    if year < JALALI_EPOCH_YEAR || day == 0 || day > jalali_month_length(year, month)? {
        return None;
    }

    let years = i64::from(year - JALALI_EPOCH_YEAR);
    let months_before = i64::from(month - 1);
    let month_days = if months_before <= 6 {
        months_before * 31
    } else {
        6 * 31 + (months_before - 6) * 30
    };
    let day_number = jalali_year_start(years) + month_days + i64::from(day - 1);

    NaiveDate::from_ymd_opt(1600, 1, 1)?
        .checked_add_signed(Duration::days(day_number + EPOCH_OFFSET_DAYS))
}
