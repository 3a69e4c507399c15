//! Utility functions and helpers.

pub mod http;

use chrono::{DateTime, Utc};
use url::Url;

/// Replace Persian and Arabic-Indic digits with their ASCII counterparts.
pub fn normalize_digits(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '۰'..='۹' => char::from(b'0' + (c as u32 - '۰' as u32) as u8),
            '٠'..='٩' => char::from(b'0' + (c as u32 - '٠' as u32) as u8),
            _ => c,
        })
        .collect()
}

/// Append a `v=<millis>` query parameter so intermediaries cannot serve a stale copy.
pub fn cache_busted(url: &str, now: DateTime<Utc>) -> crate::error::Result<String> {
    let mut parsed = Url::parse(url)?;
    parsed
        .query_pairs_mut()
        .append_pair("v", &now.timestamp_millis().to_string());
    Ok(parsed.to_string())
}
