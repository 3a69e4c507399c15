// src/models/ad.rs

//! Advertisement record and the JSON payload shapes it travels in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::models::DefaultAdConfig;

/// Identifier of the built-in record shown when nothing else is eligible.
pub const DEFAULT_AD_ID: &str = "default_ad";

/// A single advertisement card.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AdRecord {
    /// Unique identifier (store key for stored records)
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,

    /// Headline shown on the card
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,

    /// Body text
    #[serde(default, deserialize_with = "lenient_string")]
    pub desc: String,

    /// Image URL
    #[serde(default, deserialize_with = "lenient_string")]
    pub image: String,

    /// Phone number used by the call-to-action
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone: String,

    /// Informational tag (e.g. "vip", "test")
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub ad_type: String,

    /// Raw expiry date; `None` never expires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<String>,

    /// Creation timestamp
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created: Option<DateTime<Utc>>,

    /// Click counter
    #[serde(default, deserialize_with = "lenient_clicks")]
    pub clicks: u64,

    /// Timestamp of the most recent click
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_click: Option<DateTime<Utc>>,
}

impl AdRecord {
    /// A record is displayable only with a non-blank title and image.
    pub fn is_valid(&self) -> bool {
        !self.title.trim().is_empty() && !self.image.trim().is_empty()
    }

    /// Whether this is the synthesized fallback record.
    pub fn is_default(&self) -> bool {
        self.id == DEFAULT_AD_ID
    }

    /// Build the fallback record from configuration.
    pub fn default_ad(config: &DefaultAdConfig, now: DateTime<Utc>) -> Self {
        Self {
            id: DEFAULT_AD_ID.to_string(),
            title: config.title.clone(),
            desc: config.desc.clone(),
            image: config.image.clone(),
            phone: config.phone.clone(),
            ad_type: "vip".to_string(),
            expiry: None,
            created: Some(now),
            clicks: 0,
            last_click: None,
        }
    }

    /// Build a fresh record from administrative input.
    pub fn from_new(id: impl Into<String>, new_ad: NewAd, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: new_ad.title,
            desc: new_ad.desc,
            image: new_ad.image,
            phone: new_ad.phone,
            ad_type: new_ad.ad_type,
            expiry: new_ad.expiry.filter(|e| !e.trim().is_empty()),
            created: Some(now),
            clicks: 0,
            last_click: None,
        }
    }
}

/// Input for the administrative "add" operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewAd {
    pub title: String,
    #[serde(default)]
    pub desc: String,
    pub image: String,
    #[serde(default)]
    pub phone: String,
    #[serde(rename = "type", default)]
    pub ad_type: String,
    #[serde(default)]
    pub expiry: Option<String>,
}

/// Bundled or remote payload: `{ "ads": [...] }`.
///
/// Entries stay untyped so one malformed record does not reject its siblings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdsDocument {
    #[serde(default)]
    pub ads: Vec<Value>,
}

/// Accept strings, numbers and booleans as text; `null` becomes empty.
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string, found {other}"
        ))),
    }
}

/// `null` counts as zero clicks; negative or non-integer counts are rejected.
fn lenient_clicks<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or(0))
}

/// Timestamps that fail to parse are dropped instead of rejecting the record.
fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    })
}
