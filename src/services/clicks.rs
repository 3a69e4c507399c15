// src/services/clicks.rs

//! Click recording strategies.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Value, json};

use crate::error::{AppError, Result};
use crate::models::{ClickMode, Config};
use crate::storage::KeyValueStore;

/// What happened to a click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Counted; carries the new total when it is known locally
    Recorded { clicks: Option<u64> },
    /// No record with that id exists where the tracker looked
    Missing,
}

/// Something that records ad clicks.
#[async_trait]
pub trait ClickTracker: Send + Sync {
    async fn record(&self, ad_id: &str, at: DateTime<Utc>) -> Result<ClickOutcome>;
}

/// Increments the counter on the stored record.
///
/// Works on the raw JSON object so fields this crate does not model survive
/// the write-back.
pub struct StoreClickTracker {
    store: Arc<dyn KeyValueStore>,
}

impl StoreClickTracker {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ClickTracker for StoreClickTracker {
    async fn record(&self, ad_id: &str, at: DateTime<Utc>) -> Result<ClickOutcome> {
        let Some(raw) = self.store.get(ad_id).await? else {
            return Ok(ClickOutcome::Missing);
        };

        let mut value: Value = serde_json::from_str(&raw)?;
        let record = value
            .as_object_mut()
            .ok_or_else(|| AppError::store(format!("record {ad_id} is not a JSON object")))?;

        let clicks = record
            .get("clicks")
            .and_then(Value::as_u64)
            .unwrap_or(0)
            .saturating_add(1);
        record.insert("clicks".into(), json!(clicks));
        record.insert(
            "lastClick".into(),
            json!(at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );

        self.store.set(ad_id, &serde_json::to_string(&value)?).await?;
        Ok(ClickOutcome::Recorded {
            clicks: Some(clicks),
        })
    }
}

/// Reports clicks to an external tracking endpoint.
pub struct RemoteClickTracker {
    client: reqwest::Client,
    endpoint: String,
}

impl RemoteClickTracker {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ClickTracker for RemoteClickTracker {
    async fn record(&self, ad_id: &str, at: DateTime<Utc>) -> Result<ClickOutcome> {
        self.client
            .post(&self.endpoint)
            .json(&json!({
                "adId": ad_id,
                "timestamp": at.to_rfc3339_opts(SecondsFormat::Millis, true),
            }))
            .send()
            .await?
            .error_for_status()?;
        Ok(ClickOutcome::Recorded { clicks: None })
    }
}

/// Build the tracker selected by `[clicks] mode`.
pub fn tracker_from_config(
    config: &Config,
    store: Arc<dyn KeyValueStore>,
    client: &reqwest::Client,
) -> Result<Box<dyn ClickTracker>> {
    Ok(match config.clicks.mode {
        ClickMode::Local => Box::new(StoreClickTracker::new(store)),
        ClickMode::Remote => {
            let endpoint = config
                .clicks
                .endpoint
                .clone()
                .ok_or_else(|| AppError::config("clicks.endpoint is not set"))?;
            Box::new(RemoteClickTracker::new(client.clone(), endpoint))
        }
    })
}
