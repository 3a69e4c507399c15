// src/services/sources.rs

//! Ad sources.
//!
//! Each source produces raw candidate records. Validity, de-duplication and
//! fallback between sources are the loader's concern.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{AppError, Result};
use crate::models::{AdRecord, AdsDocument, Config, SourceKind};
use crate::storage::{KeyValueStore, prefixed_keys};
use crate::utils::{cache_busted, http};

/// A place ad records can be loaded from.
#[async_trait]
pub trait AdSource: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &str;

    /// Fetch every candidate record this source holds.
    async fn fetch(&self) -> Result<Vec<AdRecord>>;
}

/// Parse a `{ "ads": [...] }` payload.
///
/// Malformed entries are skipped individually. Entries without an id are
/// named `json_<position>`.
pub fn parse_document(bytes: &[u8], source_name: &str) -> Result<Vec<AdRecord>> {
    let document: AdsDocument = serde_json::from_slice(bytes)?;

    let mut ads = Vec::with_capacity(document.ads.len());
    for (position, entry) in document.ads.into_iter().enumerate() {
        match serde_json::from_value::<AdRecord>(entry) {
            Ok(mut ad) => {
                if ad.id.trim().is_empty() {
                    ad.id = format!("json_{position}");
                }
                ads.push(ad);
            }
            Err(e) => {
                log::warn!("{source_name}: skipping malformed ad #{position}: {e}");
            }
        }
    }
    Ok(ads)
}

/// Records persisted in the key-value store under the ad prefix.
pub struct StoreSource {
    store: Arc<dyn KeyValueStore>,
    prefix: String,
}

impl StoreSource {
    pub fn new(store: Arc<dyn KeyValueStore>, prefix: impl Into<String>) -> Self {
        Self {
            store,
            prefix: prefix.into(),
        }
    }
}

#[async_trait]
impl AdSource for StoreSource {
    fn name(&self) -> &str {
        "store"
    }

    async fn fetch(&self) -> Result<Vec<AdRecord>> {
        let mut ads = Vec::new();
        for key in prefixed_keys(self.store.as_ref(), &self.prefix).await? {
            let raw = match self.store.get(&key).await {
                Ok(Some(raw)) => raw,
                Ok(None) => continue,
                Err(e) => {
                    log::warn!("store: skipping unreadable record {key}: {e}");
                    continue;
                }
            };
            match serde_json::from_str::<AdRecord>(&raw) {
                Ok(mut ad) => {
                    // The store key is authoritative.
                    ad.id = key;
                    ads.push(ad);
                }
                Err(e) => log::warn!("store: skipping corrupt record {key}: {e}"),
            }
        }
        Ok(ads)
    }
}

/// JSON file shipped alongside the page.
pub struct BundledSource {
    path: PathBuf,
}

impl BundledSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl AdSource for BundledSource {
    fn name(&self) -> &str {
        "bundled"
    }

    async fn fetch(&self) -> Result<Vec<AdRecord>> {
        let bytes = tokio::fs::read(&self.path).await?;
        parse_document(&bytes, self.name())
    }
}

/// JSON document fetched over HTTP.
pub struct RemoteSource {
    client: reqwest::Client,
    url: String,
    cache_bust: bool,
}

impl RemoteSource {
    pub fn new(client: reqwest::Client, url: impl Into<String>, cache_bust: bool) -> Self {
        Self {
            client,
            url: url.into(),
            cache_bust,
        }
    }
}

#[async_trait]
impl AdSource for RemoteSource {
    fn name(&self) -> &str {
        "remote"
    }

    async fn fetch(&self) -> Result<Vec<AdRecord>> {
        let url = if self.cache_bust {
            cache_busted(&self.url, Utc::now())?
        } else {
            self.url.clone()
        };
        let bytes = http::fetch_bytes(&self.client, &url).await?;
        parse_document(&bytes, self.name())
    }
}

/// Build the sources named in `[sources] priority`, in order.
pub fn sources_from_config(
    config: &Config,
    store: Arc<dyn KeyValueStore>,
    client: &reqwest::Client,
) -> Result<Vec<Box<dyn AdSource>>> {
    config
        .sources
        .priority
        .iter()
        .map(|kind| -> Result<Box<dyn AdSource>> {
            Ok(match kind {
                SourceKind::Store => Box::new(StoreSource::new(
                    Arc::clone(&store),
                    config.store.key_prefix.clone(),
                )),
                SourceKind::Bundled => {
                    Box::new(BundledSource::new(config.sources.bundled_path.clone()))
                }
                SourceKind::Remote => {
                    let url = config
                        .sources
                        .remote_url
                        .clone()
                        .ok_or_else(|| AppError::config("sources.remote_url is not set"))?;
                    Box::new(RemoteSource::new(
                        client.clone(),
                        url,
                        config.sources.cache_bust,
                    ))
                }
            })
        })
        .collect()
}
