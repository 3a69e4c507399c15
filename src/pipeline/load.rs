// src/pipeline/load.rs

//! Load sequence: sources → validity → expiry → default fallback.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::models::{AdRecord, DefaultAdConfig};
use crate::pipeline::ExpiryFilter;
use crate::services::AdSource;

/// Tries sources in priority order until one yields valid records.
pub struct SourceLoader {
    sources: Vec<Box<dyn AdSource>>,
}

impl SourceLoader {
    pub fn new(sources: Vec<Box<dyn AdSource>>) -> Self {
        Self { sources }
    }

    /// Names of the configured sources, in priority order.
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Produce the candidate list from the first source with valid records.
    ///
    /// Source failures are logged and count as zero records; this never fails.
    pub async fn load(&self) -> Vec<AdRecord> {
        for source in &self.sources {
            let ads = match source.fetch().await {
                Ok(ads) => select_valid(ads, source.name()),
                Err(e) => {
                    log::warn!("Source {} unavailable: {}", source.name(), e);
                    continue;
                }
            };

            if ads.is_empty() {
                log::debug!("Source {} yielded no valid ads", source.name());
                continue;
            }

            log::info!("Loaded {} ads from {}", ads.len(), source.name());
            return ads;
        }

        log::warn!("No source yielded any valid ads");
        Vec::new()
    }
}

/// Drop invalid records and keep the first occurrence of each id.
pub fn select_valid(ads: Vec<AdRecord>, source_name: &str) -> Vec<AdRecord> {
    let mut seen = HashSet::new();
    ads.into_iter()
        .filter(|ad| {
            if !ad.is_valid() {
                log::warn!("{}: skipping ad {} without title or image", source_name, ad.id);
                return false;
            }
            if !seen.insert(ad.id.clone()) {
                log::warn!("{}: skipping duplicate ad id {}", source_name, ad.id);
                return false;
            }
            true
        })
        .collect()
}

/// Replace an empty list with the single built-in record.
pub fn with_default_fallback(
    ads: Vec<AdRecord>,
    defaults: &DefaultAdConfig,
    now: DateTime<Utc>,
) -> Vec<AdRecord> {
    if !ads.is_empty() {
        return ads;
    }
    log::info!("No eligible ads, showing the default ad");
    vec![AdRecord::default_ad(defaults, now)]
}

/// Run the full load sequence and return the new active list.
pub async fn build_active_list(
    loader: &SourceLoader,
    filter: &ExpiryFilter,
    defaults: &DefaultAdConfig,
    now: DateTime<Utc>,
) -> Vec<AdRecord> {
    let candidates = loader.load().await;
    let active = filter.apply(candidates, now);
    with_default_fallback(active, defaults, now)
}
