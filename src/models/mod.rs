// src/models/mod.rs

//! Domain models for the ad rotator.
//!
//! This module contains the data structures shared by the loader, the
//! controller and the storage layer.

mod ad;
mod config;

// Re-export all public types
pub use ad::{AdRecord, AdsDocument, DEFAULT_AD_ID, NewAd};
pub use config::{
    Calendar, ClickMode, ClicksConfig, Config, DefaultAdConfig, DisplayConfig, ExpiryConfig,
    HttpConfig, LoggingConfig, RotationConfig, SourceKind, SourcesConfig, StoreConfig,
};

/// Aggregate counters over the persisted records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdStats {
    /// Parseable records in the store
    pub total_ads: usize,
    /// Sum of their click counters
    pub total_clicks: u64,
    /// Records currently in the active list
    pub active_ads_count: usize,
}
