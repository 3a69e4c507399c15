// src/services/mod.rs

//! Service layer for the ad rotator.
//!
//! - `sources`: Places ad records are loaded from
//! - `clicks`: Click recording strategies

pub mod clicks;
pub mod sources;

pub use clicks::{
    ClickOutcome, ClickTracker, RemoteClickTracker, StoreClickTracker, tracker_from_config,
};
pub use sources::{
    AdSource, BundledSource, RemoteSource, StoreSource, parse_document, sources_from_config,
};
