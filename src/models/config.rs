//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Rotation timing
    #[serde(default)]
    pub rotation: RotationConfig,

    /// Display region and card presentation
    #[serde(default)]
    pub display: DisplayConfig,

    /// Ad source priority and locations
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Key-value store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Expiry date interpretation
    #[serde(default)]
    pub expiry: ExpiryConfig,

    /// Click recording strategy
    #[serde(default)]
    pub clicks: ClicksConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Built-in fallback record
    #[serde(default)]
    pub default_ad: DefaultAdConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.rotation.interval_secs == 0 {
            return Err(AppError::validation("rotation.interval_secs must be > 0"));
        }
        if self.display.region.trim().is_empty() {
            return Err(AppError::validation("display.region is empty"));
        }
        if self.store.key_prefix.is_empty() {
            return Err(AppError::validation("store.key_prefix is empty"));
        }
        if self.sources.priority.is_empty() {
            return Err(AppError::validation("sources.priority is empty"));
        }
        if self.sources.priority.contains(&SourceKind::Remote) {
            let url = self
                .sources
                .remote_url
                .as_deref()
                .ok_or_else(|| AppError::validation("sources.remote_url is required for remote"))?;
            Url::parse(url)?;
        }
        if self.clicks.mode == ClickMode::Remote {
            let endpoint = self
                .clicks
                .endpoint
                .as_deref()
                .ok_or_else(|| AppError::validation("clicks.endpoint is required for remote"))?;
            Url::parse(endpoint)?;
        }
        if self.http.user_agent.trim().is_empty() {
            return Err(AppError::validation("http.user_agent is empty"));
        }
        if self.http.timeout_secs == 0 {
            return Err(AppError::validation("http.timeout_secs must be > 0"));
        }
        Ok(())
    }
}

/// Rotation timing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationConfig {
    /// Seconds between automatic advances
    #[serde(default = "defaults::interval")]
    pub interval_secs: u64,
}

impl RotationConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            interval_secs: defaults::interval(),
        }
    }
}

/// Display region and card presentation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Name of the region the card is written into
    #[serde(default = "defaults::region")]
    pub region: String,

    /// Image shown when the ad image fails to load
    #[serde(default = "defaults::fallback_image")]
    pub fallback_image: String,

    /// Call-to-action label
    #[serde(default = "defaults::call_label")]
    pub call_label: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            region: defaults::region(),
            fallback_image: defaults::fallback_image(),
            call_label: defaults::call_label(),
        }
    }
}

/// Where ad records come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Key-value store records under the key prefix
    Store,
    /// JSON file shipped next to the page
    Bundled,
    /// JSON document fetched over HTTP
    Remote,
}

/// Source priority and locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Sources in the order they are tried
    #[serde(default = "defaults::priority")]
    pub priority: Vec<SourceKind>,

    /// Path of the bundled `{ "ads": [...] }` file
    #[serde(default = "defaults::bundled_path")]
    pub bundled_path: PathBuf,

    /// URL of the remote `{ "ads": [...] }` document
    #[serde(default)]
    pub remote_url: Option<String>,

    /// Append `v=<millis>` to remote requests to defeat caches
    #[serde(default = "defaults::cache_bust")]
    pub cache_bust: bool,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            priority: defaults::priority(),
            bundled_path: defaults::bundled_path(),
            remote_url: None,
            cache_bust: defaults::cache_bust(),
        }
    }
}

/// Key-value store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory backing the local store
    #[serde(default = "defaults::store_dir")]
    pub dir: PathBuf,

    /// Prefix marking ad records among the store keys
    #[serde(default = "defaults::key_prefix")]
    pub key_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            dir: defaults::store_dir(),
            key_prefix: defaults::key_prefix(),
        }
    }
}

/// Calendar used to read date-only expiry values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Calendar {
    #[default]
    Gregorian,
    /// Solar Hijri dates, converted to Gregorian before comparison
    Jalali,
}

/// Expiry interpretation settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpiryConfig {
    #[serde(default)]
    pub calendar: Calendar,
}

/// How clicks are recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClickMode {
    /// Increment the counter on the stored record
    #[default]
    Local,
    /// Report the click to a tracking endpoint
    Remote,
}

/// Click recording settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClicksConfig {
    #[serde(default)]
    pub mode: ClickMode,

    /// Tracking endpoint for remote mode
    #[serde(default)]
    pub endpoint: Option<String>,
}

/// HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Content of the built-in fallback record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultAdConfig {
    #[serde(default = "defaults::default_title")]
    pub title: String,
    #[serde(default = "defaults::default_desc")]
    pub desc: String,
    #[serde(default = "defaults::default_image")]
    pub image: String,
    #[serde(default = "defaults::default_phone")]
    pub phone: String,
}

impl Default for DefaultAdConfig {
    fn default() -> Self {
        Self {
            title: defaults::default_title(),
            desc: defaults::default_desc(),
            image: defaults::default_image(),
            phone: defaults::default_phone(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level filter when `RUST_LOG` is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    use super::SourceKind;

    // Rotation defaults
    pub fn interval() -> u64 {
        8
    }

    // Display defaults
    pub fn region() -> String {
        "vip-ad-container".into()
    }
    pub fn fallback_image() -> String {
        "https://via.placeholder.com/150?text=Ad".into()
    }
    pub fn call_label() -> String {
        "📞 Call now".into()
    }

    // Source defaults
    pub fn priority() -> Vec<SourceKind> {
        vec![SourceKind::Store, SourceKind::Bundled]
    }
    pub fn bundled_path() -> PathBuf {
        PathBuf::from("ads.json")
    }
    pub fn cache_bust() -> bool {
        true
    }

    // Store defaults
    pub fn store_dir() -> PathBuf {
        PathBuf::from("storage")
    }
    pub fn key_prefix() -> String {
        "ad_".into()
    }

    // HTTP defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; ad-rotator/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Fallback record defaults
    pub fn default_title() -> String {
        "🔥 Premium barbecue charcoal".into()
    }
    pub fn default_desc() -> String {
        "Buy 3 bags of charcoal and get a bundle of fresh herbs free. Fast local delivery.".into()
    }
    pub fn default_image() -> String {
        "https://via.placeholder.com/300x150?text=Charcoal".into()
    }
    pub fn default_phone() -> String {
        "989220730628".into()
    }

    // Logging defaults
    pub fn log_level() -> String {
        "info".into()
    }
}
