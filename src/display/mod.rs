//! Display abstractions.
//!
//! The controller never touches a document directly. It hands an
//! [`AdFragment`] to a [`DisplaySurface`] and receives pointer and click
//! activity as [`DisplayEvent`]s over a channel fed by the host.

pub mod console;
pub mod html_file;

use async_trait::async_trait;
use html_escape::{encode_double_quoted_attribute, encode_text};
use tokio::sync::mpsc;

use crate::error::Result;
use crate::models::{AdRecord, DisplayConfig};

pub use console::ConsoleSurface;
pub use html_file::HtmlFileSurface;

/// Activity on the display region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayEvent {
    /// Pointer moved onto the region
    PointerEnter,
    /// Pointer left the region
    PointerLeave,
    /// The call-to-action of the given ad was activated
    Activate { ad_id: String },
}

/// Sender half handed to whatever observes the region.
pub type DisplayEventSender = mpsc::Sender<DisplayEvent>;

/// A region the current ad can be written into.
#[async_trait]
pub trait DisplaySurface: Send + Sync {
    /// Name of the region.
    fn region(&self) -> &str;

    /// Whether the region currently exists.
    async fn is_available(&self) -> bool;

    /// Replace the entire content of the region.
    async fn render(&self, fragment: &AdFragment) -> Result<()>;
}

/// Region that is always present and draws nothing.
///
/// Used for batch administration where no card should be shown.
#[derive(Debug, Clone, Default)]
pub struct HeadlessSurface;

#[async_trait]
impl DisplaySurface for HeadlessSurface {
    fn region(&self) -> &str {
        "headless"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn render(&self, fragment: &AdFragment) -> Result<()> {
        log::debug!("Headless render of {}", fragment.ad_id);
        Ok(())
    }
}

/// Renders the same card into several regions.
///
/// The first surface names the region; the group is available while any
/// member is.
pub struct MirroredSurface {
    surfaces: Vec<Box<dyn DisplaySurface>>,
}

impl MirroredSurface {
    pub fn new(primary: Box<dyn DisplaySurface>) -> Self {
        Self {
            surfaces: vec![primary],
        }
    }

    pub fn with(mut self, mirror: Box<dyn DisplaySurface>) -> Self {
        self.surfaces.push(mirror);
        self
    }
}

#[async_trait]
impl DisplaySurface for MirroredSurface {
    fn region(&self) -> &str {
        self.surfaces[0].region()
    }

    async fn is_available(&self) -> bool {
        for surface in &self.surfaces {
            if surface.is_available().await {
                return true;
            }
        }
        false
    }

    async fn render(&self, fragment: &AdFragment) -> Result<()> {
        for surface in &self.surfaces {
            if surface.is_available().await {
                surface.render(fragment).await?;
            } else {
                log::debug!("Skipping unavailable region {}", surface.region());
            }
        }
        Ok(())
    }
}

/// Everything needed to draw one ad card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdFragment {
    pub ad_id: String,
    pub image: String,
    pub fallback_image: String,
    pub title: String,
    pub desc: String,
    pub call_label: String,
    /// `tel:` link carrying the phone number
    pub call_href: String,
    pub expiry_label: Option<String>,
}

impl AdFragment {
    pub fn from_record(ad: &AdRecord, display: &DisplayConfig) -> Self {
        Self {
            ad_id: ad.id.clone(),
            image: ad.image.clone(),
            fallback_image: display.fallback_image.clone(),
            title: ad.title.clone(),
            desc: ad.desc.clone(),
            call_label: display.call_label.clone(),
            call_href: format!("tel:{}", ad.phone.trim()),
            expiry_label: ad
                .expiry
                .as_deref()
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .map(|e| format!("⏳ {e}")),
        }
    }

    /// Card markup. Every interpolated value is escaped.
    pub fn to_html(&self) -> String {
        let id = encode_double_quoted_attribute(&self.ad_id);
        let expiry = self
            .expiry_label
            .as_deref()
            .map(|label| format!("\n    <small class=\"vip-expiry\">{}</small>", encode_text(label)))
            .unwrap_or_default();

        format!(
            r#"<div class="vip-ad-card fade-anim" data-ad-id="{id}">
  <img src="{src}" class="vip-img" alt="{alt}" loading="lazy" data-fallback="{fallback}" onerror="this.onerror=null;this.src=this.dataset.fallback">
  <div class="vip-info">
    <div class="vip-title">{title}</div>
    <div class="vip-desc">{desc}</div>
    <a href="{href}" class="btn-call-vip" data-ad-id="{id}">{label}</a>{expiry}
  </div>
</div>"#,
            src = encode_double_quoted_attribute(&self.image),
            alt = encode_double_quoted_attribute(&self.title),
            fallback = encode_double_quoted_attribute(&self.fallback_image),
            title = encode_text(&self.title),
            desc = encode_text(&self.desc),
            href = encode_double_quoted_attribute(&self.call_href),
            label = encode_text(&self.call_label),
        )
    }
}
