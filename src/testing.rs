//! Test doubles shared across modules.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::display::{AdFragment, DisplaySurface};
use crate::error::{AppError, Result};
use crate::models::AdRecord;
use crate::services::AdSource;

/// Surface that keeps every fragment it was asked to draw.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    rendered: Arc<Mutex<Vec<AdFragment>>>,
    available: Arc<AtomicBool>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self {
            rendered: Arc::default(),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// A region that does not exist in the document.
    pub fn missing() -> Self {
        let surface = Self::new();
        surface.available.store(false, Ordering::SeqCst);
        surface
    }

    /// Ids of every rendered fragment, oldest first.
    pub fn rendered_ids(&self) -> Vec<String> {
        self.rendered
            .lock()
            .unwrap()
            .iter()
            .map(|f| f.ad_id.clone())
            .collect()
    }

    pub fn last(&self) -> Option<AdFragment> {
        self.rendered.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl DisplaySurface for RecordingSurface {
    fn region(&self) -> &str {
        "vip-ad-container"
    }

    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn render(&self, fragment: &AdFragment) -> Result<()> {
        self.rendered.lock().unwrap().push(fragment.clone());
        Ok(())
    }
}

/// Source standing in for a remote host that cannot be reached.
pub struct UnreachableSource;

#[async_trait]
impl AdSource for UnreachableSource {
    fn name(&self) -> &str {
        "remote"
    }

    async fn fetch(&self) -> Result<Vec<AdRecord>> {
        Err(AppError::source_failed("remote", "connection refused"))
    }
}

/// JSON for a valid stored record.
pub fn stored_ad(title: &str, clicks: u64) -> String {
    serde_json::json!({
        "title": title,
        "desc": format!("{title} description"),
        "image": format!("https://example.com/{title}.jpg"),
        "phone": "989220730628",
        "type": "vip",
        "clicks": clicks,
    })
    .to_string()
}
