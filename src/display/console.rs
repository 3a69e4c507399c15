//! Terminal display surface.

use async_trait::async_trait;

use crate::display::{AdFragment, DisplaySurface};
use crate::error::Result;

/// Prints the current card to stdout.
#[derive(Debug, Clone)]
pub struct ConsoleSurface {
    region: String,
}

impl ConsoleSurface {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
        }
    }
}

#[async_trait]
impl DisplaySurface for ConsoleSurface {
    fn region(&self) -> &str {
        &self.region
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn render(&self, fragment: &AdFragment) -> Result<()> {
        println!("{}", "─".repeat(60));
        println!("  [{}] {}", fragment.ad_id, fragment.title);
        if !fragment.desc.is_empty() {
            println!("  {}", fragment.desc);
        }
        println!("  {} <{}>", fragment.call_label, fragment.call_href);
        if let Some(label) = &fragment.expiry_label {
            println!("  {label}");
        }
        println!("{}", "─".repeat(60));
        Ok(())
    }
}
