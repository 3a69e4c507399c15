//! HTML file display surface.
//!
//! Writes the card markup to `{dir}/{region}.html`, replacing it on every
//! render, so a static page can include or poll it.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::display::{AdFragment, DisplaySurface};
use crate::error::Result;

/// Display region backed by a single HTML file.
#[derive(Debug, Clone)]
pub struct HtmlFileSurface {
    dir: PathBuf,
    region: String,
}

impl HtmlFileSurface {
    pub fn new(dir: impl Into<PathBuf>, region: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            region: region.into(),
        }
    }

    /// Path of the file holding the region content.
    pub fn path(&self) -> PathBuf {
        self.dir.join(format!("{}.html", self.region))
    }
}

#[async_trait]
impl DisplaySurface for HtmlFileSurface {
    fn region(&self) -> &str {
        &self.region
    }

    /// The region exists while its directory does.
    async fn is_available(&self) -> bool {
        tokio::fs::metadata(&self.dir)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
    }

    async fn render(&self, fragment: &AdFragment) -> Result<()> {
        let path = self.path();
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, fragment.to_html()).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}
