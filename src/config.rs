//! Slide configuration - `config.json` in the slide folder

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Per-deck configuration. Slides carrying a `title` form the table of
/// contents; their pages become indicator markers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlideConfig {
    #[serde(default)]
    pub title: String,
    pub pdf_path: String,
    #[serde(default)]
    pub slides: Vec<SlideEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideEntry {
    /// Page this entry describes (1-based).
    pub page: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<SlideLink>,
}

/// Cross-deck link shown for a page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlideLink {
    pub title: String,
    pub slide: String,
}

impl SlideConfig {
    pub fn load(slide_folder: &Path) -> anyhow::Result<Self> {
        let path = slide_folder.join("config.json");
        let content = fs::read_to_string(&path)
            .with_context(|| format!("reading slide config {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("parsing slide config {}", path.display()))?;
        Ok(config)
    }

    #[must_use]
    pub fn pdf_path(&self, slide_folder: &Path) -> PathBuf {
        slide_folder.join(&self.pdf_path)
    }

    /// Table of contents: titled slides, ordered by page.
    #[must_use]
    pub fn table_of_contents(&self) -> Vec<(usize, &str)> {
        let mut toc: Vec<(usize, &str)> = self
            .slides
            .iter()
            .filter_map(|s| s.title.as_deref().map(|t| (s.page, t)))
            .collect();
        toc.sort_by_key(|(page, _)| *page);
        toc
    }

    #[must_use]
    pub fn toc_pages(&self) -> Vec<usize> {
        self.table_of_contents().into_iter().map(|(p, _)| p).collect()
    }

    #[must_use]
    pub fn links_for_page(&self, page: usize) -> &[SlideLink] {
        self.slides
            .iter()
            .find(|s| s.page == page)
            .map(|s| s.links.as_slice())
            .unwrap_or(&[])
    }
}
