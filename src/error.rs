//! Viewer error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewerError {
    /// The deck config or the document itself could not be opened.
    #[error("failed to load document: {0}")]
    DocumentLoad(String),

    /// A page render failed. The page stays committed; the previous surface
    /// keeps being shown.
    #[error("failed to render page {page}: {detail}")]
    Render { page: usize, detail: String },

    /// The render engine never reported the document open.
    #[error("render engine unavailable after {waited_ms}ms")]
    EngineUnavailable { waited_ms: u64 },
}
