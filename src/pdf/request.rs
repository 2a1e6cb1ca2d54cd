//! Render request and response types

use std::sync::Arc;

use super::types::RenderedPage;

/// Unique identifier for render requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Parameters for rendering a page.
#[derive(Clone, Copy, Debug)]
pub struct RenderParams {
    /// Available display region width in physical pixels.
    pub region_width_px: f32,
    /// Available display region height in physical pixels.
    pub region_height_px: f32,
    /// Fixed multiplier beyond fit scale for sharpness.
    pub oversampling: f32,
    /// Physical-to-logical pixel ratio of the output device.
    pub pixel_ratio: f32,
}

/// Request sent to the render worker
#[derive(Debug)]
pub enum RenderRequest {
    /// Rasterize a page (1-based) and extract its link regions
    Page {
        id: RequestId,
        page: usize,
        params: RenderParams,
    },

    /// Resolve a named destination to a page number
    ResolveDest { id: RequestId, name: String },

    /// Shutdown the worker
    Shutdown,
}

/// Errors from the render worker
#[derive(Debug, thiserror::Error)]
pub enum WorkerFault {
    #[error("PDF engine: {0}")]
    Pdf(#[from] mupdf::error::Error),

    #[error("{detail}")]
    Generic { detail: String },
}

impl WorkerFault {
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic { detail: msg.into() }
    }
}

/// Response from the render worker
#[derive(Debug)]
pub enum RenderResponse {
    /// Rendered page data
    Page { id: RequestId, data: Arc<RenderedPage> },

    /// Result of a named-destination lookup (1-based page, if found)
    ResolvedDest { id: RequestId, page: Option<usize> },

    /// Error during rendering
    Error {
        id: RequestId,
        page: usize,
        error: WorkerFault,
    },

    /// Document metadata, sent once after the worker opens the document
    DocumentInfo {
        page_count: usize,
        title: Option<String>,
    },

    /// The document could not be opened; the worker has exited
    OpenFailed { error: WorkerFault },
}
