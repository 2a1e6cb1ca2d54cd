//! Core types for page rendering

/// Oversampling applied beyond the fit scale so pages stay sharp when the
/// surface is downsampled to the cell grid.
pub const OVERSAMPLING_FACTOR: f32 = 2.0;

/// Destination of an internal link, kept raw at extraction time.
///
/// Named destinations are resolved lazily through the document handle when a
/// region is activated, so render latency stays independent of resolution
/// cost for regions the user never touches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkDest {
    /// Direct page reference (1-based).
    Page(usize),
    /// Named destination, unresolved.
    Named(String),
}

/// What activating an interactive region does.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegionAction {
    /// Jump to another page of the document.
    Jump(LinkDest),
    /// Open an external resource.
    OpenUrl(String),
}

/// Axis-aligned rectangle in surface pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RegionRect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl RegionRect {
    #[must_use]
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }
}

/// A clickable rectangle overlaid on a rendered page.
#[derive(Clone, Debug)]
pub struct InteractiveRegion {
    pub rect: RegionRect,
    pub action: RegionAction,
}

/// Mapping from surface pixel coordinates to on-screen pixel coordinates.
///
/// Derived from the current surface size vs the current displayed size and
/// recomputed after every resize; never cached beyond the current render.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayScale {
    pub scale_x: f32,
    pub scale_y: f32,
    pub display_width: f32,
    pub display_height: f32,
}

/// A fully rendered page: raster plus transformed region data.
///
/// Produced fresh on every render call; the previous result is discarded.
#[derive(Clone)]
pub struct RenderedPage {
    /// Page number (1-based).
    pub page: usize,
    /// Raw RGB pixel data (3 bytes per pixel).
    pub pixels: Vec<u8>,
    /// Surface width in physical pixels.
    pub width_px: u32,
    /// Surface height in physical pixels.
    pub height_px: u32,
    /// Final scale factor applied to native page coordinates.
    pub scale_factor: f32,
    /// Link regions in surface coordinates.
    pub regions: Vec<InteractiveRegion>,
}

impl std::fmt::Debug for RenderedPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderedPage")
            .field("page", &self.page)
            .field("width_px", &self.width_px)
            .field("height_px", &self.height_px)
            .field("scale_factor", &self.scale_factor)
            .field("regions_count", &self.regions.len())
            .finish_non_exhaustive()
    }
}
