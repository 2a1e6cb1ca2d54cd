//! PDF render worker - runs in a dedicated thread
//!
//! Owns the document handle for the lifetime of the viewer session. At most
//! one render is physically in flight: the worker processes requests one at
//! a time off its channel.

use std::path::Path;

use flume::{Receiver, Sender};
use mupdf::{Colorspace, Document, Matrix, Outline, Page};

use super::request::{RenderParams, RenderRequest, RenderResponse, WorkerFault};
use super::types::{InteractiveRegion, LinkDest, RegionAction, RegionRect, RenderedPage};

/// Pre-computed rasterization parameters for a page
struct RasterSpec {
    transform: Matrix,
    scale: f32,
}

impl RasterSpec {
    /// Fit the page into the display region without cropping, preserving
    /// aspect ratio, then oversample for sharpness on the output device.
    fn compute(page_bounds: (f32, f32), params: &RenderParams) -> Self {
        let (page_width, page_height) = page_bounds;

        let scale_x = params.region_width_px / page_width;
        let scale_y = params.region_height_px / page_height;
        let fit_scale = scale_x.min(scale_y);

        let scale = fit_scale * params.oversampling * params.pixel_ratio;

        Self {
            transform: Matrix::new_scale(scale, scale),
            scale,
        }
    }
}

/// Main worker function - runs in a dedicated thread
pub fn render_worker(
    doc_path: &Path,
    requests: Receiver<RenderRequest>,
    responses: Sender<RenderResponse>,
) {
    let doc = match open_document(doc_path) {
        Ok((doc, page_count, title)) => {
            let _ = responses.send(RenderResponse::DocumentInfo { page_count, title });
            doc
        }
        Err(error) => {
            let _ = responses.send(RenderResponse::OpenFailed { error });
            return;
        }
    };

    for request in requests {
        match request {
            RenderRequest::Page { id, page, params } => match render_page(&doc, page, &params) {
                Ok(data) => {
                    let _ = responses.send(RenderResponse::Page {
                        id,
                        data: std::sync::Arc::new(data),
                    });
                }
                Err(error) => {
                    let _ = responses.send(RenderResponse::Error { id, page, error });
                }
            },

            RenderRequest::ResolveDest { id, name } => {
                let page = resolve_named_dest(&doc, &name);
                let _ = responses.send(RenderResponse::ResolvedDest { id, page });
            }

            RenderRequest::Shutdown => break,
        }
    }
}

fn open_document(doc_path: &Path) -> Result<(Document, usize, Option<String>), WorkerFault> {
    let doc = Document::open(doc_path.to_string_lossy().as_ref())?;
    let page_count = doc.page_count()? as usize;

    if page_count == 0 {
        return Err(WorkerFault::generic("document has no pages"));
    }

    let title = doc
        .metadata(mupdf::MetadataName::Title)
        .ok()
        .filter(|t| !t.is_empty());

    Ok((doc, page_count, title))
}

/// Render a single page (1-based) and extract its link regions.
pub fn render_page(
    doc: &Document,
    page_num: usize,
    params: &RenderParams,
) -> Result<RenderedPage, WorkerFault> {
    let page = doc.load_page(page_num as i32 - 1)?;

    let bounds = page.bounds()?;
    let page_bounds = (bounds.x1 - bounds.x0, bounds.y1 - bounds.y0);

    let spec = RasterSpec::compute(page_bounds, params);

    let rgb = Colorspace::device_rgb();
    let pixmap = page.to_pixmap(&spec.transform, &rgb, false, false)?;

    let regions = extract_regions(&page, spec.scale);
    let pixels = pixmap_to_rgb(&pixmap)?;

    Ok(RenderedPage {
        page: page_num,
        pixels,
        width_px: pixmap.width(),
        height_px: pixmap.height(),
        scale_factor: spec.scale,
        regions,
    })
}

/// Extract link-type annotations, transformed into surface coordinates.
///
/// Destinations stay raw: a direct page reference when the engine already
/// resolved one, otherwise the named-destination string. Resolution is the
/// consumer's business.
pub(crate) fn extract_regions(page: &Page, scale_factor: f32) -> Vec<InteractiveRegion> {
    let Ok(links) = page.links() else {
        return Vec::new();
    };

    links
        .filter_map(|link| {
            let action = if let Some(dest) = link.dest {
                Some(RegionAction::Jump(LinkDest::Page(
                    dest.loc.page_number as usize + 1,
                )))
            } else if let Some(name) = link.uri.strip_prefix('#') {
                Some(RegionAction::Jump(LinkDest::Named(name.to_string())))
            } else if !link.uri.is_empty() {
                Some(RegionAction::OpenUrl(link.uri.clone()))
            } else {
                None
            }?;

            let rect = link.bounds;
            if rect.is_empty() {
                return None;
            }

            Some(InteractiveRegion {
                rect: RegionRect {
                    x0: (rect.x0.min(rect.x1) * scale_factor).max(0.0),
                    y0: (rect.y0.min(rect.y1) * scale_factor).max(0.0),
                    x1: (rect.x0.max(rect.x1) * scale_factor).max(0.0),
                    y1: (rect.y0.max(rect.y1) * scale_factor).max(0.0),
                },
                action,
            })
        })
        .collect()
}

/// Resolve a named destination by walking the document outline tree.
/// Returns a 1-based page number if an outline entry targets the name.
fn resolve_named_dest(doc: &Document, name: &str) -> Option<usize> {
    let outlines = doc.outlines().ok()?;
    find_in_outlines(&outlines, name)
}

fn find_in_outlines(outlines: &[Outline], name: &str) -> Option<usize> {
    for outline in outlines {
        let matches = outline
            .uri
            .as_deref()
            .and_then(|uri| uri.strip_prefix('#'))
            .is_some_and(|n| n == name);

        if matches {
            if let Some(dest) = outline.dest {
                return Some(dest.loc.page_number as usize + 1);
            }
        }

        if let Some(found) = find_in_outlines(&outline.down, name) {
            return Some(found);
        }
    }
    None
}

fn pixmap_to_rgb(pixmap: &mupdf::Pixmap) -> Result<Vec<u8>, WorkerFault> {
    let n = pixmap.n() as usize;
    if n < 3 {
        return Err(WorkerFault::generic(format!(
            "Unsupported pixmap format: {n} channels"
        )));
    }

    let width = pixmap.width() as usize;
    let height = pixmap.height() as usize;
    let stride = pixmap.stride() as usize;
    let samples = pixmap.samples();
    let row_bytes = width * n;
    let expected_min = stride.saturating_mul(height);
    if samples.len() < expected_min || row_bytes > stride {
        return Err(WorkerFault::generic("Pixmap buffer size mismatch"));
    }

    let mut out = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        let row_start = y * stride;
        let row = &samples[row_start..row_start + row_bytes];
        if n == 3 {
            out.extend_from_slice(row);
        } else {
            for px in row.chunks_exact(n) {
                out.extend_from_slice(&px[..3]);
            }
        }
    }

    Ok(out)
}
