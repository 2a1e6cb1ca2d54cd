//! Presentation surface - owns the current raster and draws it
//!
//! Display pixel space is the half-block grid: one column is one pixel wide,
//! one row is two pixels tall. The displayed box is the aspect-preserving fit
//! of the surface into the drawing area, centered.

use std::num::NonZeroU32;
use std::sync::Arc;

use fast_image_resize as fir;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::widgets::Widget;

use crate::pdf::{DisplayScale, RenderedPage};

/// Displayed box of the surface within a drawing area, in cells.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayBox {
    pub x: u16,
    pub y: u16,
    pub cols: u16,
    pub rows: u16,
}

/// Holds the most recently rendered page. The previous raster is discarded
/// whenever a new one arrives; there is no cross-page cache.
#[derive(Default)]
pub struct Surface {
    current: Option<Arc<RenderedPage>>,
}

impl Surface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_page(&mut self, page: Arc<RenderedPage>) {
        self.current = Some(page);
    }

    #[must_use]
    pub fn page(&self) -> Option<&Arc<RenderedPage>> {
        self.current.as_ref()
    }

    /// Aspect-preserving fit of the surface into `area`, centered.
    #[must_use]
    pub fn display_box(&self, area: Rect) -> Option<DisplayBox> {
        let page = self.current.as_ref()?;
        if area.width == 0 || area.height == 0 || page.width_px == 0 || page.height_px == 0 {
            return None;
        }

        // One cell is 1 px wide and 2 px tall in display space.
        let area_w_px = f32::from(area.width);
        let area_h_px = f32::from(area.height) * 2.0;

        let scale = (area_w_px / page.width_px as f32).min(area_h_px / page.height_px as f32);
        let cols = ((page.width_px as f32 * scale) as u16).clamp(1, area.width);
        let rows = ((page.height_px as f32 * scale / 2.0) as u16).clamp(1, area.height);

        Some(DisplayBox {
            x: area.x + (area.width - cols) / 2,
            y: area.y + (area.height - rows) / 2,
            cols,
            rows,
        })
    }

    /// Surface-to-display scale for a drawing area. Recomputed per call;
    /// never cached across resizes.
    #[must_use]
    pub fn display_scale(&self, area: Rect) -> Option<DisplayScale> {
        let page = self.current.as_ref()?;
        let display_box = self.display_box(area)?;

        let display_width = f32::from(display_box.cols);
        let display_height = f32::from(display_box.rows) * 2.0;
        Some(DisplayScale {
            scale_x: display_width / page.width_px as f32,
            scale_y: display_height / page.height_px as f32,
            display_width,
            display_height,
        })
    }

    /// Map a cell position to surface pixel coordinates, if it falls inside
    /// the displayed box.
    #[must_use]
    pub fn cell_to_surface(&self, area: Rect, col: u16, row: u16) -> Option<(f32, f32)> {
        let display_box = self.display_box(area)?;
        let scale = self.display_scale(area)?;

        if col < display_box.x
            || col >= display_box.x + display_box.cols
            || row < display_box.y
            || row >= display_box.y + display_box.rows
        {
            return None;
        }

        let dx = f32::from(col - display_box.x) + 0.5;
        let dy = (f32::from(row - display_box.y) + 0.5) * 2.0;
        Some((dx / scale.scale_x, dy / scale.scale_y))
    }
}

/// Widget drawing the surface with upper-half-block cells.
pub struct PagePresenter<'a> {
    surface: &'a Surface,
}

impl<'a> PagePresenter<'a> {
    #[must_use]
    pub fn new(surface: &'a Surface) -> Self {
        Self { surface }
    }
}

impl Widget for PagePresenter<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(page) = self.surface.page() else {
            return;
        };
        let Some(display_box) = self.surface.display_box(area) else {
            return;
        };

        let target_w = u32::from(display_box.cols);
        let target_h = u32::from(display_box.rows) * 2;
        let Ok(pixels) = resize_rgb(page, target_w, target_h) else {
            return;
        };

        for cell_y in 0..display_box.rows {
            for cell_x in 0..display_box.cols {
                let top = rgb_at(&pixels, target_w, u32::from(cell_x), u32::from(cell_y) * 2);
                let bottom = rgb_at(&pixels, target_w, u32::from(cell_x), u32::from(cell_y) * 2 + 1);

                buf.set_string(
                    display_box.x + cell_x,
                    display_box.y + cell_y,
                    "\u{2580}",
                    Style::default().fg(top).bg(bottom),
                );
            }
        }
    }
}

fn rgb_at(pixels: &[u8], width: u32, x: u32, y: u32) -> Color {
    let idx = ((y * width + x) * 3) as usize;
    match pixels.get(idx..idx + 3) {
        Some(px) => Color::Rgb(px[0], px[1], px[2]),
        None => Color::Black,
    }
}

fn resize_rgb(page: &RenderedPage, width: u32, height: u32) -> Result<Vec<u8>, String> {
    if page.width_px == width && page.height_px == height {
        return Ok(page.pixels.clone());
    }

    let src_w = NonZeroU32::new(page.width_px).ok_or("zero source width")?;
    let src_h = NonZeroU32::new(page.height_px).ok_or("zero source height")?;
    let dst_w = NonZeroU32::new(width).ok_or("zero target width")?;
    let dst_h = NonZeroU32::new(height).ok_or("zero target height")?;

    let src = fir::Image::from_vec_u8(src_w, src_h, page.pixels.clone(), fir::PixelType::U8x3)
        .map_err(|e| e.to_string())?;
    let mut dst = fir::Image::new(dst_w, dst_h, fir::PixelType::U8x3);
    let mut resizer = fir::Resizer::new(fir::ResizeAlg::Convolution(fir::FilterType::Bilinear));
    resizer
        .resize(&src.view(), &mut dst.view_mut())
        .map_err(|e| e.to_string())?;

    Ok(dst.into_vec())
}
