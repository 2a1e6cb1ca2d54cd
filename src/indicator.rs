//! Progress indicator - horizontal track with fill, thumb and TOC markers
//!
//! Fill width and thumb position both follow the normalized-position formula
//! `(page - 1) / (page_count - 1)`. The indicator is not constructed at all
//! for single-page documents; the caller checks [`ProgressIndicator::build`].

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::widgets::Widget;

use crate::nav::progress_percent;

const TRACK: &str = "─";
const FILL: &str = "━";
const THUMB: &str = "●";
const MARKER: &str = "◆";

pub struct ProgressIndicator {
    percent: f32,
    marker_percents: Vec<f32>,
}

impl ProgressIndicator {
    /// Returns `None` when the document has at most one page.
    #[must_use]
    pub fn build(current_page: usize, page_count: usize, toc_pages: &[usize]) -> Option<Self> {
        if page_count <= 1 {
            return None;
        }

        let marker_percents = toc_pages
            .iter()
            .filter(|&&p| p >= 1 && p <= page_count)
            .map(|&p| progress_percent(p, page_count))
            .collect();

        Some(Self {
            percent: progress_percent(current_page, page_count),
            marker_percents,
        })
    }
}

/// Column on a track of `width` cells for a normalized percentage.
fn percent_to_column(percent: f32, width: u16) -> u16 {
    if width <= 1 {
        return 0;
    }
    let col = (percent / 100.0 * f32::from(width - 1)).round() as u16;
    col.min(width - 1)
}

impl Widget for ProgressIndicator {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let y = area.y;
        let thumb_col = percent_to_column(self.percent, area.width);

        for col in 0..area.width {
            let (symbol, style) = if col <= thumb_col {
                (FILL, Style::default().fg(Color::Cyan))
            } else {
                (TRACK, Style::default().fg(Color::DarkGray))
            };
            buf.set_string(area.x + col, y, symbol, style);
        }

        for percent in &self.marker_percents {
            let col = percent_to_column(*percent, area.width);
            buf.set_string(
                area.x + col,
                y,
                MARKER,
                Style::default().fg(Color::Yellow),
            );
        }

        buf.set_string(
            area.x + thumb_col,
            y,
            THUMB,
            Style::default().fg(Color::White),
        );
    }
}
