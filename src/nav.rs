//! Navigation state machine
//!
//! Five input sources (buttons, keys, wheel, swipe, indicator clicks) funnel
//! into one state variable: the current page. Every accepted transition is
//! returned as a [`PageChange`] effect; the orchestrator performs the render,
//! indicator redraw and address update in that order.

use std::time::{Duration, Instant};

/// Only one wheel-triggered transition is honored per window; trailing wheel
/// events inside it are discarded, not queued.
pub const WHEEL_COOLDOWN: Duration = Duration::from_millis(300);

/// Horizontal press/release delta beyond this triggers a swipe transition.
pub const SWIPE_THRESHOLD: i32 = 50;

/// Navigation intents, one per input source.
#[derive(Clone, Copy, Debug)]
pub enum NavCommand {
    /// Button or key: previous page.
    Prev,
    /// Button or key: next page.
    Next,
    /// Direct jump (1-based). Out-of-range targets are silently ignored.
    GoTo(usize),
    /// Wheel tick; positive delta pages forward.
    Wheel { delta: i32 },
    /// Pointer press, start of a potential swipe.
    PressAt { x: u16 },
    /// Pointer release, end of a potential swipe.
    ReleaseAt { x: u16 },
    /// Click on the progress indicator track.
    IndicatorClick { x: u16, width: u16 },
}

/// An accepted transition. The page is already committed when this is
/// returned; a later render failure does not roll it back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageChange {
    pub page: usize,
}

/// Owns the authoritative current-page value.
pub struct NavigationController {
    current_page: usize,
    page_count: usize,
    toc_pages: Vec<usize>,
    press_x: Option<u16>,
    wheel_window_start: Option<Instant>,
}

impl NavigationController {
    #[must_use]
    pub fn new(page_count: usize) -> Self {
        Self {
            current_page: 1,
            page_count,
            toc_pages: Vec::new(),
            press_x: None,
            wheel_window_start: None,
        }
    }

    /// Pages carrying table-of-contents entries, used only for indicator
    /// markers.
    pub fn set_toc_pages(&mut self, mut pages: Vec<usize>) {
        pages.sort_unstable();
        pages.dedup();
        self.toc_pages = pages;
    }

    #[must_use]
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    #[must_use]
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    #[must_use]
    pub fn toc_pages(&self) -> &[usize] {
        &self.toc_pages
    }

    /// Fill/thumb position as a percentage: first page 0%, last page 100%.
    #[must_use]
    pub fn progress_percent(&self) -> f32 {
        progress_percent(self.current_page, self.page_count)
    }

    /// Apply an input command. `now` drives the wheel cooldown window.
    pub fn apply(&mut self, cmd: NavCommand, now: Instant) -> Option<PageChange> {
        match cmd {
            NavCommand::Prev => self.prev(),
            NavCommand::Next => self.next(),
            NavCommand::GoTo(page) => self.go_to(page),

            NavCommand::Wheel { delta } => {
                if let Some(start) = self.wheel_window_start {
                    if now.duration_since(start) < WHEEL_COOLDOWN {
                        return None;
                    }
                }
                self.wheel_window_start = Some(now);
                match delta {
                    d if d > 0 => self.next(),
                    d if d < 0 => self.prev(),
                    _ => None,
                }
            }

            NavCommand::PressAt { x } => {
                self.press_x = Some(x);
                None
            }

            NavCommand::ReleaseAt { x } => {
                let start = i32::from(self.press_x.take()?);
                let end = i32::from(x);
                if end < start - SWIPE_THRESHOLD {
                    self.next()
                } else if end > start + SWIPE_THRESHOLD {
                    self.prev()
                } else {
                    None
                }
            }

            NavCommand::IndicatorClick { x, width } => {
                if width == 0 {
                    return None;
                }
                let fraction = f32::from(x) / f32::from(width);
                let target = (fraction * self.page_count as f32).round() as usize;
                self.go_to(target.clamp(1, self.page_count))
            }
        }
    }

    fn prev(&mut self) -> Option<PageChange> {
        if self.current_page <= 1 {
            return None;
        }
        self.current_page -= 1;
        Some(PageChange { page: self.current_page })
    }

    fn next(&mut self) -> Option<PageChange> {
        if self.current_page >= self.page_count {
            return None;
        }
        self.current_page += 1;
        Some(PageChange { page: self.current_page })
    }

    fn go_to(&mut self, page: usize) -> Option<PageChange> {
        if page < 1 || page > self.page_count {
            return None;
        }
        self.current_page = page;
        Some(PageChange { page })
    }
}

/// Normalized position of a page on the indicator track, as a percentage.
#[must_use]
pub fn progress_percent(page: usize, page_count: usize) -> f32 {
    if page_count <= 1 {
        return 0.0;
    }
    (page - 1) as f32 / (page_count - 1) as f32 * 100.0
}
