//! Viewer orchestration - wires the controllers together
//!
//! The viewer sequences startup, funnels terminal input into navigation
//! commands, forwards accepted transitions to the render controller and
//! fans out render completions on the bus. It holds no navigation or render
//! policy of its own.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{Event, KeyCode, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use ratatui::Terminal;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::address::{AddressFragment, AddressState, session_file_for};
use crate::bus::{BusEvent, EventBus, Topic};
use crate::config::SlideConfig;
use crate::error::ViewerError;
use crate::event_source::EventSource;
use crate::indicator::ProgressIndicator;
use crate::nav::{NavCommand, NavigationController, PageChange};
use crate::pdf::{
    LinkDest, OVERSAMPLING_FACTOR, RegionAction, RenderController, RenderParams, RenderResponse,
    RequestId,
};
use crate::surface::{PagePresenter, Surface};

/// How long startup waits for the render engine to open the document.
pub const ENGINE_READY_TIMEOUT: Duration = Duration::from_secs(5);

const TICK_RATE: Duration = Duration::from_millis(50);

/// A release this close to its press is a click, not a swipe.
const CLICK_SLOP: u16 = 2;

pub struct Viewer {
    bus: EventBus,
    nav: NavigationController,
    render: RenderController,
    surface: Surface,
    address: AddressState,
    config: SlideConfig,
    title: String,
    pixel_ratio: f32,

    page_area: Rect,
    indicator_area: Rect,
    status_area: Rect,

    press_origin: Option<(u16, u16)>,
    pending_jumps: Rc<RefCell<Vec<usize>>>,
    awaiting_resolution: Option<RequestId>,
    last_error: Option<String>,
    should_quit: bool,
}

impl Viewer {
    /// Full startup sequence: config, address restore, engine spawn, ready
    /// wait, controller wiring.
    pub fn open(
        slide_folder: &Path,
        slide_id: Option<String>,
        page_hint: Option<usize>,
        pixel_ratio: f32,
    ) -> Result<Self, ViewerError> {
        let config = SlideConfig::load(slide_folder)
            .map_err(|e| ViewerError::DocumentLoad(format!("{e:#}")))?;

        let fallback = AddressFragment {
            slide: slide_id,
            page: page_hint,
        };
        let mut address = AddressState::load_or_new(session_file_for(slide_folder), fallback);
        if let Some(page) = page_hint {
            // Explicit hint wins over a restored session.
            address.replace_page(page);
        }

        let mut render = RenderController::new(config.pdf_path(slide_folder));
        let info = render.wait_ready(ENGINE_READY_TIMEOUT)?;

        let mut nav = NavigationController::new(info.page_count);
        nav.set_toc_pages(config.toc_pages());

        let title = if config.title.is_empty() {
            info.title.clone().unwrap_or_default()
        } else {
            config.title.clone()
        };

        Ok(Self::from_parts(config, address, render, nav, title, pixel_ratio))
    }

    /// Assemble a viewer from already-constructed collaborators. Tests wire
    /// the render controller to fake channels through this.
    #[must_use]
    pub fn from_parts(
        config: SlideConfig,
        address: AddressState,
        render: RenderController,
        nav: NavigationController,
        title: String,
        pixel_ratio: f32,
    ) -> Self {
        let mut viewer = Self {
            bus: EventBus::new(),
            nav,
            render,
            surface: Surface::new(),
            address,
            config,
            title,
            pixel_ratio,
            page_area: Rect::default(),
            indicator_area: Rect::default(),
            status_area: Rect::default(),
            press_origin: None,
            pending_jumps: Rc::new(RefCell::new(Vec::new())),
            awaiting_resolution: None,
            last_error: None,
            should_quit: false,
        };
        viewer.wire_bus();
        viewer
    }

    /// Collaborator wiring: jump requests from the bus feed back into
    /// navigation, errors are logged centrally.
    fn wire_bus(&mut self) {
        let jumps = Rc::clone(&self.pending_jumps);
        self.bus.subscribe(Topic::PageJumpRequested, move |event| {
            if let BusEvent::PageJumpRequested { page } = event {
                jumps.borrow_mut().push(*page);
            }
            Ok(())
        });

        self.bus.subscribe(Topic::Error, |event| {
            if let BusEvent::Error { page, message } = event {
                log::error!("viewer error (page {page:?}): {message}");
            }
            Ok(())
        });
    }

    #[must_use]
    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    #[must_use]
    pub fn current_page(&self) -> usize {
        self.nav.current_page()
    }

    /// Page currently on the surface, which can lag the committed page while
    /// a render is in flight.
    #[must_use]
    pub fn surface_page(&self) -> Option<usize> {
        self.surface.page().map(|p| p.page)
    }

    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Compute the layout for the current terminal size.
    pub fn set_size(&mut self, size: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(1),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(size);
        self.page_area = chunks[0];
        self.indicator_area = chunks[1];
        self.status_area = chunks[2];
    }

    fn render_params(&self) -> RenderParams {
        RenderParams {
            region_width_px: f32::from(self.page_area.width),
            region_height_px: f32::from(self.page_area.height) * 2.0,
            oversampling: OVERSAMPLING_FACTOR,
            pixel_ratio: self.pixel_ratio,
        }
    }

    /// Request the initial page: position hint if valid, else page 1.
    pub fn start(&mut self) {
        let hint = self.address.page().unwrap_or(1);
        let initial = if hint >= 1 && hint <= self.nav.page_count() {
            hint
        } else {
            1
        };

        if let Some(change) = self.nav.apply(NavCommand::GoTo(initial), Instant::now()) {
            self.commit_change(change);
        }
        self.bus.publish(&BusEvent::Initialized);
    }

    /// Apply one input event.
    pub fn handle_event(&mut self, event: &Event, now: Instant) {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                let command = match key.code {
                    KeyCode::Left | KeyCode::Up | KeyCode::PageUp => Some(NavCommand::Prev),
                    KeyCode::Right | KeyCode::Down | KeyCode::PageDown => Some(NavCommand::Next),
                    KeyCode::Home => Some(NavCommand::GoTo(1)),
                    KeyCode::End => Some(NavCommand::GoTo(self.nav.page_count())),
                    KeyCode::Char('q') | KeyCode::Esc => {
                        self.should_quit = true;
                        None
                    }
                    _ => None,
                };
                if let Some(command) = command {
                    self.apply_nav(command, now);
                }
            }

            Event::Mouse(mouse) => self.handle_mouse(mouse, now),

            Event::Resize(width, height) => {
                self.set_size(Rect::new(0, 0, *width, *height));
                self.bus.publish(&BusEvent::WindowResized);
                self.render.re_render(self.render_params());
            }

            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: &MouseEvent, now: Instant) {
        match mouse.kind {
            MouseEventKind::ScrollDown => self.apply_nav(NavCommand::Wheel { delta: 1 }, now),
            MouseEventKind::ScrollUp => self.apply_nav(NavCommand::Wheel { delta: -1 }, now),

            MouseEventKind::Down(MouseButton::Left) => {
                if self.indicator_area.contains((mouse.column, mouse.row).into()) {
                    self.apply_nav(
                        NavCommand::IndicatorClick {
                            x: mouse.column - self.indicator_area.x,
                            width: self.indicator_area.width,
                        },
                        now,
                    );
                } else {
                    self.press_origin = Some((mouse.column, mouse.row));
                    self.apply_nav(NavCommand::PressAt { x: mouse.column }, now);
                }
            }

            MouseEventKind::Up(MouseButton::Left) => {
                let is_click = self
                    .press_origin
                    .take()
                    .is_some_and(|(px, py)| {
                        px.abs_diff(mouse.column) <= CLICK_SLOP
                            && py.abs_diff(mouse.row) <= CLICK_SLOP
                    });

                if is_click && self.activate_region_at(mouse.column, mouse.row) {
                    return;
                }
                self.apply_nav(NavCommand::ReleaseAt { x: mouse.column }, now);
            }

            _ => {}
        }
    }

    /// Hit-test the interactive regions under a cell. Returns whether a
    /// region consumed the click.
    fn activate_region_at(&mut self, col: u16, row: u16) -> bool {
        let Some((sx, sy)) = self.surface.cell_to_surface(self.page_area, col, row) else {
            return false;
        };

        let action = self.surface.page().and_then(|page| {
            page.regions
                .iter()
                .find(|region| region.rect.contains(sx, sy))
                .map(|region| region.action.clone())
        });

        match action {
            Some(RegionAction::Jump(LinkDest::Page(page))) => {
                self.bus.publish(&BusEvent::PageJumpRequested { page });
                true
            }
            Some(RegionAction::Jump(LinkDest::Named(name))) => {
                // Resolution goes through the document handle; the jump
                // happens when the worker answers.
                self.awaiting_resolution = Some(self.render.resolve_dest(name));
                true
            }
            Some(RegionAction::OpenUrl(url)) => {
                log::info!("opening external link: {url}");
                if let Err(e) = open::that(&url) {
                    log::error!("failed to open {url}: {e}");
                }
                true
            }
            None => false,
        }
    }

    fn apply_nav(&mut self, command: NavCommand, now: Instant) {
        if let Some(change) = self.nav.apply(command, now) {
            self.commit_change(change);
        }
    }

    /// An accepted transition, in order: render, indicator (next draw pass),
    /// address rewrite. The page is already committed; a render failure
    /// surfaces on the bus without rolling it back.
    fn commit_change(&mut self, change: PageChange) {
        self.render.request_render(change.page, self.render_params());
        self.address.replace_page(change.page);
    }

    /// Drain worker responses and queued bus jumps. Called every loop tick.
    pub fn process_background(&mut self, now: Instant) {
        for response in self.render.poll_responses() {
            match response {
                RenderResponse::Page { data, .. } => {
                    let page = data.page;
                    let regions = data.regions.clone();
                    self.surface.set_page(data);
                    self.last_error = None;

                    if let Some(display_scale) = self.surface.display_scale(self.page_area) {
                        self.bus.publish(&BusEvent::PageRendered {
                            page,
                            regions,
                            display_scale,
                        });
                    }
                }

                RenderResponse::Error { page, error, .. } => {
                    let message = ViewerError::Render {
                        page,
                        detail: error.to_string(),
                    }
                    .to_string();
                    self.last_error = Some(message.clone());
                    self.bus.publish(&BusEvent::Error {
                        page: Some(page),
                        message,
                    });
                }

                RenderResponse::ResolvedDest { id, page } => {
                    if self.awaiting_resolution == Some(id) {
                        self.awaiting_resolution = None;
                        if let Some(page) = page {
                            self.bus.publish(&BusEvent::PageJumpRequested { page });
                        } else {
                            log::warn!("named destination did not resolve");
                        }
                    }
                }

                RenderResponse::DocumentInfo { .. } | RenderResponse::OpenFailed { .. } => {}
            }
        }

        let jumps: Vec<usize> = self.pending_jumps.borrow_mut().drain(..).collect();
        for page in jumps {
            self.apply_nav(NavCommand::GoTo(page), now);
        }
    }

    pub fn draw(&self, frame: &mut ratatui::Frame<'_>) {
        frame.render_widget(PagePresenter::new(&self.surface), self.page_area);

        if let Some(indicator) = ProgressIndicator::build(
            self.nav.current_page(),
            self.nav.page_count(),
            self.nav.toc_pages(),
        ) {
            frame.render_widget(indicator, self.indicator_area);
        }

        frame.render_widget(self.status_line(), self.status_area);
    }

    fn status_line(&self) -> Paragraph<'_> {
        let mut spans = vec![
            Span::styled(&self.title, Style::default().fg(Color::White)),
            Span::raw("  "),
            Span::styled(
                format!("{} / {}", self.nav.current_page(), self.nav.page_count()),
                Style::default().fg(Color::Cyan),
            ),
        ];

        for link in self.config.links_for_page(self.nav.current_page()) {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(
                format!("[{} -> {}]", link.title, link.slide),
                Style::default().fg(Color::Green),
            ));
        }

        if let Some(error) = &self.last_error {
            spans.push(Span::raw("  "));
            spans.push(Span::styled(
                error.as_str(),
                Style::default().fg(Color::Red),
            ));
        }

        Paragraph::new(Line::from(spans))
    }

    /// Tear down bus subscriptions.
    pub fn destroy(&mut self) {
        self.bus.reset();
    }
}

/// Main loop: draw, poll input, dispatch, drain background work.
pub fn run_viewer<B, E>(
    terminal: &mut Terminal<B>,
    events: &mut E,
    viewer: &mut Viewer,
) -> Result<()>
where
    B: ratatui::backend::Backend,
    B::Error: Send + Sync + 'static,
    E: EventSource,
{
    viewer.set_size(terminal.size().map(|s| Rect::new(0, 0, s.width, s.height))?);
    viewer.start();

    while !viewer.should_quit() {
        terminal.draw(|frame| viewer.draw(frame))?;

        if events.poll(TICK_RATE)? {
            let event = events.read()?;
            viewer.handle_event(&event, Instant::now());
        }

        viewer.process_background(Instant::now());
    }

    viewer.destroy();
    Ok(())
}
