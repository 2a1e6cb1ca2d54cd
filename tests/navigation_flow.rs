//! End-to-end navigation flow against a scripted render engine.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use ratatui::Terminal;
use ratatui::backend::TestBackend;
use ratatui::layout::Rect;

use deckview::address::{AddressFragment, AddressState};
use deckview::app::{Viewer, run_viewer};
use deckview::bus::Topic;
use deckview::config::SlideConfig;
use deckview::event_source::{KeyCode, KeyModifiers, SimulatedEventSource};
use deckview::nav::NavigationController;
use deckview::pdf::{
    InteractiveRegion, LinkDest, RegionAction, RegionRect, RenderController, RenderRequest,
    RenderResponse, RenderedPage,
};

const CONFIG: &str = r#"{
    "title": "Demo deck",
    "pdfPath": "deck.pdf",
    "slides": [
        { "page": 1, "title": "Intro" },
        { "page": 4, "title": "Closing" }
    ]
}"#;

/// Spawn a thread that answers render requests like a well-behaved engine,
/// recording every page it actually rasterizes.
fn scripted_engine(page_count: usize) -> (RenderController, Arc<Mutex<Vec<usize>>>) {
    let (request_tx, request_rx) = flume::unbounded::<RenderRequest>();
    let (response_tx, response_rx) = flume::unbounded::<RenderResponse>();
    let rendered = Arc::new(Mutex::new(Vec::new()));

    let log = Arc::clone(&rendered);
    std::thread::spawn(move || {
        for request in request_rx {
            match request {
                RenderRequest::Page { id, page, .. } => {
                    log.lock().unwrap().push(page);
                    let regions = if page == 2 {
                        vec![InteractiveRegion {
                            rect: RegionRect {
                                x0: 0.0,
                                y0: 0.0,
                                x1: 10.0,
                                y1: 10.0,
                            },
                            action: RegionAction::Jump(LinkDest::Page(4)),
                        }]
                    } else {
                        vec![]
                    };
                    let _ = response_tx.send(RenderResponse::Page {
                        id,
                        data: Arc::new(RenderedPage {
                            page,
                            pixels: vec![200; 40 * 30 * 3],
                            width_px: 40,
                            height_px: 30,
                            scale_factor: 1.0,
                            regions,
                        }),
                    });
                }
                RenderRequest::ResolveDest { id, .. } => {
                    let _ = response_tx.send(RenderResponse::ResolvedDest {
                        id,
                        page: Some(page_count),
                    });
                }
                RenderRequest::Shutdown => break,
            }
        }
    });

    (RenderController::connect(request_tx, response_rx), rendered)
}

fn viewer_with_engine(page_count: usize, initial_query: &str) -> (Viewer, Arc<Mutex<Vec<usize>>>) {
    let config: SlideConfig = serde_json::from_str(CONFIG).unwrap();
    let address = AddressState::new(AddressFragment::parse(initial_query));
    let (render, rendered) = scripted_engine(page_count);
    let mut nav = NavigationController::new(page_count);
    nav.set_toc_pages(config.toc_pages());

    let viewer = Viewer::from_parts(config, address, render, nav, "Demo deck".into(), 1.0);
    (viewer, rendered)
}

/// Pump background processing until the surface shows `page` or we give up.
fn wait_for_surface(viewer: &mut Viewer, page: usize) {
    let deadline = Instant::now() + Duration::from_secs(1);
    while viewer.surface_page() != Some(page) {
        if Instant::now() > deadline {
            panic!("engine never delivered page {page}");
        }
        viewer.process_background(Instant::now());
        std::thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn startup_restores_the_address_hint() {
    let (mut viewer, rendered) = viewer_with_engine(5, "slide=001&page=2");
    viewer.set_size(Rect::new(0, 0, 80, 24));
    viewer.start();

    assert_eq!(viewer.current_page(), 2);
    wait_for_surface(&mut viewer, 2);
    assert_eq!(rendered.lock().unwrap().first(), Some(&2));
}

#[test]
fn startup_falls_back_to_page_one_on_bad_hint() {
    let (mut viewer, _) = viewer_with_engine(5, "slide=001&page=99");
    viewer.set_size(Rect::new(0, 0, 80, 24));
    viewer.start();
    assert_eq!(viewer.current_page(), 1);
}

#[test]
fn keys_wheel_and_indicator_drive_one_state_variable() {
    let (mut viewer, _) = viewer_with_engine(10, "page=1");
    viewer.set_size(Rect::new(0, 0, 80, 24));
    viewer.start();

    let t0 = Instant::now();
    let right = SimulatedEventSource::key_event(KeyCode::Right, KeyModifiers::empty());
    viewer.handle_event(&right, t0);
    assert_eq!(viewer.current_page(), 2);

    // Wheel burst inside one window: only the first tick lands.
    viewer.handle_event(&SimulatedEventSource::wheel_down(10, 10), t0);
    viewer.handle_event(
        &SimulatedEventSource::wheel_down(10, 10),
        t0 + Duration::from_millis(100),
    );
    assert_eq!(viewer.current_page(), 3);

    viewer.handle_event(
        &SimulatedEventSource::wheel_down(10, 10),
        t0 + Duration::from_millis(400),
    );
    assert_eq!(viewer.current_page(), 4);

    // Indicator row is the second-to-last line; a far-left click jumps home.
    viewer.handle_event(&SimulatedEventSource::press(0, 22), t0 + Duration::from_millis(500));
    assert_eq!(viewer.current_page(), 1);
}

#[test]
fn swipe_changes_page_and_click_on_region_jumps() {
    let (mut viewer, _) = viewer_with_engine(10, "page=2");
    viewer.set_size(Rect::new(0, 0, 80, 24));
    viewer.start();
    wait_for_surface(&mut viewer, 2);

    // Page 2 carries a link region in its top-left corner; a press/release
    // on the same cell is a click, and it lands on the region.
    let t = Instant::now();
    viewer.handle_event(&SimulatedEventSource::press(11, 0), t);
    viewer.handle_event(&SimulatedEventSource::release(11, 0), t);
    viewer.process_background(t);
    assert_eq!(viewer.current_page(), 4);

    // A long left drag across the page area is a swipe to the next page.
    viewer.handle_event(&SimulatedEventSource::press(70, 10), t);
    viewer.handle_event(&SimulatedEventSource::release(10, 10), t);
    assert_eq!(viewer.current_page(), 5);
}

#[test]
fn render_burst_reaches_only_first_and_last_page() {
    let (mut viewer, rendered) = viewer_with_engine(10, "page=1");
    viewer.set_size(Rect::new(0, 0, 80, 24));
    viewer.start();

    // Three rapid jumps while the initial render may still be in flight.
    let t = Instant::now();
    for page in [2, 3, 4] {
        let jump = deckview::bus::BusEvent::PageJumpRequested { page };
        viewer.bus_mut().publish(&jump);
    }
    viewer.process_background(t);
    assert_eq!(viewer.current_page(), 4);

    wait_for_surface(&mut viewer, 4);
    std::thread::sleep(Duration::from_millis(20));
    viewer.process_background(Instant::now());

    let pages = rendered.lock().unwrap().clone();
    // Never renders an intermediate page that was overwritten while another
    // render was in flight.
    assert!(!pages.windows(2).any(|w| w == [2, 3]));
    assert_eq!(pages.last(), Some(&4));
}

#[test]
fn page_rendered_events_fan_out_on_the_bus() {
    let (mut viewer, _) = viewer_with_engine(5, "page=1");
    viewer.set_size(Rect::new(0, 0, 80, 24));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    viewer.bus_mut().subscribe(Topic::PageRendered, move |event| {
        if let deckview::bus::BusEvent::PageRendered { page, .. } = event {
            sink.lock().unwrap().push(*page);
        }
        Ok(())
    });

    viewer.start();
    wait_for_surface(&mut viewer, 1);
    assert_eq!(seen.lock().unwrap().first(), Some(&1));
}

#[test]
fn run_loop_draws_and_quits() {
    let (mut viewer, _) = viewer_with_engine(5, "page=1");

    let backend = TestBackend::new(80, 24);
    let mut terminal = Terminal::new(backend).unwrap();
    let mut events = SimulatedEventSource::new(vec![
        SimulatedEventSource::key_event(KeyCode::Right, KeyModifiers::empty()),
        SimulatedEventSource::char_key('q'),
    ]);

    run_viewer(&mut terminal, &mut events, &mut viewer).unwrap();
    assert!(viewer.should_quit());
    assert_eq!(viewer.current_page(), 2);
}
