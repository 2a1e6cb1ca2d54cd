//! Render controller - single-flight render scheduling
//!
//! Owns the channel pair to the render worker and enforces the concurrency
//! policy: at most one render in flight, and at most one pending page that
//! is overwritten (not queued) by later requests. Intermediate requests in a
//! burst are dropped; the last one survives to run next.

use std::path::PathBuf;
use std::time::Duration;

use flume::{Receiver, Sender};

use crate::error::ViewerError;

use super::request::{RenderParams, RenderRequest, RenderResponse, RequestId};
use super::types::DisplayScale;
use super::worker::render_worker;

/// Document metadata reported by the worker after opening.
#[derive(Clone, Debug)]
pub struct DocumentInfo {
    pub page_count: usize,
    pub title: Option<String>,
}

/// Drives the render worker and serializes concurrent render requests.
pub struct RenderController {
    request_tx: Sender<RenderRequest>,
    response_rx: Receiver<RenderResponse>,
    next_request_id: u64,
    /// Request currently being rendered, if any.
    in_flight: Option<(RequestId, usize)>,
    /// At most one page waiting to render; overwritten, never queued.
    pending: Option<usize>,
    /// Params of the most recent request; a pending render reuses them.
    params: Option<RenderParams>,
    /// Page of the most recent request, for re-render after resize.
    last_requested: Option<usize>,
    /// Pixel dimensions of the most recently completed surface.
    surface_size: Option<(u32, u32)>,
    page_count: usize,
}

impl RenderController {
    /// Spawn the render worker for a document. The worker opens the document
    /// and reports metadata; await it with [`Self::wait_ready`].
    #[must_use]
    pub fn new(doc_path: PathBuf) -> Self {
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();

        std::thread::spawn(move || {
            render_worker(&doc_path, request_rx, response_tx);
        });

        Self::connect(request_tx, response_rx)
    }

    /// Wire a controller onto existing channels. Tests drive the response
    /// side directly instead of spawning a worker.
    #[must_use]
    pub fn connect(
        request_tx: Sender<RenderRequest>,
        response_rx: Receiver<RenderResponse>,
    ) -> Self {
        Self {
            request_tx,
            response_rx,
            next_request_id: 1,
            in_flight: None,
            pending: None,
            params: None,
            last_requested: None,
            surface_size: None,
            page_count: 0,
        }
    }

    /// Block until the worker reports the opened document, with a deadline.
    ///
    /// A timeout means the engine never came up; a worker-side open failure
    /// is fatal to startup.
    pub fn wait_ready(&mut self, timeout: Duration) -> Result<DocumentInfo, ViewerError> {
        match self.response_rx.recv_timeout(timeout) {
            Ok(RenderResponse::DocumentInfo { page_count, title }) => {
                self.page_count = page_count;
                Ok(DocumentInfo { page_count, title })
            }
            Ok(RenderResponse::OpenFailed { error }) => {
                Err(ViewerError::DocumentLoad(error.to_string()))
            }
            Ok(other) => Err(ViewerError::DocumentLoad(format!(
                "unexpected engine response before open: {other:?}"
            ))),
            Err(_) => Err(ViewerError::EngineUnavailable {
                waited_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// Total pages of the open document.
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Request a render. The caller guarantees the page index is valid.
    ///
    /// If a render is already in flight the page lands in the pending slot,
    /// overwriting whatever was there; no second render starts until the
    /// active one completes.
    pub fn request_render(&mut self, page: usize, params: RenderParams) {
        self.params = Some(params);
        self.last_requested = Some(page);

        if self.in_flight.is_some() {
            self.pending = Some(page);
            return;
        }

        self.start_render(page, params);
    }

    /// Re-render whatever was last requested (after a resize). No-op before
    /// the first render.
    pub fn re_render(&mut self, params: RenderParams) {
        if let Some(page) = self.last_requested {
            self.request_render(page, params);
        }
    }

    /// Ask the worker to resolve a named destination.
    pub fn resolve_dest(&mut self, name: String) -> RequestId {
        let id = self.next_id();
        let _ = self.request_tx.send(RenderRequest::ResolveDest { id, name });
        id
    }

    /// Drain completed responses. When the active render finishes and a
    /// pending page exists, its render starts immediately.
    pub fn poll_responses(&mut self) -> Vec<RenderResponse> {
        let mut responses = vec![];

        while let Ok(response) = self.response_rx.try_recv() {
            match &response {
                RenderResponse::Page { id, data } => {
                    self.surface_size = Some((data.width_px, data.height_px));
                    self.finish_flight(*id);
                }
                RenderResponse::Error { id, .. } => {
                    self.finish_flight(*id);
                }
                _ => {}
            }

            responses.push(response);
        }

        responses
    }

    fn finish_flight(&mut self, id: RequestId) {
        if self.in_flight.is_some_and(|(flight_id, _)| flight_id == id) {
            self.in_flight = None;
            if let (Some(page), Some(params)) = (self.pending.take(), self.params) {
                self.start_render(page, params);
            }
        }
    }

    fn start_render(&mut self, page: usize, params: RenderParams) {
        let id = self.next_id();
        self.in_flight = Some((id, page));
        let _ = self.request_tx.send(RenderRequest::Page { id, page, params });
    }

    /// Surface-to-screen scale, derived from the current surface pixel size
    /// and the displayed size. Callers recompute after every resize.
    #[must_use]
    pub fn display_scale(&self, display_width: f32, display_height: f32) -> Option<DisplayScale> {
        let (w, h) = self.surface_size?;
        Some(DisplayScale {
            scale_x: display_width / w as f32,
            scale_y: display_height / h as f32,
            display_width,
            display_height,
        })
    }

    /// Whether a render is currently in flight.
    #[must_use]
    pub fn is_rendering(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn shutdown(&self) {
        let _ = self.request_tx.send(RenderRequest::Shutdown);
    }

    fn next_id(&mut self) -> RequestId {
        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        id
    }
}

impl Drop for RenderController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::pdf::types::RenderedPage;

    fn params() -> RenderParams {
        RenderParams {
            region_width_px: 800.0,
            region_height_px: 600.0,
            oversampling: 2.0,
            pixel_ratio: 1.0,
        }
    }

    fn harness() -> (RenderController, Receiver<RenderRequest>, Sender<RenderResponse>) {
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();
        (
            RenderController::connect(request_tx, response_rx),
            request_rx,
            response_tx,
        )
    }

    fn page_data(page: usize) -> Arc<RenderedPage> {
        Arc::new(RenderedPage {
            page,
            pixels: vec![0; 12],
            width_px: 2,
            height_px: 2,
            scale_factor: 1.0,
            regions: vec![],
        })
    }

    fn sent_page(rx: &Receiver<RenderRequest>) -> (RequestId, usize) {
        match rx.try_recv().expect("expected a render request") {
            RenderRequest::Page { id, page, .. } => (id, page),
            other => panic!("unexpected request: {other:?}"),
        }
    }

    #[test]
    fn burst_collapses_to_first_and_last() {
        let (mut ctl, request_rx, response_tx) = harness();

        ctl.request_render(1, params());
        let (id1, page1) = sent_page(&request_rx);
        assert_eq!(page1, 1);

        // Burst while page 1 is in flight: 2 and 3 are overwritten by 4.
        ctl.request_render(2, params());
        ctl.request_render(3, params());
        ctl.request_render(4, params());
        assert!(request_rx.try_recv().is_err());

        response_tx
            .send(RenderResponse::Page {
                id: id1,
                data: page_data(1),
            })
            .unwrap();
        let responses = ctl.poll_responses();
        assert_eq!(responses.len(), 1);

        // Pending slot consumed: exactly one follow-up render, for page 4.
        let (_, page) = sent_page(&request_rx);
        assert_eq!(page, 4);
        assert!(request_rx.try_recv().is_err());
    }

    #[test]
    fn idle_request_starts_immediately() {
        let (mut ctl, request_rx, _response_tx) = harness();

        ctl.request_render(7, params());
        let (_, page) = sent_page(&request_rx);
        assert_eq!(page, 7);
        assert!(ctl.is_rendering());
    }

    #[test]
    fn error_response_releases_the_flight() {
        let (mut ctl, request_rx, response_tx) = harness();

        ctl.request_render(1, params());
        let (id1, _) = sent_page(&request_rx);
        ctl.request_render(2, params());

        response_tx
            .send(RenderResponse::Error {
                id: id1,
                page: 1,
                error: crate::pdf::WorkerFault::generic("bad page"),
            })
            .unwrap();
        ctl.poll_responses();

        let (_, page) = sent_page(&request_rx);
        assert_eq!(page, 2);
    }

    #[test]
    fn re_render_is_noop_before_first_render() {
        let (mut ctl, request_rx, _response_tx) = harness();
        ctl.re_render(params());
        assert!(request_rx.try_recv().is_err());
    }

    #[test]
    fn display_scale_derives_from_surface_size() {
        let (mut ctl, request_rx, response_tx) = harness();
        assert!(ctl.display_scale(100.0, 100.0).is_none());

        ctl.request_render(1, params());
        let (id, _) = sent_page(&request_rx);
        response_tx
            .send(RenderResponse::Page {
                id,
                data: Arc::new(RenderedPage {
                    page: 1,
                    pixels: vec![0; 400 * 200 * 3],
                    width_px: 400,
                    height_px: 200,
                    scale_factor: 1.0,
                    regions: vec![],
                }),
            })
            .unwrap();
        ctl.poll_responses();

        let scale = ctl.display_scale(200.0, 100.0).unwrap();
        assert!((scale.scale_x - 0.5).abs() < f32::EPSILON);
        assert!((scale.scale_y - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn wait_ready_times_out_as_engine_unavailable() {
        let (mut ctl, _request_rx, _response_tx) = harness();
        let err = ctl.wait_ready(Duration::from_millis(10)).unwrap_err();
        assert!(matches!(err, ViewerError::EngineUnavailable { .. }));
    }

    #[test]
    fn wait_ready_reports_document_info() {
        let (mut ctl, _request_rx, response_tx) = harness();
        response_tx
            .send(RenderResponse::DocumentInfo {
                page_count: 12,
                title: Some("Deck".into()),
            })
            .unwrap();

        let info = ctl.wait_ready(Duration::from_millis(100)).unwrap();
        assert_eq!(info.page_count, 12);
        assert_eq!(ctl.page_count(), 12);
    }
}
