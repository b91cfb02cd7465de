//! Test doubles for the driver and capture traits.

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use image::{Rgba, RgbaImage};

use crate::driver::{BoundsLookup, CaptureProcess, CaptureResponse, PageDriver};
use crate::error::{Error, Result};
use crate::geometry::Viewport;

#[derive(Default)]
struct PageState {
    scroll_y: f64,
    frozen: bool,
    scan_result: serde_json::Value,
    bounds: HashMap<String, BoundsLookup>,
    frames: VecDeque<RgbaImage>,
    scroll_log: Vec<f64>,
    fail_screenshot: bool,
}

/// In-memory page: scrolls land exactly where requested (clamped to the
/// page height) unless frozen, in which case the position never moves.
pub struct MockPage {
    max_scroll: f64,
    state: Mutex<PageState>,
}

impl MockPage {
    pub fn new(max_scroll: f64) -> Arc<Self> {
        Arc::new(Self {
            max_scroll,
            state: Mutex::new(PageState {
                scan_result: serde_json::Value::Array(Vec::new()),
                ..PageState::default()
            }),
        })
    }

    /// Value the next `evaluate` call returns.
    pub fn set_scan_result(&self, value: serde_json::Value) {
        self.state.lock().unwrap().scan_result = value;
    }

    pub fn set_bounds(&self, selector: &str, lookup: BoundsLookup) {
        self.state
            .lock()
            .unwrap()
            .bounds
            .insert(selector.to_string(), lookup);
    }

    pub fn set_scroll(&self, y: f64) {
        self.state.lock().unwrap().scroll_y = y;
    }

    /// Make all subsequent scrolls no-ops, as if the page ignored them.
    pub fn freeze_scroll(&self) {
        self.state.lock().unwrap().frozen = true;
    }

    /// Queue a frame for the next `screenshot` call. When the queue is
    /// empty, screenshots return a constant gray frame.
    pub fn push_frame(&self, frame: RgbaImage) {
        self.state.lock().unwrap().frames.push_back(frame);
    }

    pub fn fail_screenshots(&self) {
        self.state.lock().unwrap().fail_screenshot = true;
    }

    /// Scroll targets requested so far, in order.
    pub fn scroll_log(&self) -> Vec<f64> {
        self.state.lock().unwrap().scroll_log.clone()
    }

    pub fn scroll_position(&self) -> f64 {
        self.state.lock().unwrap().scroll_y
    }

    fn apply_scroll(&self, y: f64) {
        let mut state = self.state.lock().unwrap();
        state.scroll_log.push(y);
        if !state.frozen {
            state.scroll_y = y.clamp(0.0, self.max_scroll);
        }
    }
}

#[async_trait]
impl PageDriver for MockPage {
    async fn evaluate(&self, _script: &str) -> Result<serde_json::Value> {
        Ok(self.state.lock().unwrap().scan_result.clone())
    }

    async fn element_bounds(&self, selector: &str) -> Result<BoundsLookup> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .bounds
            .get(selector)
            .cloned()
            .unwrap_or(BoundsLookup::NotFound))
    }

    async fn viewport(&self) -> Result<Viewport> {
        let state = self.state.lock().unwrap();
        Ok(Viewport::new(1280, 800).with_scroll(0.0, state.scroll_y))
    }

    async fn scroll_to(&self, y: f64) -> Result<()> {
        self.apply_scroll(y);
        Ok(())
    }

    async fn smooth_scroll_to(&self, y: f64, _duration: Duration) -> Result<()> {
        self.apply_scroll(y);
        Ok(())
    }

    async fn screenshot(&self) -> Result<RgbaImage> {
        let mut state = self.state.lock().unwrap();
        if state.fail_screenshot {
            return Err(Error::Driver("screenshot failed".to_string()));
        }
        Ok(state
            .frames
            .pop_front()
            .unwrap_or_else(|| RgbaImage::from_pixel(8, 8, Rgba([128, 128, 128, 255]))))
    }
}

#[derive(Default)]
struct CaptureState {
    active: bool,
    fail_start: bool,
    fail_stop: bool,
    events: Vec<String>,
}

/// Capture process double recording start/stop calls.
#[derive(Default)]
pub struct MockCapture {
    state: Mutex<CaptureState>,
}

impl MockCapture {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_start(&self) {
        self.state.lock().unwrap().fail_start = true;
    }

    pub fn fail_stop(&self) {
        self.state.lock().unwrap().fail_stop = true;
    }

    /// Start and stop calls observed so far.
    pub fn events(&self) -> Vec<String> {
        self.state.lock().unwrap().events.clone()
    }
}

#[async_trait]
impl CaptureProcess for MockCapture {
    async fn start(&self, output_path: &Path, fps: u32) -> CaptureResponse {
        let mut state = self.state.lock().unwrap();
        state
            .events
            .push(format!("start {} @{fps}", output_path.display()));
        if state.fail_start {
            return CaptureResponse::error("recorder failed to start");
        }
        state.active = true;
        CaptureResponse::ok()
    }

    async fn stop(&self) -> CaptureResponse {
        let mut state = self.state.lock().unwrap();
        state.events.push("stop".to_string());
        state.active = false;
        if state.fail_stop {
            return CaptureResponse::error("recorder failed to stop");
        }
        CaptureResponse::ok()
    }

    async fn is_active(&self) -> bool {
        self.state.lock().unwrap().active
    }
}
