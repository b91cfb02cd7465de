//! Recording orchestration: detect, plan, capture, traverse, stop.
//!
//! The recorder owns run-level policy only. Framing math, stability
//! sampling and scroll correction live in their own modules; this one
//! sequences them around an external capture process and guarantees the
//! capture is stopped no matter how the traversal ends.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::RecordingConfig;
use crate::driver::{CaptureProcess, PageDriver};
use crate::error::{Error, Result};
use crate::geometry::{Section, Waypoint};
use crate::scroll::AutoScroller;
use crate::sections::SectionDetector;
use crate::stability::{wait_for_stable, StabilitySettings};
use crate::waypoints::{merge_overrides, GeneratorOptions, WaypointGenerator, WaypointOverride};

/// Where the recorder currently is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    DetectSections,
    GenerateWaypoints,
    StartCapture,
    Scroll,
    WaitForAnimations,
    VerifyFraming,
    Dwell,
    StopCapture,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Phase::DetectSections => "detect_sections",
            Phase::GenerateWaypoints => "generate_waypoints",
            Phase::StartCapture => "start_capture",
            Phase::Scroll => "scroll",
            Phase::WaitForAnimations => "wait_for_animations",
            Phase::VerifyFraming => "verify_framing",
            Phase::Dwell => "dwell",
            Phase::StopCapture => "stop_capture",
        };
        f.write_str(name)
    }
}

/// Progress snapshot pushed to the caller between phases.
#[derive(Debug, Clone, Serialize)]
pub struct Progress {
    pub phase: Phase,
    /// Zero-based index of the current waypoint, when inside the traversal.
    pub waypoint_index: Option<usize>,
    pub total_waypoints: usize,
    pub waypoint_name: String,
    pub message: String,
}

pub type ProgressCallback = Box<dyn Fn(&Progress) + Send + Sync>;

/// Outcome of one recording run.
///
/// `success` requires a clean capture stop, a full traversal and an empty
/// error list; `output_path` is only set on success.
#[derive(Debug, Clone, Serialize)]
pub struct RecordingResult {
    pub success: bool,
    pub output_path: Option<PathBuf>,
    /// Wall-clock seconds for the whole run.
    pub duration: f64,
    pub waypoints_visited: usize,
    pub sections_detected: usize,
    pub framing_corrections: u32,
    pub animation_waits: u32,
    pub errors: Vec<String>,
}

/// Drives a full scroll-through recording over an injected page driver and
/// capture process.
pub struct SmartRecorder {
    driver: Arc<dyn PageDriver>,
    capture: Arc<dyn CaptureProcess>,
    config: RecordingConfig,
    detector: SectionDetector,
    generator: WaypointGenerator,
    waypoints: Vec<Waypoint>,
    overrides: Vec<WaypointOverride>,
    sections: Vec<Section>,
    progress: Option<ProgressCallback>,
    cancelled: Arc<AtomicBool>,
}

/// Cooperative cancellation handle for a running recording.
#[derive(Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    /// Ask the recorder to stop after its current waypoint phase. The
    /// capture is still stopped cleanly.
    pub fn stop(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }
}

impl SmartRecorder {
    pub fn new(
        driver: Arc<dyn PageDriver>,
        capture: Arc<dyn CaptureProcess>,
        config: RecordingConfig,
    ) -> Self {
        let detector = SectionDetector::new(driver.clone());
        let generator = WaypointGenerator::new(driver.clone());
        Self {
            driver,
            capture,
            config,
            detector,
            generator,
            waypoints: Vec::new(),
            overrides: Vec::new(),
            sections: Vec::new(),
            progress: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_progress_callback(&mut self, callback: ProgressCallback) {
        self.progress = Some(callback);
    }

    /// Queue an override applied at waypoint generation time.
    pub fn add_override(&mut self, ov: WaypointOverride) {
        self.overrides.push(ov);
    }

    pub fn clear_overrides(&mut self) {
        self.overrides.clear();
    }

    /// Replace the itinerary, bypassing generation entirely.
    pub fn set_waypoints(&mut self, waypoints: Vec<Waypoint>) {
        self.waypoints = waypoints;
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Handle another task can use to stop the traversal early.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            flag: self.cancelled.clone(),
        }
    }

    /// Scan the page and cache the detected sections.
    pub async fn detect_sections(&mut self) -> Result<&[Section]> {
        self.sections = self.detector.find_sections().await?;
        info!(count = self.sections.len(), "Detected sections");
        Ok(&self.sections)
    }

    /// Build the itinerary from cached sections, applying the configured
    /// multipliers and any queued overrides.
    pub async fn generate_waypoints(&mut self) -> Result<&[Waypoint]> {
        let viewport = self.driver.viewport().await?;
        let options = GeneratorOptions {
            include_return_to_top: self.config.include_return_to_top,
            min_section_height: self.config.min_section_height,
        };
        let mut waypoints =
            self.generator
                .waypoints_from_sections(&self.sections, &viewport, &options);

        for wp in &mut waypoints {
            wp.pause *= self.config.pause_multiplier;
            wp.scroll_duration *= self.config.scroll_duration_multiplier;
        }

        self.waypoints = merge_overrides(waypoints, &self.overrides);
        if self.waypoints.is_empty() {
            return Err(Error::NoWaypoints);
        }
        info!(count = self.waypoints.len(), "Waypoint itinerary ready");
        Ok(&self.waypoints)
    }

    /// Run the full recording. Errors are accumulated in the result; the
    /// capture process is always stopped once it has started.
    pub async fn record(&mut self) -> RecordingResult {
        let started = Instant::now();
        self.cancelled.store(false, Ordering::Relaxed);
        let mut errors = Vec::new();
        let mut framing_corrections = 0u32;
        let mut animation_waits = 0u32;

        self.report(Phase::DetectSections, None, "", "Scanning page sections");
        if let Err(e) = self.detect_sections().await {
            errors.push(format!("section detection failed: {e}"));
        }

        if self.waypoints.is_empty() {
            self.report(
                Phase::GenerateWaypoints,
                None,
                "",
                "Generating waypoint itinerary",
            );
            if let Err(e) = self.generate_waypoints().await {
                errors.push(format!("waypoint generation failed: {e}"));
                return self.result(started, 0, framing_corrections, animation_waits, errors);
            }
        }

        self.report(Phase::StartCapture, None, "", "Starting capture");
        let start = self
            .capture
            .start(&self.config.output_path, self.config.fps)
            .await;
        if !start.ok {
            errors.push(format!(
                "capture start failed: {}",
                start.message.unwrap_or_default()
            ));
            return self.result(started, 0, framing_corrections, animation_waits, errors);
        }

        let visited = self
            .visit_waypoints(&mut errors, &mut framing_corrections, &mut animation_waits)
            .await;

        self.report(Phase::StopCapture, None, "", "Stopping capture");
        let stop = self.capture.stop().await;
        if !stop.ok {
            errors.push(format!(
                "capture stop failed: {}",
                stop.message.unwrap_or_default()
            ));
        }

        self.result(started, visited, framing_corrections, animation_waits, errors)
    }

    async fn visit_waypoints(
        &mut self,
        errors: &mut Vec<String>,
        framing_corrections: &mut u32,
        animation_waits: &mut u32,
    ) -> usize {
        let waypoints = self.waypoints.clone();
        let scroller = AutoScroller::new(self.driver.clone())
            .with_max_iterations(self.config.max_framing_retries)
            .with_scroll_duration(Duration::from_millis(300));
        let stability = StabilitySettings {
            threshold: self.config.animation_threshold,
            timeout: Duration::from_secs_f64(self.config.animation_timeout),
            ..Default::default()
        };

        let mut visited = 0;
        for (index, wp) in waypoints.iter().enumerate() {
            if self.cancelled.load(Ordering::Relaxed) {
                info!(visited, "Recording cancelled");
                break;
            }
            debug!(index, name = %wp.name, position = wp.position, "Visiting waypoint");

            self.report(Phase::Scroll, Some(index), &wp.name, &wp.description);
            let duration = Duration::from_secs_f64(wp.scroll_duration.max(0.0));
            if let Err(e) = self.driver.smooth_scroll_to(wp.position, duration).await {
                errors.push(format!("scroll to '{}' failed: {e}", wp.name));
                break;
            }
            tokio::time::sleep(Duration::from_millis(self.config.scroll_settle_ms)).await;

            self.report(
                Phase::WaitForAnimations,
                Some(index),
                &wp.name,
                "Waiting for animations to settle",
            );
            let driver = self.driver.clone();
            match wait_for_stable(|| {
                let driver = driver.clone();
                async move { driver.screenshot().await }
            }, &stability)
            .await
            {
                Ok(settled) => {
                    *animation_waits += 1;
                    if !settled {
                        warn!(name = %wp.name, "Animations still running, recording anyway");
                    }
                }
                Err(e) => {
                    errors.push(format!("stability check at '{}' failed: {e}", wp.name));
                    break;
                }
            }

            if self.config.verify_framing {
                if let Some(rule) = wp.framing_rule {
                    self.report(
                        Phase::VerifyFraming,
                        Some(index),
                        &wp.name,
                        "Verifying framing",
                    );
                    match scroller.scroll_to_position(wp.position, rule.tolerance).await {
                        Ok(result) => {
                            *framing_corrections += result.iterations;
                            if !result.success {
                                warn!(
                                    name = %wp.name,
                                    final_position = result.final_position,
                                    "Framing not corrected within retry budget"
                                );
                            }
                        }
                        Err(e) => {
                            errors.push(format!("framing check at '{}' failed: {e}", wp.name));
                            break;
                        }
                    }
                }
            }

            self.report(Phase::Dwell, Some(index), &wp.name, "Holding position");
            tokio::time::sleep(Duration::from_secs_f64(wp.pause.max(0.0))).await;
            visited += 1;
        }
        visited
    }

    fn result(
        &self,
        started: Instant,
        visited: usize,
        framing_corrections: u32,
        animation_waits: u32,
        errors: Vec<String>,
    ) -> RecordingResult {
        let success = errors.is_empty() && visited == self.waypoints.len() && !self.waypoints.is_empty();
        RecordingResult {
            success,
            output_path: success.then(|| self.config.output_path.clone()),
            duration: started.elapsed().as_secs_f64(),
            waypoints_visited: visited,
            sections_detected: self.sections.len(),
            framing_corrections,
            animation_waits,
            errors,
        }
    }

    fn report(&self, phase: Phase, waypoint_index: Option<usize>, name: &str, message: &str) {
        if let Some(ref callback) = self.progress {
            callback(&Progress {
                phase,
                waypoint_index,
                total_waypoints: self.waypoints.len(),
                waypoint_name: name.to_string(),
                message: message.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{MockCapture, MockPage};
    use serde_json::json;
    use std::sync::Mutex;

    fn landmark(name: &str, y: f64, height: f64) -> serde_json::Value {
        json!({
            "name": name,
            "id": name,
            "classes": "",
            "headingText": "",
            "ariaLabel": "",
            "role": "",
            "tagName": "section",
            "x": 0.0,
            "y": y,
            "width": 1280.0,
            "height": height,
        })
    }

    fn fast_config() -> RecordingConfig {
        RecordingConfig {
            animation_timeout: 0.3,
            pause_multiplier: 0.01,
            scroll_duration_multiplier: 0.01,
            ..RecordingConfig::default()
        }
    }

    fn landing_page() -> Arc<MockPage> {
        let page = MockPage::new(4000.0);
        page.set_scan_result(json!([
            landmark("hero", 0.0, 600.0),
            landmark("features", 600.0, 800.0),
            landmark("pricing", 1400.0, 600.0),
            landmark("footer", 2000.0, 400.0),
        ]));
        page
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_run_succeeds() {
        let page = landing_page();
        let capture = MockCapture::new();
        let mut recorder = SmartRecorder::new(page.clone(), capture.clone(), fast_config());

        let result = recorder.record().await;

        assert!(result.success, "errors: {:?}", result.errors);
        assert_eq!(result.sections_detected, 4);
        // Four sections plus return-to-top.
        assert_eq!(result.waypoints_visited, 5);
        assert_eq!(result.animation_waits, 5);
        assert!(result.output_path.is_some());
        assert!(result.errors.is_empty());
        // Capture started before any scrolling and stopped at the end.
        let events = capture.events();
        assert!(events.first().unwrap().starts_with("start"));
        assert_eq!(events.last().unwrap(), "stop");
        assert!(!capture.is_active().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_start_failure_aborts() {
        let page = landing_page();
        let capture = MockCapture::new();
        capture.fail_start();
        let mut recorder = SmartRecorder::new(page, capture.clone(), fast_config());

        let result = recorder.record().await;

        assert!(!result.success);
        assert_eq!(result.waypoints_visited, 0);
        assert!(result.output_path.is_none());
        assert!(result.errors[0].contains("capture start failed"));
        // Never scrolled: nothing to stop.
        assert_eq!(capture.events().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_stop_failure_marks_run_failed() {
        let page = landing_page();
        let capture = MockCapture::new();
        capture.fail_stop();
        let mut recorder = SmartRecorder::new(page, capture.clone(), fast_config());

        let result = recorder.record().await;

        assert!(!result.success);
        assert_eq!(result.waypoints_visited, 5);
        assert!(result
            .errors
            .iter()
            .any(|e| e.contains("capture stop failed")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_sections_yields_no_waypoints_error() {
        let page = MockPage::new(4000.0);
        let capture = MockCapture::new();
        let mut recorder = SmartRecorder::new(page, capture.clone(), fast_config());

        let result = recorder.record().await;

        assert!(!result.success);
        assert!(result
            .errors
            .iter()
            .any(|e| e.contains("waypoint generation failed")));
        // Capture must never start without an itinerary.
        assert!(capture.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_stopped_after_mid_run_error() {
        let page = landing_page();
        let capture = MockCapture::new();
        let mut recorder = SmartRecorder::new(page.clone(), capture.clone(), fast_config());
        // Stability sampling will hit this on the first waypoint.
        page.fail_screenshots();

        let result = recorder.record().await;

        assert!(!result.success);
        assert!(result.waypoints_visited < 5);
        assert_eq!(capture.events().last().unwrap(), "stop");
        assert!(!capture.is_active().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overrides_applied_during_generation() {
        let page = landing_page();
        let capture = MockCapture::new();
        let config = RecordingConfig {
            include_return_to_top: false,
            ..fast_config()
        };
        let mut recorder = SmartRecorder::new(page, capture, config);
        recorder.add_override(WaypointOverride {
            name: "footer".to_string(),
            skip: true,
            ..Default::default()
        });

        recorder.detect_sections().await.unwrap();
        recorder.generate_waypoints().await.unwrap();

        assert_eq!(recorder.waypoints().len(), 3);
        assert!(!recorder.waypoints().iter().any(|wp| wp.name == "footer"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_multipliers_scale_timing() {
        let page = landing_page();
        let capture = MockCapture::new();
        let config = RecordingConfig {
            pause_multiplier: 2.0,
            scroll_duration_multiplier: 3.0,
            include_return_to_top: false,
            ..RecordingConfig::default()
        };
        let mut recorder = SmartRecorder::new(page, capture, config);
        recorder.detect_sections().await.unwrap();
        recorder.generate_waypoints().await.unwrap();

        for wp in recorder.waypoints() {
            assert!(wp.pause >= 2.0);
            assert!(wp.scroll_duration >= 1.5);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_handle_ends_traversal_early() {
        let page = landing_page();
        let capture = MockCapture::new();
        let mut recorder = SmartRecorder::new(page, capture.clone(), fast_config());
        let handle = recorder.stop_handle();

        let (result, _) = tokio::join!(recorder.record(), async {
            // Land inside the first waypoint's stability wait.
            tokio::time::sleep(Duration::from_millis(50)).await;
            handle.stop();
        });

        assert!(result.waypoints_visited < 5);
        // Cancellation still stops the capture cleanly.
        assert_eq!(capture.events().last().unwrap(), "stop");
        assert!(!capture.is_active().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_phases_reported_in_order() {
        let page = landing_page();
        let capture = MockCapture::new();
        let mut recorder = SmartRecorder::new(page, capture, fast_config());
        let phases: Arc<Mutex<Vec<Phase>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = phases.clone();
        recorder.set_progress_callback(Box::new(move |p| {
            sink.lock().unwrap().push(p.phase);
        }));

        let result = recorder.record().await;
        assert!(result.success);

        let phases = phases.lock().unwrap();
        assert_eq!(phases[0], Phase::DetectSections);
        assert_eq!(phases[1], Phase::GenerateWaypoints);
        assert_eq!(phases[2], Phase::StartCapture);
        assert_eq!(*phases.last().unwrap(), Phase::StopCapture);
        assert!(phases.contains(&Phase::WaitForAnimations));
        assert!(phases.contains(&Phase::Dwell));
    }
}
