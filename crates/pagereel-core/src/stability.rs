//! Animation stability detection via frame differencing.
//!
//! A page is "settled" once N consecutive screenshot samples differ by less
//! than a threshold. The debounce over several quiet samples is deliberate:
//! a single low-diff sample can be a partial repaint, not the end of motion.

use std::future::Future;
use std::time::Duration;

use image::RgbaImage;
use tracing::debug;

use crate::error::Result;
use crate::poll::Budget;

/// Per-channel difference below this is compression/anti-aliasing noise.
const CHANNEL_NOISE_FLOOR: u8 = 10;

/// A rectangular sub-region of a frame, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// Fraction of pixels (0.0 to 1.0) whose RGB channels changed beyond the
/// noise floor between two frames.
pub fn frame_diff(a: &RgbaImage, b: &RgbaImage) -> f64 {
    frame_diff_region(a, b, None, &[])
}

/// Frame diff restricted to `region` (when given) with `exclude` sub-regions
/// masked out, e.g. a moving cursor overlay. Excluded pixels count as
/// unchanged. Exclusion coordinates are frame-relative, not region-relative.
pub fn frame_diff_region(
    a: &RgbaImage,
    b: &RgbaImage,
    region: Option<Region>,
    exclude: &[Region],
) -> f64 {
    let resized;
    let b = if a.dimensions() == b.dimensions() {
        b
    } else {
        resized = image::imageops::resize(
            b,
            a.width(),
            a.height(),
            image::imageops::FilterType::Triangle,
        );
        &resized
    };

    let (x0, y0, w, h) = match region {
        Some(r) => {
            let x0 = r.x.min(a.width());
            let y0 = r.y.min(a.height());
            let w = r.width.min(a.width() - x0);
            let h = r.height.min(a.height() - y0);
            (x0, y0, w, h)
        }
        None => (0, 0, a.width(), a.height()),
    };

    let total = u64::from(w) * u64::from(h);
    if total == 0 {
        return 0.0;
    }

    let mut changed: u64 = 0;
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            if exclude.iter().any(|r| r.contains(x, y)) {
                continue;
            }
            let pa = a.get_pixel(x, y);
            let pb = b.get_pixel(x, y);
            let moved = pa.0[..3]
                .iter()
                .zip(&pb.0[..3])
                .any(|(ca, cb)| ca.abs_diff(*cb) > CHANNEL_NOISE_FLOOR);
            if moved {
                changed += 1;
            }
        }
    }

    changed as f64 / total as f64
}

/// How the stability sampler decides the page has settled.
#[derive(Debug, Clone)]
pub struct StabilitySettings {
    /// Frame-diff fraction below which a sample counts as quiet.
    pub threshold: f64,
    /// Give up after this long.
    pub timeout: Duration,
    /// Delay between samples.
    pub poll_interval: Duration,
    /// Consecutive quiet samples required before declaring stability.
    pub required_stable_samples: u32,
    /// Sub-regions to ignore in every comparison.
    pub exclude_regions: Vec<Region>,
}

impl Default for StabilitySettings {
    fn default() -> Self {
        Self {
            threshold: 0.03,
            timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(100),
            required_stable_samples: 3,
            exclude_regions: Vec::new(),
        }
    }
}

/// Sample frames until the page stops visibly changing.
///
/// Returns `Ok(true)` as soon as the required number of consecutive quiet
/// samples is reached, `Ok(false)` if the timeout elapses first. Screenshot
/// failures propagate; "still animating" never does.
pub async fn wait_for_stable<F, Fut>(mut take_screenshot: F, settings: &StabilitySettings) -> Result<bool>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<RgbaImage>>,
{
    let mut prev = take_screenshot().await?;
    let mut stable: u32 = 0;
    let mut budget = Budget::timed(settings.timeout, settings.poll_interval);

    while budget.next().await {
        let current = take_screenshot().await?;
        let diff = frame_diff_region(&prev, &current, None, &settings.exclude_regions);
        if diff < settings.threshold {
            stable += 1;
            if stable >= settings.required_stable_samples {
                debug!(samples = budget.steps(), "Page settled");
                return Ok(true);
            }
        } else {
            stable = 0;
        }
        prev = current;
    }

    debug!(samples = budget.steps(), "Stability wait timed out");
    Ok(false)
}

/// Snapshot of an `AnimationWatcher`'s running statistics.
#[derive(Debug, Clone, serde::Serialize)]
pub struct WatcherStats {
    pub frames_checked: u32,
    pub stable_count: u32,
    pub average_diff: f64,
    pub max_diff: f64,
    pub is_stable: bool,
    pub threshold: f64,
    pub required_stable_samples: u32,
}

/// Stateful stability checker exposing running statistics.
///
/// Same stop condition as `wait_for_stable`, but fed one frame at a time so
/// callers and tests can inspect the diff history.
pub struct AnimationWatcher {
    threshold: f64,
    required_stable_samples: u32,
    exclude_regions: Vec<Region>,
    prev_frame: Option<RgbaImage>,
    stable_count: u32,
    frame_count: u32,
    diff_history: Vec<f64>,
}

impl AnimationWatcher {
    pub fn new(threshold: f64, required_stable_samples: u32) -> Self {
        Self {
            threshold,
            required_stable_samples,
            exclude_regions: Vec::new(),
            prev_frame: None,
            stable_count: 0,
            frame_count: 0,
            diff_history: Vec::new(),
        }
    }

    pub fn with_exclude_regions(mut self, regions: Vec<Region>) -> Self {
        self.exclude_regions = regions;
        self
    }

    /// Discard all accumulated state.
    pub fn reset(&mut self) {
        self.prev_frame = None;
        self.stable_count = 0;
        self.frame_count = 0;
        self.diff_history.clear();
    }

    /// Feed one frame; returns true once enough consecutive quiet samples
    /// have been seen. The first frame only primes the comparison.
    pub fn check_frame(&mut self, frame: RgbaImage) -> bool {
        self.frame_count += 1;

        let prev = match self.prev_frame.take() {
            Some(prev) => prev,
            None => {
                self.prev_frame = Some(frame);
                return false;
            }
        };

        let diff = frame_diff_region(&prev, &frame, None, &self.exclude_regions);
        self.diff_history.push(diff);
        if diff < self.threshold {
            self.stable_count += 1;
        } else {
            self.stable_count = 0;
        }
        self.prev_frame = Some(frame);

        self.is_stable()
    }

    pub fn is_stable(&self) -> bool {
        self.stable_count >= self.required_stable_samples
    }

    pub fn frames_checked(&self) -> u32 {
        self.frame_count
    }

    pub fn stable_count(&self) -> u32 {
        self.stable_count
    }

    pub fn average_diff(&self) -> f64 {
        if self.diff_history.is_empty() {
            return 0.0;
        }
        self.diff_history.iter().sum::<f64>() / self.diff_history.len() as f64
    }

    pub fn max_diff(&self) -> f64 {
        self.diff_history.iter().copied().fold(0.0, f64::max)
    }

    pub fn stats(&self) -> WatcherStats {
        WatcherStats {
            frames_checked: self.frame_count,
            stable_count: self.stable_count,
            average_diff: self.average_diff(),
            max_diff: self.max_diff(),
            is_stable: self.is_stable(),
            threshold: self.threshold,
            required_stable_samples: self.required_stable_samples,
        }
    }
}
