//! External collaborator interfaces: the page driver and the capture process.
//!
//! The engine never owns a browser or an encoder. Callers inject
//! implementations of these traits; "not found" style outcomes come back as
//! values, and `Err` is reserved for transport-level failures (driver
//! disconnected, capture process unreachable).

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use image::RgbaImage;

use crate::error::Result;
use crate::geometry::{ElementBounds, Viewport};

/// Outcome of resolving a selector to page-relative bounds.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundsLookup {
    Found(ElementBounds),
    /// No element matched the selector.
    NotFound,
    /// Element matched but has no layout box (hidden, detached).
    NoBoundingBox,
}

/// Asynchronous handle on a live page.
///
/// All calls are round-trips; callers must await each in sequence before
/// issuing the next (the scroll position is a single global resource).
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Evaluate a script in the page and return its JSON value.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    /// Resolve a CSS selector to page-relative bounds.
    async fn element_bounds(&self, selector: &str) -> Result<BoundsLookup>;

    /// Snapshot the viewport size and current scroll offsets.
    async fn viewport(&self) -> Result<Viewport>;

    /// Jump to a scroll position immediately.
    async fn scroll_to(&self, y: f64) -> Result<()>;

    /// Animate to a scroll position; resolves when the animation finishes.
    async fn smooth_scroll_to(&self, y: f64, duration: Duration) -> Result<()>;

    /// Capture the current viewport as an RGBA frame.
    async fn screenshot(&self) -> Result<RgbaImage>;
}

/// Response from the capture process for a start or stop request.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureResponse {
    pub ok: bool,
    pub message: Option<String>,
}

impl CaptureResponse {
    pub fn ok() -> Self {
        Self {
            ok: true,
            message: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: Some(message.into()),
        }
    }
}

/// Handle on the external screen-capture process.
#[async_trait]
pub trait CaptureProcess: Send + Sync {
    async fn start(&self, output_path: &Path, fps: u32) -> CaptureResponse;

    async fn stop(&self) -> CaptureResponse;

    /// Whether a capture is currently running.
    async fn is_active(&self) -> bool;
}
