//! Pagereel core: cinematically paced scroll-through recordings of web pages.
//!
//! The engine detects semantic sections on a page, plans a timed waypoint
//! itinerary with per-section framing rules, and drives an injected page
//! driver and capture process through it, correcting scroll drift and
//! waiting out animations along the way.

pub mod config;
pub mod driver;
pub mod error;
pub mod framing;
pub mod geometry;
pub mod poll;
pub mod preview;
pub mod recorder;
pub mod scroll;
pub mod sections;
pub mod stability;
pub mod waypoints;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::{AppConfig, GeneralConfig, PreviewConfig, RecordingConfig};
pub use driver::{BoundsLookup, CaptureProcess, CaptureResponse, PageDriver};
pub use error::{Error, Result};
pub use geometry::{
    Alignment, ElementBounds, FramingRule, ScrollResult, Section, Viewport, Waypoint,
};
pub use preview::{export_report, PreviewReport, ReportFormat, WaypointPreview, WaypointPreviewer};
pub use recorder::{Phase, Progress, RecordingResult, SmartRecorder, StopHandle};
pub use scroll::AutoScroller;
pub use sections::SectionDetector;
pub use stability::{frame_diff, wait_for_stable, AnimationWatcher, StabilitySettings};
pub use waypoints::{
    load_waypoints, merge_overrides, save_waypoints, GeneratorOptions, WaypointGenerator,
    WaypointOverride,
};
