//! Value types shared across the framing engine.
//!
//! Everything here is a plain snapshot: bounds and viewports are produced
//! fresh per driver query and never mutated in place.

use serde::{Deserialize, Serialize};

/// Bounding box for a page element, page-relative, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementBounds {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl ElementBounds {
    pub fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    /// Y coordinate of the element center.
    pub fn center_y(&self) -> f64 {
        self.top + self.height / 2.0
    }

    /// X coordinate of the element center.
    pub fn center_x(&self) -> f64 {
        self.left + self.width / 2.0
    }

    /// Y coordinate of the bottom edge.
    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// X coordinate of the right edge.
    pub fn right(&self) -> f64 {
        self.left + self.width
    }
}

/// Snapshot of the live viewport at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub scroll_x: f64,
    #[serde(default)]
    pub scroll_y: f64,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            scroll_x: 0.0,
            scroll_y: 0.0,
        }
    }

    pub fn with_scroll(mut self, scroll_x: f64, scroll_y: f64) -> Self {
        self.scroll_x = scroll_x;
        self.scroll_y = scroll_y;
        self
    }

    /// Top Y coordinate of the visible area.
    pub fn visible_top(&self) -> f64 {
        self.scroll_y
    }

    /// Bottom Y coordinate of the visible area.
    pub fn visible_bottom(&self) -> f64 {
        self.scroll_y + self.height as f64
    }

    /// Center Y coordinate of the visible area.
    pub fn visible_center_y(&self) -> f64 {
        self.scroll_y + self.height as f64 / 2.0
    }
}

/// How an element should sit in the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Alignment {
    /// Element header at the top of the viewport.
    Top,
    /// Element centered vertically.
    Center,
    /// Element at the bottom of the viewport.
    Bottom,
    /// Entire element visible; falls back to top when it cannot fit.
    FullyVisible,
}

impl std::str::FromStr for Alignment {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "top" => Ok(Alignment::Top),
            "center" => Ok(Alignment::Center),
            "bottom" => Ok(Alignment::Bottom),
            "fully_visible" | "fully-visible" => Ok(Alignment::FullyVisible),
            other => Err(crate::error::Error::Config(format!(
                "unknown alignment: {other}"
            ))),
        }
    }
}

/// Declarative policy for framing one element.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FramingRule {
    pub alignment: Alignment,
    #[serde(default = "default_padding")]
    pub padding_top: f64,
    #[serde(default = "default_padding")]
    pub padding_bottom: f64,
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

fn default_padding() -> f64 {
    50.0
}

fn default_tolerance() -> f64 {
    30.0
}

impl FramingRule {
    pub fn new(alignment: Alignment) -> Self {
        Self {
            alignment,
            padding_top: default_padding(),
            padding_bottom: default_padding(),
            tolerance: default_tolerance(),
        }
    }

    pub fn with_padding_top(mut self, padding: f64) -> Self {
        self.padding_top = padding;
        self
    }

    pub fn with_padding_bottom(mut self, padding: f64) -> Self {
        self.padding_bottom = padding;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }
}

/// A semantically classified page region, produced once per detection pass.
///
/// `scroll_position` always equals `bounds.top`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub section_type: String,
    pub bounds: ElementBounds,
    pub scroll_position: f64,
}

/// A named target scroll position with timing metadata.
///
/// Waypoints are the contract between generation and execution; the
/// recorder never re-derives them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub name: String,
    /// Target scroll Y, always >= 0.
    pub position: f64,
    /// Dwell at this position, in seconds.
    #[serde(default = "default_pause")]
    pub pause: f64,
    /// Time to scroll TO this position, in seconds.
    #[serde(default = "default_scroll_duration")]
    pub scroll_duration: f64,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framing_rule: Option<FramingRule>,
}

fn default_pause() -> f64 {
    2.0
}

fn default_scroll_duration() -> f64 {
    2.0
}

impl Waypoint {
    pub fn new(name: impl Into<String>, position: f64) -> Self {
        Self {
            name: name.into(),
            position: position.max(0.0),
            pause: default_pause(),
            scroll_duration: default_scroll_duration(),
            description: String::new(),
            framing_rule: None,
        }
    }
}

/// Outcome of one auto-scroll correction attempt.
///
/// When `success` is false, `error` always carries a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollResult {
    pub success: bool,
    pub final_position: f64,
    /// Number of scroll adjustments performed.
    pub iterations: u32,
    /// Trail of (position before, signed delta) pairs, for diagnostics.
    pub adjustments: Vec<(f64, f64)>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScrollResult {
    pub fn converged(final_position: f64, adjustments: Vec<(f64, f64)>) -> Self {
        Self {
            success: true,
            final_position,
            iterations: adjustments.len() as u32,
            adjustments,
            error: None,
        }
    }

    pub fn failed(
        final_position: f64,
        adjustments: Vec<(f64, f64)>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            final_position,
            iterations: adjustments.len() as u32,
            adjustments,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_derived_coordinates() {
        let b = ElementBounds::new(100.0, 20.0, 300.0, 400.0);
        assert_eq!(b.center_y(), b.top + b.height / 2.0);
        assert_eq!(b.center_x(), 170.0);
        assert_eq!(b.bottom(), b.top + b.height);
        assert_eq!(b.right(), 320.0);
    }

    #[test]
    fn test_viewport_visible_area() {
        let v = Viewport::new(1280, 800).with_scroll(0.0, 250.0);
        assert_eq!(v.visible_top(), 250.0);
        assert_eq!(v.visible_bottom(), 1050.0);
        assert_eq!(v.visible_center_y(), 650.0);
    }

    #[test]
    fn test_waypoint_position_clamped() {
        let wp = Waypoint::new("hero", -40.0);
        assert_eq!(wp.position, 0.0);
    }

    #[test]
    fn test_failed_scroll_result_has_error() {
        let r = ScrollResult::failed(120.0, vec![(0.0, 120.0)], "max iterations reached");
        assert!(!r.success);
        assert_eq!(r.iterations, 1);
        assert!(r.error.as_deref().unwrap().contains("max iterations"));
    }

    #[test]
    fn test_alignment_from_str() {
        assert_eq!("top".parse::<Alignment>().unwrap(), Alignment::Top);
        assert_eq!(
            "Fully_Visible".parse::<Alignment>().unwrap(),
            Alignment::FullyVisible
        );
        assert!("diagonal".parse::<Alignment>().is_err());
    }

    #[test]
    fn test_alignment_serde_snake_case() {
        let json = serde_json::to_string(&Alignment::FullyVisible).unwrap();
        assert_eq!(json, "\"fully_visible\"");
        let back: Alignment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Alignment::FullyVisible);
    }
}
