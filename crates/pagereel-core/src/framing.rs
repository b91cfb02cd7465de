//! Pure framing math: optimal scroll positions and tolerance checks.
//!
//! Nothing in this module touches the page; everything is a function of the
//! bounds, viewport and rule passed in.

use crate::geometry::{Alignment, ElementBounds, FramingRule, Viewport};

/// Scroll Y that satisfies the rule's alignment for the given element.
pub fn optimal_scroll(bounds: &ElementBounds, viewport: &Viewport, rule: &FramingRule) -> f64 {
    match rule.alignment {
        Alignment::Top => bounds.top - rule.padding_top,
        Alignment::Center => bounds.center_y() - viewport.height as f64 / 2.0,
        Alignment::Bottom => bounds.bottom() - viewport.height as f64 + rule.padding_bottom,
        Alignment::FullyVisible => {
            let fits =
                bounds.height <= viewport.height as f64 - rule.padding_top - rule.padding_bottom;
            if fits {
                // Center when the whole element fits.
                bounds.center_y() - viewport.height as f64 / 2.0
            } else {
                // Too tall to fit: show the top edge.
                bounds.top - rule.padding_top
            }
        }
    }
}

/// Whether the current scroll position frames the element within tolerance.
pub fn is_properly_framed(bounds: &ElementBounds, viewport: &Viewport, rule: &FramingRule) -> bool {
    (viewport.scroll_y - optimal_scroll(bounds, viewport, rule)).abs() <= rule.tolerance
}

/// Signed scroll delta to reach the optimal position; positive scrolls down.
pub fn scroll_adjustment(bounds: &ElementBounds, viewport: &Viewport, rule: &FramingRule) -> f64 {
    optimal_scroll(bounds, viewport, rule) - viewport.scroll_y
}

/// Whether the element is entirely inside the visible area.
pub fn is_fully_visible(bounds: &ElementBounds, viewport: &Viewport) -> bool {
    bounds.top >= viewport.visible_top() && bounds.bottom() <= viewport.visible_bottom()
}

/// Whether the element center sits within `tolerance` of the viewport center.
pub fn is_centered(bounds: &ElementBounds, viewport: &Viewport, tolerance: f64) -> bool {
    (bounds.center_y() - viewport.visible_center_y()).abs() <= tolerance
}

/// Default framing rule for a section type, case-insensitive, falling back
/// to a centered rule for unknown types.
pub fn rule_for_section_type(section_type: &str) -> FramingRule {
    match section_type.to_ascii_lowercase().as_str() {
        "hero" => FramingRule::new(Alignment::Top).with_padding_top(0.0),
        "features" => FramingRule::new(Alignment::Top).with_padding_top(50.0),
        "pricing" => FramingRule::new(Alignment::Top).with_padding_top(50.0),
        "faq" => FramingRule::new(Alignment::Top).with_padding_top(30.0),
        "cta" => FramingRule::new(Alignment::Center),
        "footer" => FramingRule::new(Alignment::Bottom).with_padding_bottom(0.0),
        _ => FramingRule::new(Alignment::Center),
    }
}

/// Preset rules for common hand-tuned cases.
pub mod presets {
    use super::*;

    pub fn header_at_top() -> FramingRule {
        FramingRule::new(Alignment::Top)
            .with_padding_top(0.0)
            .with_tolerance(20.0)
    }

    pub fn header_with_padding() -> FramingRule {
        FramingRule::new(Alignment::Top).with_padding_top(50.0)
    }

    pub fn content_centered() -> FramingRule {
        FramingRule::new(Alignment::Center).with_tolerance(50.0)
    }

    pub fn fully_visible() -> FramingRule {
        FramingRule::new(Alignment::FullyVisible)
            .with_padding_top(30.0)
            .with_padding_bottom(30.0)
    }

    pub fn cta_visible() -> FramingRule {
        FramingRule::new(Alignment::FullyVisible)
            .with_padding_top(50.0)
            .with_padding_bottom(100.0)
    }
}
