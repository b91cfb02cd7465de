//! Waypoint generation: turning detected sections into a paced itinerary.
//!
//! Pacing heuristics live here: scroll duration grows with travel distance
//! and dwell time grows with section height, each with a floor so short hops
//! and small sections still read on camera.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::driver::PageDriver;
use crate::error::Result;
use crate::framing::{optimal_scroll, rule_for_section_type};
use crate::geometry::{FramingRule, Section, Viewport, Waypoint};
use crate::sections::SectionDetector;

/// Base dwell seconds per section type.
fn base_pause_for_type(section_type: &str) -> f64 {
    match section_type {
        "hero" => 3.0,
        "features" => 3.0,
        "pricing" => 3.5,
        "faq" => 2.5,
        "cta" => 2.0,
        "testimonials" => 2.5,
        "about" => 2.0,
        "contact" => 2.0,
        "footer" => 1.5,
        "header" => 1.0,
        _ => 2.0,
    }
}

/// Scroll duration as a monotonic function of travel distance: longer hops
/// animate longer, floored so short hops are not instantaneous.
pub fn estimate_scroll_duration(distance: f64) -> f64 {
    (0.5 + distance.abs() / 500.0).max(0.5)
}

/// Dwell time scaled by section height: larger sections earn a longer look,
/// capped at 1.5x the per-type base.
pub fn estimate_pause_duration(section: &Section) -> f64 {
    let base = base_pause_for_type(&section.section_type);
    let height_factor = (section.bounds.height / 800.0).min(1.5);
    base * height_factor
}

/// Caller-supplied modification applied to generated waypoints before use.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WaypointOverride {
    /// Waypoint name to modify, or the name of a new waypoint to insert.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pause: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll_duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Drop the named waypoint entirely.
    #[serde(default)]
    pub skip: bool,
    /// Insert as a new waypoint before the named waypoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_before: Option<String>,
    /// Insert as a new waypoint after the named waypoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_after: Option<String>,
}

/// Apply overrides to a generated waypoint list.
///
/// Field overrides and skips match by name. Inserts place a new waypoint
/// relative to its target and inherit the target's position when none is
/// given, so the final position sort keeps them adjacent. An override that
/// names a missing waypoint and requests no insertion becomes a net-new
/// waypoint when it carries a position, otherwise it is logged and ignored.
pub fn merge_overrides(waypoints: Vec<Waypoint>, overrides: &[WaypointOverride]) -> Vec<Waypoint> {
    let mut result = waypoints;

    for ov in overrides {
        if let Some(idx) = result.iter().position(|wp| wp.name == ov.name) {
            if ov.skip {
                debug!(name = %ov.name, "Skipping waypoint via override");
                result.remove(idx);
                continue;
            }
            let wp = &mut result[idx];
            if let Some(position) = ov.position {
                wp.position = position.max(0.0);
            }
            if let Some(pause) = ov.pause {
                wp.pause = pause;
            }
            if let Some(duration) = ov.scroll_duration {
                wp.scroll_duration = duration;
            }
            if let Some(ref description) = ov.description {
                wp.description = description.clone();
            }
            continue;
        }

        if let Some(target_name) = ov.insert_before.as_deref().or(ov.insert_after.as_deref()) {
            let Some(target_idx) = result.iter().position(|wp| wp.name == target_name) else {
                warn!(
                    name = %ov.name,
                    target = %target_name,
                    "Ignoring waypoint insert: target not found"
                );
                continue;
            };
            let anchor_position = result[target_idx].position;
            let insert_idx = if ov.insert_before.is_some() {
                target_idx
            } else {
                target_idx + 1
            };
            result.insert(insert_idx, manual_waypoint(ov, anchor_position));
            continue;
        }

        if ov.position.is_some() {
            // Net-new waypoint not tied to any detected section.
            result.push(manual_waypoint(ov, 0.0));
        } else {
            warn!(name = %ov.name, "Ignoring override: no matching waypoint");
        }
    }

    result.sort_by(|a, b| a.position.total_cmp(&b.position));
    result
}

fn manual_waypoint(ov: &WaypointOverride, default_position: f64) -> Waypoint {
    Waypoint {
        name: ov.name.clone(),
        position: ov.position.unwrap_or(default_position).max(0.0),
        pause: ov.pause.unwrap_or(2.0),
        scroll_duration: ov.scroll_duration.unwrap_or(1.5),
        description: ov
            .description
            .clone()
            .unwrap_or_else(|| format!("Manual waypoint: {}", ov.name)),
        framing_rule: None,
    }
}

/// Options for one generation pass.
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// Append a final waypoint returning to the top of the page.
    pub include_return_to_top: bool,
    /// Sections shorter than this are not worth a stop.
    pub min_section_height: f64,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            include_return_to_top: true,
            min_section_height: 200.0,
        }
    }
}

/// Generates a timed itinerary from the live page's sections.
pub struct WaypointGenerator {
    driver: Arc<dyn PageDriver>,
    detector: SectionDetector,
    custom_rules: HashMap<String, FramingRule>,
    custom_pauses: HashMap<String, f64>,
}

impl WaypointGenerator {
    pub fn new(driver: Arc<dyn PageDriver>) -> Self {
        let detector = SectionDetector::new(driver.clone());
        Self {
            driver,
            detector,
            custom_rules: HashMap::new(),
            custom_pauses: HashMap::new(),
        }
    }

    /// Override the framing rule for a section type.
    pub fn with_rule(mut self, section_type: impl Into<String>, rule: FramingRule) -> Self {
        self.custom_rules.insert(section_type.into(), rule);
        self
    }

    /// Override the dwell time for a section type or a section name.
    pub fn with_pause(mut self, key: impl Into<String>, seconds: f64) -> Self {
        self.custom_pauses.insert(key.into(), seconds);
        self
    }

    /// Framing rule for a section type: custom override, then type default.
    pub fn framing_rule_for(&self, section_type: &str) -> FramingRule {
        self.custom_rules
            .get(section_type)
            .copied()
            .unwrap_or_else(|| rule_for_section_type(section_type))
    }

    fn pause_for(&self, section: &Section) -> f64 {
        if let Some(&pause) = self.custom_pauses.get(&section.section_type) {
            return pause;
        }
        if let Some(&pause) = self.custom_pauses.get(&section.name) {
            return pause;
        }
        estimate_pause_duration(section)
    }

    /// Detect sections and produce the itinerary.
    pub async fn generate(&self, options: &GeneratorOptions) -> Result<Vec<Waypoint>> {
        let sections = self.detector.find_sections().await?;
        let viewport = self.driver.viewport().await?;
        Ok(self.waypoints_from_sections(&sections, &viewport, options))
    }

    /// Pure itinerary construction from already-detected sections.
    pub fn waypoints_from_sections(
        &self,
        sections: &[Section],
        viewport: &Viewport,
        options: &GeneratorOptions,
    ) -> Vec<Waypoint> {
        let mut waypoints = Vec::new();
        let mut prev_position = 0.0_f64;

        for section in sections {
            if section.bounds.height < options.min_section_height {
                continue;
            }
            let rule = self.framing_rule_for(&section.section_type);
            let position = optimal_scroll(&section.bounds, viewport, &rule).max(0.0);
            let distance = position - prev_position;

            waypoints.push(Waypoint {
                name: section.name.clone(),
                position,
                pause: self.pause_for(section),
                scroll_duration: estimate_scroll_duration(distance),
                description: format!(
                    "{} section: {}",
                    title_case(&section.section_type),
                    section.name
                ),
                framing_rule: Some(rule),
            });
            prev_position = position;
        }

        if options.include_return_to_top && !waypoints.is_empty() {
            waypoints.push(Waypoint {
                name: "return_to_top".to_string(),
                position: 0.0,
                pause: 2.0,
                scroll_duration: estimate_scroll_duration(prev_position),
                description: "Return to top of page".to_string(),
                framing_rule: None,
            });
        }

        debug!(count = waypoints.len(), "Generated waypoints");
        waypoints
    }
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Serialize, Deserialize)]
struct WaypointDocument {
    waypoints: Vec<Waypoint>,
}

/// Persist a waypoint list as a JSON document.
pub fn save_waypoints(path: &Path, waypoints: &[Waypoint]) -> Result<()> {
    let doc = WaypointDocument {
        waypoints: waypoints.to_vec(),
    };
    let content = serde_json::to_string_pretty(&doc)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Load a waypoint list saved by `save_waypoints`. Positions are clamped
/// to zero, so a hand-edited file cannot smuggle in a negative target.
pub fn load_waypoints(path: &Path) -> Result<Vec<Waypoint>> {
    let content = std::fs::read_to_string(path)?;
    let mut doc: WaypointDocument = serde_json::from_str(&content)?;
    for wp in &mut doc.waypoints {
        wp.position = wp.position.max(0.0);
    }
    Ok(doc.waypoints)
}
