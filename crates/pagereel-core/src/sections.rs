//! Semantic section detection from page structure.
//!
//! A scan script collects landmark candidates (structural tags, ARIA roles,
//! `data-section` markers) with nested candidates already suppressed; this
//! module filters out noise, classifies each survivor by keyword patterns and
//! orders the result by vertical position.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use crate::driver::PageDriver;
use crate::error::Result;
use crate::geometry::{ElementBounds, Section};

/// Candidates narrower or shorter than this are noise (icons, separators).
pub const MIN_LANDMARK_EDGE: f64 = 50.0;

/// In-page scan for landmark candidates. Nested candidates are suppressed by
/// marking every ancestor landmark as seen, matching document order.
const SECTION_SCAN_SCRIPT: &str = r#"() => {
    const sections = [];
    const scrollY = window.scrollY;
    const selectors = [
        'section',
        '[role="region"]',
        '[role="main"]',
        '[role="banner"]',
        '[role="contentinfo"]',
        '[data-section]',
        'main',
        'header',
        'footer',
        'article',
    ];
    const candidates = document.querySelectorAll(selectors.join(', '));
    const seen = new Set();
    for (const el of candidates) {
        if (seen.has(el)) continue;
        let parent = el.parentElement;
        while (parent) {
            if (parent.tagName === 'SECTION' || parent.hasAttribute('data-section')) {
                seen.add(parent);
            }
            parent = parent.parentElement;
        }
        const rect = el.getBoundingClientRect();
        const id = el.id || '';
        const classes = typeof el.className === 'string' ? el.className : '';
        const dataSection = el.getAttribute('data-section') || '';
        const ariaLabel = el.getAttribute('aria-label') || '';
        const role = el.getAttribute('role') || '';
        const heading = el.querySelector('h1, h2, h3, h4');
        const headingText = heading ? heading.textContent.trim() : '';
        let name = dataSection || id || headingText || el.tagName.toLowerCase();
        sections.push({
            name: name.slice(0, 50),
            id: id,
            classes: classes,
            headingText: headingText,
            ariaLabel: ariaLabel,
            role: role,
            tagName: el.tagName.toLowerCase(),
            x: rect.left,
            y: rect.top + scrollY,
            width: rect.width,
            height: rect.height,
        });
    }
    return sections;
}"#;

/// One landmark candidate as reported by the scan script.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLandmark {
    name: String,
    #[serde(default)]
    id: String,
    #[serde(default)]
    classes: String,
    #[serde(default)]
    heading_text: String,
    #[serde(default)]
    aria_label: String,
    #[serde(default)]
    role: String,
    #[serde(default)]
    tag_name: String,
    #[serde(default)]
    x: f64,
    y: f64,
    width: f64,
    height: f64,
}

/// Keyword patterns per section type, tested in this fixed priority order.
static TYPE_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    let table: &[(&str, &str)] = &[
        ("hero", r"hero|banner|jumbotron|masthead|splash|intro|landing"),
        (
            "features",
            r"features?|benefits?|services?|capabilities|highlights?|why-us|what-we",
        ),
        ("pricing", r"pricing|plans?|packages?|subscription|tiers?"),
        ("faq", r"faq|questions?|answers?|help|support|accordion"),
        (
            "cta",
            r"cta|call-to-action|signup|sign-up|register|get-started|join|trial|waitlist",
        ),
        (
            "testimonials",
            r"testimonials?|reviews?|quotes?|social-proof|customers?",
        ),
        ("about", r"about|team|story|mission|company"),
        ("contact", r"contact|get-in-touch|reach|form"),
        ("footer", r"footer|bottom|site-footer"),
        ("header", r"header|navbar|nav|top-bar|site-header"),
    ];
    table
        .iter()
        .map(|(ty, pattern)| {
            let re = Regex::new(&format!("(?i){pattern}")).expect("valid section pattern");
            (*ty, re)
        })
        .collect()
});

/// Classify a section from its identifier strings. First pattern wins;
/// unmatched attributes yield `"default"`.
pub fn detect_section_type(
    element_id: &str,
    element_classes: &str,
    heading_text: &str,
    aria_label: &str,
) -> &'static str {
    let search_text = format!("{element_id} {element_classes} {heading_text} {aria_label}");
    for (section_type, pattern) in TYPE_PATTERNS.iter() {
        if pattern.is_match(&search_text) {
            return section_type;
        }
    }
    "default"
}

/// Detects semantic sections on a live page.
pub struct SectionDetector {
    driver: Arc<dyn PageDriver>,
}

impl SectionDetector {
    pub fn new(driver: Arc<dyn PageDriver>) -> Self {
        Self { driver }
    }

    /// Find all semantic sections, ordered by vertical position.
    pub async fn find_sections(&self) -> Result<Vec<Section>> {
        let value = self.driver.evaluate(SECTION_SCAN_SCRIPT).await?;
        let rows = match value.as_array() {
            Some(rows) => rows.clone(),
            None => Vec::new(),
        };

        let mut sections = Vec::new();
        for row in rows {
            // A malformed candidate is "no match", never an error.
            let raw: RawLandmark = match serde_json::from_value(row) {
                Ok(raw) => raw,
                Err(e) => {
                    debug!(error = %e, "Skipping unparseable landmark candidate");
                    continue;
                }
            };
            if raw.width < MIN_LANDMARK_EDGE || raw.height < MIN_LANDMARK_EDGE {
                continue;
            }
            sections.push(classify(raw));
        }

        sections.sort_by(|a, b| a.bounds.top.total_cmp(&b.bounds.top));
        debug!(count = sections.len(), "Detected page sections");
        Ok(sections)
    }

    /// Find a section by case-insensitive substring of its name.
    pub async fn find_section_by_name(&self, name: &str) -> Result<Option<Section>> {
        let needle = name.to_lowercase();
        let sections = self.find_sections().await?;
        Ok(sections
            .into_iter()
            .find(|s| s.name.to_lowercase().contains(&needle)))
    }

    /// Find all sections of a specific type.
    pub async fn find_sections_by_type(&self, section_type: &str) -> Result<Vec<Section>> {
        let sections = self.find_sections().await?;
        Ok(sections
            .into_iter()
            .filter(|s| s.section_type == section_type)
            .collect())
    }
}

fn classify(raw: RawLandmark) -> Section {
    let mut section_type =
        detect_section_type(&raw.id, &raw.classes, &raw.heading_text, &raw.aria_label);

    // Structural overrides: landmark tags and roles pin otherwise-default
    // candidates to header/footer.
    if section_type == "default" {
        section_type = match (raw.tag_name.as_str(), raw.role.as_str()) {
            ("header", _) | (_, "banner") => "header",
            ("footer", _) | (_, "contentinfo") => "footer",
            _ => section_type,
        };
    }

    let bounds = ElementBounds::new(raw.y, raw.x, raw.width, raw.height);
    Section {
        name: raw.name,
        section_type: section_type.to_string(),
        scroll_position: bounds.top,
        bounds,
    }
}
