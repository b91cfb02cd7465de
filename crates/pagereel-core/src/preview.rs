//! Waypoint preview: a fast dry run of the itinerary before recording.
//!
//! The previewer drives the page through every waypoint with short timings,
//! captures a still per stop and collects position deltas, so the itinerary
//! can be reviewed and nudged without paying for a full recording.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::PreviewConfig;
use crate::driver::PageDriver;
use crate::error::{Error, Result};
use crate::geometry::Waypoint;

/// Output format for an exported preview report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Json,
    Html,
}

impl FromStr for ReportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "html" => Ok(ReportFormat::Html),
            other => Err(Error::ReportFormat(other.to_string())),
        }
    }
}

/// One previewed waypoint: where the page actually landed, plus any manual
/// adjustment accumulated during review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaypointPreview {
    pub waypoint: Waypoint,
    pub index: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_path: Option<PathBuf>,
    /// Scroll position the page settled at.
    pub actual_position: f64,
    /// `actual_position - waypoint.position`; nonzero means the page could
    /// not land exactly on target.
    pub position_diff: f64,
    #[serde(default)]
    pub approved: bool,
    /// Signed manual delta to fold into the waypoint position.
    #[serde(default)]
    pub adjustment: f64,
}

/// Summary of a full preview pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewReport {
    pub generated_at: DateTime<Utc>,
    pub waypoints: Vec<WaypointPreview>,
    /// Total pixels travelled across the itinerary.
    pub total_scroll_distance: f64,
    /// Estimated recording length in seconds (scrolls plus dwells).
    pub estimated_duration: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_dir: Option<PathBuf>,
    pub adjustments_made: u32,
    pub all_approved: bool,
}

/// Drives the itinerary in fast-forward and records what the camera would
/// have seen.
pub struct WaypointPreviewer {
    driver: Arc<dyn PageDriver>,
    config: PreviewConfig,
    previews: Vec<WaypointPreview>,
}

impl WaypointPreviewer {
    pub fn new(driver: Arc<dyn PageDriver>, config: PreviewConfig) -> Self {
        Self {
            driver,
            config,
            previews: Vec::new(),
        }
    }

    pub fn previews(&self) -> &[WaypointPreview] {
        &self.previews
    }

    /// Visit one waypoint with preview timings and capture its still.
    pub async fn preview_waypoint(
        &mut self,
        waypoint: &Waypoint,
        index: usize,
    ) -> Result<WaypointPreview> {
        let duration = Duration::from_secs_f64(self.config.scroll_duration);
        self.driver.smooth_scroll_to(waypoint.position, duration).await?;
        tokio::time::sleep(Duration::from_secs_f64(self.config.pause_duration)).await;

        let viewport = self.driver.viewport().await?;
        let actual_position = viewport.scroll_y;

        let screenshot_path = if self.config.capture_screenshots {
            let frame = self.driver.screenshot().await?;
            std::fs::create_dir_all(&self.config.screenshot_dir)?;
            let path = self.config.screenshot_dir.join(format!(
                "waypoint_{index:02}_{}.png",
                sanitize_name(&waypoint.name)
            ));
            frame.save(&path)?;
            Some(path)
        } else {
            None
        };

        debug!(
            name = %waypoint.name,
            target = waypoint.position,
            actual = actual_position,
            "Previewed waypoint"
        );
        Ok(WaypointPreview {
            waypoint: waypoint.clone(),
            index,
            screenshot_path,
            actual_position,
            position_diff: actual_position - waypoint.position,
            approved: false,
            adjustment: 0.0,
        })
    }

    /// Preview every waypoint in order, replacing earlier results.
    pub async fn preview_all(&mut self, waypoints: &[Waypoint]) -> Result<&[WaypointPreview]> {
        self.previews.clear();
        for (index, wp) in waypoints.iter().enumerate() {
            let preview = self.preview_waypoint(wp, index).await?;
            self.previews.push(preview);
        }
        info!(count = self.previews.len(), "Preview pass complete");
        Ok(&self.previews)
    }

    /// Preview with a review callback at each waypoint. Returning
    /// `Some(delta)` nudges the position by that many pixels, re-scrolls and
    /// asks again; returning `None` approves the waypoint as it stands.
    pub async fn preview_all_interactive<F>(
        &mut self,
        waypoints: &[Waypoint],
        mut review: F,
    ) -> Result<&[WaypointPreview]>
    where
        F: FnMut(&WaypointPreview) -> Option<f64>,
    {
        self.previews.clear();
        for (index, wp) in waypoints.iter().enumerate() {
            let mut preview = self.preview_waypoint(wp, index).await?;
            while let Some(delta) = review(&preview) {
                preview.adjustment += delta;
                let target = (wp.position + preview.adjustment).max(0.0);
                let duration = Duration::from_secs_f64(self.config.scroll_duration);
                self.driver.smooth_scroll_to(target, duration).await?;
                let viewport = self.driver.viewport().await?;
                preview.actual_position = viewport.scroll_y;
                preview.position_diff = viewport.scroll_y - target;
            }
            // The still must show the frame the adjustment settled on, not
            // the original landing.
            if preview.adjustment != 0.0 {
                if let Some(path) = preview.screenshot_path.as_ref() {
                    let frame = self.driver.screenshot().await?;
                    frame.save(path)?;
                }
            }
            preview.approved = true;
            self.previews.push(preview);
        }
        Ok(&self.previews)
    }

    /// Mark every preview approved without further review.
    pub fn approve_all(&mut self) {
        for preview in &mut self.previews {
            preview.approved = true;
        }
    }

    /// Fold accumulated adjustments back into a waypoint list.
    pub fn apply_adjustments(&self, waypoints: &[Waypoint]) -> Vec<Waypoint> {
        waypoints
            .iter()
            .map(|wp| {
                let adjustment = self
                    .previews
                    .iter()
                    .find(|p| p.waypoint.name == wp.name)
                    .map(|p| p.adjustment)
                    .unwrap_or(0.0);
                let mut adjusted = wp.clone();
                adjusted.position = (wp.position + adjustment).max(0.0);
                adjusted
            })
            .collect()
    }

    /// Summarize the last preview pass.
    pub fn generate_report(&self) -> PreviewReport {
        let mut total_scroll_distance = 0.0;
        let mut estimated_duration = 0.0;
        let mut prev_position = 0.0;
        for preview in &self.previews {
            let wp = &preview.waypoint;
            total_scroll_distance += (wp.position - prev_position).abs();
            estimated_duration += wp.scroll_duration + wp.pause;
            prev_position = wp.position;
        }

        PreviewReport {
            generated_at: Utc::now(),
            total_scroll_distance,
            estimated_duration,
            screenshot_dir: self
                .config
                .capture_screenshots
                .then(|| self.config.screenshot_dir.clone()),
            adjustments_made: self
                .previews
                .iter()
                .filter(|p| p.adjustment != 0.0)
                .count() as u32,
            all_approved: !self.previews.is_empty() && self.previews.iter().all(|p| p.approved),
            waypoints: self.previews.clone(),
        }
    }

    /// One-call convenience: preview everything, approve it and report.
    pub async fn review_all(&mut self, waypoints: &[Waypoint]) -> Result<PreviewReport> {
        self.preview_all(waypoints).await?;
        self.approve_all();
        Ok(self.generate_report())
    }

    /// `review_all` plus an export to disk.
    pub async fn review_and_export(
        &mut self,
        waypoints: &[Waypoint],
        path: &Path,
        format: ReportFormat,
    ) -> Result<PreviewReport> {
        let report = self.review_all(waypoints).await?;
        export_report(&report, path, format)?;
        Ok(report)
    }
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Write a report to disk in the requested format.
pub fn export_report(report: &PreviewReport, path: &Path, format: ReportFormat) -> Result<()> {
    let content = match format {
        ReportFormat::Json => serde_json::to_string_pretty(report)?,
        ReportFormat::Html => render_html(report),
    };
    std::fs::write(path, content)?;
    Ok(())
}

fn render_html(report: &PreviewReport) -> String {
    let mut rows = String::new();
    for p in &report.waypoints {
        let screenshot = match &p.screenshot_path {
            Some(path) => format!(
                "<img src=\"{}\" alt=\"{}\" width=\"320\">",
                escape_html(&path.display().to_string()),
                escape_html(&p.waypoint.name)
            ),
            None => String::new(),
        };
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{:.0}px</td><td>{:.0}px</td>\
             <td>{:.1}s</td><td>{}</td><td>{}</td></tr>\n",
            p.index,
            escape_html(&p.waypoint.name),
            p.waypoint.position,
            p.actual_position,
            p.waypoint.pause,
            if p.approved { "yes" } else { "no" },
            screenshot,
        ));
    }

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Waypoint Preview Report</title>\n\
         <style>body{{font-family:sans-serif}}table{{border-collapse:collapse}}\
         td,th{{border:1px solid #ccc;padding:6px 10px}}</style>\n</head>\n<body>\n\
         <h1>Waypoint Preview Report</h1>\n\
         <p>Generated: {}</p>\n\
         <p>Waypoints: {} | Scroll distance: {:.0}px | Estimated duration: {:.1}s | \
         Adjustments: {} | All approved: {}</p>\n\
         <table>\n<tr><th>#</th><th>Name</th><th>Target</th><th>Actual</th>\
         <th>Pause</th><th>Approved</th><th>Screenshot</th></tr>\n{}</table>\n\
         </body>\n</html>\n",
        report.generated_at.to_rfc3339(),
        report.waypoints.len(),
        report.total_scroll_distance,
        report.estimated_duration,
        report.adjustments_made,
        report.all_approved,
        rows,
    )
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
