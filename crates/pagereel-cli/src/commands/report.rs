use std::path::Path;

use anyhow::{Context, Result};

use pagereel_core::preview::{export_report, PreviewReport, ReportFormat};

pub fn render(file: &Path, output: &Path, format: &str) -> Result<()> {
    let format: ReportFormat = format.parse()?;
    let content =
        std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let report: PreviewReport =
        serde_json::from_str(&content).context("file is not a preview report")?;

    export_report(&report, output, format)?;

    println!(
        "Rendered report with {} waypoint(s) to {}",
        report.waypoints.len(),
        output.display()
    );

    Ok(())
}
