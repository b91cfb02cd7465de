use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use pagereel_core::waypoints::{load_waypoints, merge_overrides, save_waypoints, WaypointOverride};

pub fn show(file: &Path) -> Result<()> {
    let waypoints =
        load_waypoints(file).with_context(|| format!("reading {}", file.display()))?;

    if waypoints.is_empty() {
        println!("No waypoints in {}.", file.display());
        return Ok(());
    }

    println!("Waypoints ({}):\n", waypoints.len());
    for (index, wp) in waypoints.iter().enumerate() {
        println!(
            "  {:>2}. {} @ {:.0}px  (scroll {:.1}s, pause {:.1}s)",
            index + 1,
            wp.name,
            wp.position,
            wp.scroll_duration,
            wp.pause
        );
        if !wp.description.is_empty() {
            println!("      {}", wp.description);
        }
    }

    Ok(())
}

pub fn merge(file: &Path, overrides_file: &Path, output: Option<&Path>) -> Result<()> {
    let waypoints =
        load_waypoints(file).with_context(|| format!("reading {}", file.display()))?;
    let content = std::fs::read_to_string(overrides_file)
        .with_context(|| format!("reading {}", overrides_file.display()))?;
    let overrides: Vec<WaypointOverride> =
        serde_json::from_str(&content).context("overrides must be a JSON array")?;

    for ov in &overrides {
        let resolvable = waypoints.iter().any(|wp| wp.name == ov.name)
            || ov.insert_before.is_some()
            || ov.insert_after.is_some()
            || ov.position.is_some();
        if !resolvable {
            warn!(name = %ov.name, "Override matches no waypoint and will be dropped");
        }
    }

    let before = waypoints.len();
    let merged = merge_overrides(waypoints, &overrides);
    let target = output.unwrap_or(file);
    save_waypoints(target, &merged)?;
    info!(
        overrides = overrides.len(),
        waypoints = merged.len(),
        path = %target.display(),
        "Itinerary updated"
    );

    println!(
        "Merged {} override(s): {} -> {} waypoints, written to {}",
        overrides.len(),
        before,
        merged.len(),
        target.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagereel_core::Waypoint;

    fn write_itinerary(path: &Path) {
        let waypoints = vec![
            Waypoint::new("hero", 0.0),
            Waypoint::new("features", 600.0),
            Waypoint::new("footer", 2000.0),
        ];
        save_waypoints(path, &waypoints).unwrap();
    }

    #[test]
    fn test_merge_writes_to_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("waypoints.json");
        let overrides = dir.path().join("overrides.json");
        let output = dir.path().join("merged.json");
        write_itinerary(&input);
        std::fs::write(&overrides, r#"[{"name": "footer", "skip": true}]"#).unwrap();

        merge(&input, &overrides, Some(output.as_path())).unwrap();

        let merged = load_waypoints(&output).unwrap();
        assert_eq!(merged.len(), 2);
        assert!(!merged.iter().any(|wp| wp.name == "footer"));
        // The input itinerary is untouched when an output path is given.
        assert_eq!(load_waypoints(&input).unwrap().len(), 3);
    }

    #[test]
    fn test_merge_in_place_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("waypoints.json");
        let overrides = dir.path().join("overrides.json");
        write_itinerary(&input);
        std::fs::write(
            &overrides,
            r#"[{"name": "features", "position": 650.0, "pause": 4.0}]"#,
        )
        .unwrap();

        merge(&input, &overrides, None).unwrap();

        let merged = load_waypoints(&input).unwrap();
        let features = merged.iter().find(|wp| wp.name == "features").unwrap();
        assert_eq!(features.position, 650.0);
        assert_eq!(features.pause, 4.0);
    }

    #[test]
    fn test_merge_rejects_malformed_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("waypoints.json");
        let overrides = dir.path().join("overrides.json");
        write_itinerary(&input);
        std::fs::write(&overrides, r#"{"not": "an array"}"#).unwrap();

        assert!(merge(&input, &overrides, None).is_err());
    }
}
