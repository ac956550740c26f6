// src/session.rs
//
// Input boundary: the acquisition layer exports one JSON file per race
// session (per-driver per-lap samples, official results, track status
// events, driver colors). This module owns the serde model for that file,
// discovery of export files under the input directory, and the one-time
// derivation of per-driver status from the results rows.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::types::{DriverStatus, RawLapSample};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub name: String,
    pub year: u32,
    pub round: u32,
    pub drivers: Vec<SessionDriver>,
    pub results: Vec<ResultRow>,
    pub track_status: Vec<TrackStatusEvent>,
    /// Hex color strings ("#rrggbb") keyed by driver code.
    #[serde(default)]
    pub driver_colors: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDriver {
    pub code: String,
    #[serde(default)]
    pub number: String,
    pub laps: Vec<RawLap>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawLap {
    pub lap_number: u32,
    pub compound: String,
    pub samples: Vec<RawLapSample>,
}

/// One row of the official classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRow {
    pub code: String,
    pub status: String,
    /// Classified position: a number for classified finishers, or a letter
    /// code (R/D/E/W/N) for retirements and exclusions.
    pub classification: String,
    pub laps: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackStatusEvent {
    /// Absolute session-relative time, seconds.
    pub time: f64,
    pub status: String,
}

impl SessionData {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read session export {}", path.display()))?;
        let session: SessionData = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse session export {}", path.display()))?;
        info!(
            "Loaded session '{}' ({} round {}): {} drivers, {} result rows",
            session.name,
            session.year,
            session.round,
            session.drivers.len(),
            session.results.len()
        );
        Ok(session)
    }

    /// Canonical event identifier used as the cache key.
    pub fn event_key(&self) -> String {
        format!("{}_round{:02}", self.year, self.round)
    }

    /// Build the immutable per-driver status map from the results rows.
    pub fn driver_status_map(&self) -> BTreeMap<String, DriverStatus> {
        let mut map = BTreeMap::new();
        for row in &self.results {
            if row.code.is_empty() {
                continue;
            }
            map.insert(row.code.clone(), DriverStatus::from_result(row));
        }
        map
    }

    /// Driver colors converted from hex strings to RGB triples. Entries
    /// that fail to parse are dropped with a warning.
    pub fn driver_colors_rgb(&self) -> BTreeMap<String, [u8; 3]> {
        let mut colors = BTreeMap::new();
        for (code, hex) in &self.driver_colors {
            match parse_hex_color(hex) {
                Some(rgb) => {
                    colors.insert(code.clone(), rgb);
                }
                None => warn!("Unparseable color '{}' for driver {}", hex, code),
            }
        }
        colors
    }
}

impl DriverStatus {
    pub fn from_result(row: &ResultRow) -> Self {
        // "Finished" or a "+N Laps" status both count as having finished.
        let is_finished = row.status.contains("Finished") || row.status.contains('+');
        let is_dnf = matches!(row.classification.as_str(), "R" | "D" | "E" | "W" | "N")
            || (!is_finished && row.laps > 0);

        Self {
            status: row.status.clone(),
            classification: row.classification.clone(),
            laps_completed: row.laps,
            is_finished,
            is_dnf,
        }
    }
}

/// Find session export files (*.json) under the configured input directory.
pub fn find_session_files(dir: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    info!("Found {} session export(s) in {}", files.len(), dir);
    Ok(files)
}

fn parse_hex_color(hex: &str) -> Option<[u8; 3]> {
    let hex = hex.trim_start_matches('#');
    // The ASCII check keeps the byte slices below on char boundaries; a
    // 6-byte value containing a multi-byte character is just a bad color.
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some([r, g, b])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(status: &str, classification: &str, laps: u32) -> ResultRow {
        ResultRow {
            code: "VER".to_string(),
            status: status.to_string(),
            classification: classification.to_string(),
            laps,
        }
    }

    #[test]
    fn test_finished_status_variants() {
        let s = DriverStatus::from_result(&row("Finished", "1", 57));
        assert!(s.is_finished);
        assert!(!s.is_dnf);

        // Lapped cars report "+1 Lap" and still classify as finished.
        let s = DriverStatus::from_result(&row("+1 Lap", "14", 56));
        assert!(s.is_finished);
        assert!(!s.is_dnf);
    }

    #[test]
    fn test_retired_driver_is_dnf() {
        let s = DriverStatus::from_result(&row("Collision", "R", 22));
        assert!(!s.is_finished);
        assert!(s.is_dnf);
        assert_eq!(s.laps_completed, 22);
    }

    #[test]
    fn test_unfinished_with_laps_is_dnf_even_without_letter_code() {
        let s = DriverStatus::from_result(&row("Gearbox", "18", 40));
        assert!(!s.is_finished);
        assert!(s.is_dnf);
    }

    #[test]
    fn test_hex_color_parsing() {
        assert_eq!(parse_hex_color("#ff8000"), Some([255, 128, 0]));
        assert_eq!(parse_hex_color("0600ef"), Some([6, 0, 239]));
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(parse_hex_color("#zzzzzz"), None);
    }

    #[test]
    fn test_non_ascii_color_is_rejected_not_panicking() {
        // "a\u{e9}aab" is 6 bytes but only 5 chars; slicing it at byte 2
        // would split the multi-byte character.
        assert_eq!(parse_hex_color("a\u{e9}aab"), None);
        assert_eq!(parse_hex_color("#a\u{e9}aab"), None);
        assert_eq!(parse_hex_color("\u{1f3c1}aa"), None);
    }

    #[test]
    fn test_driver_colors_rgb_drops_bad_entries() {
        let session = SessionData {
            name: "Test GP".to_string(),
            year: 2024,
            round: 5,
            drivers: vec![],
            results: vec![],
            track_status: vec![],
            driver_colors: BTreeMap::from([
                ("VER".to_string(), "#0600ef".to_string()),
                ("HAM".to_string(), "not-a-color".to_string()),
                ("LEC".to_string(), "a\u{e9}aab".to_string()),
            ]),
        };
        let colors = session.driver_colors_rgb();
        assert_eq!(colors.get("VER"), Some(&[6, 0, 239]));
        assert!(!colors.contains_key("HAM"));
        assert!(!colors.contains_key("LEC"));
    }

    #[test]
    fn test_event_key_format() {
        let session = SessionData {
            name: "Test GP".to_string(),
            year: 2024,
            round: 5,
            drivers: vec![],
            results: vec![],
            track_status: vec![],
            driver_colors: BTreeMap::new(),
        };
        assert_eq!(session.event_key(), "2024_round05");
    }
}
