// src/verifier.rs
//
// Post-hoc leaderboard verification against an external Ergast-compatible
// results API. Runs at most once, only after the race has finished on the
// final frame, and only on a copy of the final position map: any network
// or parse failure degrades to the telemetry-derived ranking.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, error, info, warn};

use crate::types::Frame;

/// Rank assigned to drivers the external source reports as non-finishers
/// (position strings like "R" or "D" that do not parse as integers).
pub const UNFINISHED_RANK: usize = 999;

#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedResult {
    pub code: String,
    pub position: usize,
    pub driver_id: String,
    pub status: String,
}

// Ergast/Jolpica response shape, only the fields we navigate.

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(rename = "MRData")]
    mr_data: MrData,
}

#[derive(Debug, Deserialize)]
struct MrData {
    #[serde(rename = "RaceTable")]
    race_table: RaceTable,
}

#[derive(Debug, Deserialize)]
struct RaceTable {
    #[serde(rename = "Races", default)]
    races: Vec<Race>,
}

#[derive(Debug, Deserialize)]
struct Race {
    #[serde(rename = "Results", default)]
    results: Vec<ApiResult>,
}

#[derive(Debug, Deserialize)]
struct ApiResult {
    #[serde(rename = "Driver")]
    driver: ApiDriver,
    #[serde(default)]
    position: String,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct ApiDriver {
    #[serde(default)]
    code: String,
    #[serde(rename = "driverId", default)]
    driver_id: String,
}

pub struct LeaderboardVerifier {
    http_client: reqwest::Client,
    base_url: String,
}

impl LeaderboardVerifier {
    pub fn new(base_url: String, timeout_secs: u64) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    /// Fetch the official results for an event. Returns `None` on any
    /// transport or parse failure; verification is strictly best-effort.
    pub async fn fetch_results(&self, year: u32, round: u32) -> Option<Vec<VerifiedResult>> {
        let url = format!(
            "{}/{}/{}/results.json",
            self.base_url.trim_end_matches('/'),
            year,
            round
        );

        info!("Verifying race results: {} round {}...", year, round);

        let response = match self.http_client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!("Failed to fetch race results: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!("Results API returned {}", response.status());
            return None;
        }

        let payload = match response.json::<ApiResponse>().await {
            Ok(p) => p,
            Err(e) => {
                error!("Failed to parse results API response: {}", e);
                return None;
            }
        };

        let results = parse_api_results(&payload);
        if results.is_empty() {
            warn!("No results in API response for {} round {}", year, round);
            return None;
        }

        info!("Fetched {} driver results from results API", results.len());
        for r in results.iter().filter(|r| r.position == UNFINISHED_RANK) {
            debug!("  {} ({}) did not finish: {}", r.code, r.driver_id, r.status);
        }
        Some(results)
    }

    /// Cross-check the telemetry-derived leaderboard against the external
    /// source. When the source is reachable its result is ground truth and
    /// replaces the input map wholesale; driver codes absent from the
    /// external result are dropped (and logged). Otherwise the input is
    /// returned unchanged.
    pub async fn verify_and_correct(
        &self,
        current_positions: &BTreeMap<String, usize>,
        year: u32,
        round: u32,
    ) -> BTreeMap<String, usize> {
        let api_results = match self.fetch_results(year, round).await {
            Some(r) => r,
            None => {
                warn!("Could not verify leaderboard, using telemetry-based positions");
                return current_positions.clone();
            }
        };

        let verified_positions: BTreeMap<String, usize> = api_results
            .iter()
            .map(|r| (r.code.clone(), r.position))
            .collect();

        let mut discrepancies = 0usize;
        for (code, &current) in current_positions {
            match verified_positions.get(code) {
                Some(&verified) if verified != current => {
                    discrepancies += 1;
                    info!("  {}: P{} -> P{} (corrected)", code, current, verified);
                }
                Some(_) => {}
                None => warn!(
                    "  {}: absent from external results, dropped from corrected map",
                    code
                ),
            }
        }

        if discrepancies > 0 {
            info!(
                "Corrected {} position discrepancies using external results",
                discrepancies
            );
        } else {
            debug!("Leaderboard verification complete, no discrepancies");
        }

        verified_positions
    }

    /// Verification only makes sense once the race has finished on the
    /// final frame of the sequence.
    pub fn should_verify(frames: &[Frame]) -> bool {
        frames.last().map_or(false, |f| f.race_finished)
    }
}

fn parse_api_results(payload: &ApiResponse) -> Vec<VerifiedResult> {
    let race = match payload.mr_data.race_table.races.first() {
        Some(r) => r,
        None => return Vec::new(),
    };

    race.results
        .iter()
        .filter(|r| !r.driver.code.is_empty())
        .map(|r| VerifiedResult {
            code: r.driver.code.clone(),
            // Non-finishers carry letter codes; map them to the sentinel
            // rank instead of rejecting the row.
            position: r.position.parse::<usize>().unwrap_or(UNFINISHED_RANK),
            driver_id: r.driver.driver_id.clone(),
            status: r.status.clone(),
        })
        .collect()
}
