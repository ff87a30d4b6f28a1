//! JSON exporter for offline inspection of a simulated event.

use crate::runner::ScenarioResult;
use crate::SimError;

use pflow_core::{Track, TrackPool, TruthMatchReport};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;

/// One Track as it stood at the end of the event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackSummary {
    pub track_id: String,
    pub particle_id: i32,
    pub charge: i32,
    pub d0: f64,
    pub z0: f64,

    /// Momentum at the distance of closest approach (GeV/c)
    pub momentum: [f64; 3],

    /// Position at the calorimeter face (mm)
    pub calorimeter_position: [f64; 3],

    pub reaches_calorimeter: bool,
    pub is_available: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_mc_particle: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub daughters: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub siblings: Vec<String>,
}

impl TrackSummary {
    pub fn from_track(track: &Track) -> Self {
        let momentum = track.momentum_at_dca();
        let calorimeter = track.track_state_at_calorimeter().position;

        let handles = |ids: &std::collections::HashSet<pflow_core::TrackId>| {
            let mut names: Vec<String> = ids.iter().map(|id| id.as_uuid().to_string()).collect();
            names.sort();
            names
        };

        Self {
            track_id: track.id().as_uuid().to_string(),
            particle_id: track.particle_id(),
            charge: track.charge(),
            d0: track.d0(),
            z0: track.z0(),
            momentum: [momentum.x, momentum.y, momentum.z],
            calorimeter_position: [calorimeter.x, calorimeter.y, calorimeter.z],
            reaches_calorimeter: track.reaches_calorimeter(),
            is_available: track.is_available(),
            main_mc_particle: track.main_mc_particle().ok().map(|id| id.as_uuid().to_string()),
            cluster: track.associated_cluster().ok().map(|id| id.as_uuid().to_string()),
            parents: handles(track.parents()),
            daughters: handles(track.daughters()),
            siblings: handles(track.siblings()),
        }
    }
}

/// Complete event export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Central solenoid field (tesla)
    pub field_tesla: f64,

    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    pub report: TruthMatchReport,

    /// Surviving tracks, ordered by handle
    pub tracks: Vec<TrackSummary>,
}

impl SimExport {
    /// Builds an export from a finished scenario and its pool.
    pub fn from_run(result: &ScenarioResult, field_tesla: f64, pool: &TrackPool) -> Self {
        let mut tracks: Vec<TrackSummary> = pool.tracks().map(TrackSummary::from_track).collect();
        tracks.sort_by(|a, b| a.track_id.cmp(&b.track_id));

        Self {
            scenario: result.scenario.name().to_string(),
            seed: result.seed,
            field_tesla,
            passed: result.passed,
            failure_reason: result.failure_reason.clone(),
            report: result.report.clone(),
            tracks,
        }
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> Result<(), SimError> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
