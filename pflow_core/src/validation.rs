//! Validation Module - Truth Matching Against Simulation
//! =====================================================
//!
//! Compares each Track's main MC particle with the particle the event
//! generator actually used to produce it.
//!
//! Key metrics:
//! - Matching efficiency (main MC particle is the true origin)
//! - Mismatch rate (main MC particle is some other particle)
//! - Unmatched tracks (no usable truth weights)
//! - Split particles (one MC particle claimed by several tracks)
//!
//! Usage:
//! ```ignore
//! use pflow_core::validation::TruthMatchSession;
//!
//! let mut session = TruthMatchSession::new();
//! session.record_origin(track_id, mc_particle_id);
//! let report = session.evaluate(&pool);
//! ```

use crate::pflow_handles::{McParticleId, TrackId};
use crate::pflow_pool::TrackPool;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// =============================================================================
// TRUTH MATCH SESSION
// =============================================================================

/// Collects the true origin of each generated track.
#[derive(Debug, Clone, Default)]
pub struct TruthMatchSession {
    origins: HashMap<TrackId, McParticleId>,
}

impl TruthMatchSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record which MC particle `track_id` was generated from.
    pub fn record_origin(&mut self, track_id: TrackId, mc_particle: McParticleId) {
        self.origins.insert(track_id, mc_particle);
    }

    pub fn origin_count(&self) -> usize {
        self.origins.len()
    }

    /// Evaluate every Track in the pool against the recorded origins.
    ///
    /// Tracks without a recorded origin still count towards the per-particle
    /// totals, but not towards matched/mismatched.
    pub fn evaluate(&self, pool: &TrackPool) -> TruthMatchReport {
        let mut report = TruthMatchReport::default();
        let mut per_particle: HashMap<McParticleId, usize> = HashMap::new();

        for track in pool.tracks() {
            report.total_tracks += 1;

            match track.main_mc_particle() {
                Ok(main) => {
                    *per_particle.entry(main).or_insert(0) += 1;

                    match self.origins.get(&track.id()) {
                        Some(origin) if *origin == main => report.matched += 1,
                        Some(_) => report.mismatched += 1,
                        None => report.without_origin += 1,
                    }
                }
                Err(_) => report.unmatched += 1,
            }
        }

        report.missing_tracks = self
            .origins
            .keys()
            .filter(|track_id| !pool.contains(track_id))
            .count();

        let mut tracks_per_particle: Vec<(McParticleId, usize)> = per_particle.into_iter().collect();
        tracks_per_particle.sort();
        report.tracks_per_particle = tracks_per_particle;

        report
    }
}

// =============================================================================
// TRUTH MATCH REPORT
// =============================================================================

/// Result of comparing main MC particles with generator origins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TruthMatchReport {
    /// Tracks evaluated
    pub total_tracks: usize,
    /// Main MC particle equals the recorded origin
    pub matched: usize,
    /// Main MC particle differs from the recorded origin
    pub mismatched: usize,
    /// No main MC particle (empty or non-positive weights)
    pub unmatched: usize,
    /// Has a main MC particle but no recorded origin
    pub without_origin: usize,
    /// Recorded origins whose Track is no longer in the pool
    pub missing_tracks: usize,
    /// Number of tracks claiming each MC particle, sorted by particle
    pub tracks_per_particle: Vec<(McParticleId, usize)>,
}

impl TruthMatchReport {
    /// Fraction of evaluated tracks matched to their origin.
    pub fn efficiency(&self) -> f64 {
        if self.total_tracks > 0 {
            self.matched as f64 / self.total_tracks as f64
        } else {
            0.0
        }
    }

    /// Fraction of evaluated tracks matched to the wrong particle.
    pub fn mismatch_rate(&self) -> f64 {
        if self.total_tracks > 0 {
            self.mismatched as f64 / self.total_tracks as f64
        } else {
            0.0
        }
    }

    /// MC particles claimed by more than one track.
    pub fn split_particles(&self) -> usize {
        self.tracks_per_particle.iter().filter(|(_, count)| *count > 1).count()
    }

    /// Check if the report passes acceptance criteria
    pub fn passes_criteria(&self, min_efficiency: f64, max_mismatch_rate: f64) -> bool {
        self.efficiency() >= min_efficiency && self.mismatch_rate() <= max_mismatch_rate
    }

    /// Multi-line human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "tracks={} matched={} mismatched={} unmatched={} missing={} split={} efficiency={:.3}",
            self.total_tracks,
            self.matched,
            self.mismatched,
            self.unmatched,
            self.missing_tracks,
            self.split_particles(),
            self.efficiency(),
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================
