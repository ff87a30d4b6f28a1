//! Scenario runner - builds one simulated event per scenario and checks it.

use crate::oracle::{EventConfig, Oracle, TruthParticle};
use crate::scenarios::ScenarioId;
use crate::SimError;

use nalgebra::Vector3;
use pflow_core::{
    ClusterId, McParticleId, McParticleWeightMap, Track, TrackError, TrackId, TrackPool, TruthMatchReport,
    TruthMatchSession,
};
use pflow_env::{FieldLookup, SolenoidField};
use tracing::{debug, info, warn};

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Tracks successfully constructed
    pub tracks_built: usize,

    /// Parameter bundles rejected at construction
    pub tracks_rejected: usize,

    /// Truth matching at the end of the event
    pub report: TruthMatchReport,

    /// Failure message if any
    pub failure_reason: Option<String>,
}

/// One event in flight.
struct EventState {
    oracle: Oracle,
    field: SolenoidField,
    field_tesla: f64,
    pool: TrackPool,
    session: TruthMatchSession,
    built: usize,
    rejected: usize,
}

impl EventState {
    /// Builds a track for `particle` and records its origin.
    fn build(&mut self, particle: &TruthParticle) -> Result<TrackId, TrackError> {
        let generated = self.oracle.track_parameters(particle, self.field_tesla);

        let track = match Track::with_id(generated.track_id, &generated.parameters, &self.field) {
            Ok(track) => track,
            Err(e) => {
                self.rejected += 1;
                return Err(e);
            }
        };

        let track_id = self.pool.insert(track)?;
        self.session.record_origin(track_id, generated.origin);
        self.built += 1;

        Ok(track_id)
    }

    fn pure_weights(mc_particle: McParticleId) -> McParticleWeightMap {
        std::iter::once((mc_particle, 1.0)).collect()
    }
}

fn ensure(condition: bool, message: impl FnOnce() -> String) -> Result<(), SimError> {
    if condition {
        Ok(())
    } else {
        Err(SimError::Assertion(message()))
    }
}

/// Runs event scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Primary particles per event
    num_particles: usize,

    /// Central solenoid field (tesla)
    field_tesla: f64,

    event_config: EventConfig,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            num_particles: 50,
            field_tesla: 3.5,
            event_config: EventConfig::default(),
        }
    }

    /// Sets the number of primaries.
    pub fn with_particles(mut self, num_particles: usize) -> Self {
        self.num_particles = num_particles;
        self
    }

    /// Sets the central field.
    pub fn with_field(mut self, tesla: f64) -> Self {
        self.field_tesla = tesla;
        self
    }

    /// Sets the generator configuration.
    pub fn with_event_config(mut self, config: EventConfig) -> Self {
        self.event_config = config;
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn field_tesla(&self) -> f64 {
        self.field_tesla
    }

    /// Run a scenario.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        self.run_detailed(scenario).0
    }

    /// Run a scenario and keep the event's track pool for inspection/export.
    pub fn run_detailed(&self, scenario: ScenarioId) -> (ScenarioResult, TrackPool) {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let mut state = match self.event_state() {
            Ok(state) => state,
            Err(e) => {
                warn!("Scenario {} could not start: {}", scenario.name(), e);
                let result = ScenarioResult {
                    scenario,
                    seed: self.seed,
                    passed: false,
                    tracks_built: 0,
                    tracks_rejected: 0,
                    report: TruthMatchReport::default(),
                    failure_reason: Some(e.to_string()),
                };
                return (result, TrackPool::with_defaults());
            }
        };

        let outcome = match scenario {
            ScenarioId::Clean => self.run_clean(&mut state),
            ScenarioId::Contaminated => self.run_contaminated(&mut state),
            ScenarioId::DecayChain => self.run_decay_chain(&mut state),
            ScenarioId::NeutralRejection => self.run_neutral_rejection(&mut state),
            ScenarioId::ClusterMatching => self.run_cluster_matching(&mut state),
        };

        let report = state.session.evaluate(&state.pool);
        debug!("{}: {}", scenario.name(), report.summary());

        let result = ScenarioResult {
            scenario,
            seed: self.seed,
            passed: outcome.is_ok(),
            tracks_built: state.built,
            tracks_rejected: state.rejected,
            report,
            failure_reason: outcome.err().map(|e| e.to_string()),
        };

        (result, state.pool)
    }

    fn event_state(&self) -> Result<EventState, SimError> {
        // Return yoke runs opposite to the central field at reduced strength
        let field = SolenoidField::new(self.field_tesla, -0.4 * self.field_tesla, 3400.0, 3900.0, 8000.0)?;
        let field_tesla = field.field_at(&Vector3::zeros())?;

        Ok(EventState {
            oracle: Oracle::new(self.seed, self.event_config.clone())?,
            field,
            field_tesla,
            pool: TrackPool::with_defaults(),
            session: TruthMatchSession::new(),
            built: 0,
            rejected: 0,
        })
    }

    // ========================================================================
    // EVT-001: CLEAN
    // ========================================================================

    fn run_clean(&self, state: &mut EventState) -> Result<(), SimError> {
        for _ in 0..self.num_particles {
            let particle = state.oracle.charged_particle();
            let track_id = state.build(&particle)?;
            state
                .pool
                .set_mc_particle_weights(&track_id, EventState::pure_weights(particle.id))?;
        }

        let report = state.session.evaluate(&state.pool);
        ensure(report.matched == state.built, || {
            format!("only {}/{} tracks matched their origin", report.matched, state.built)
        })
    }

    // ========================================================================
    // EVT-002: CONTAMINATED
    // ========================================================================

    fn run_contaminated(&self, state: &mut EventState) -> Result<(), SimError> {
        let particles: Vec<TruthParticle> =
            (0..self.num_particles).map(|_| state.oracle.charged_particle()).collect();
        let all_ids: Vec<McParticleId> = particles.iter().map(|p| p.id).collect();

        let mut ties = 0;
        for (index, particle) in particles.iter().enumerate() {
            let track_id = state.build(particle)?;

            let weights: McParticleWeightMap = match all_ids.iter().find(|id| **id != particle.id) {
                // Every fifth track gets an exact tie; insertion order decides it
                Some(other) if index % 5 == 0 => {
                    ties += 1;
                    vec![(particle.id, 0.5), (*other, 0.5)].into_iter().collect()
                }
                _ => state.oracle.weights(particle.id, &all_ids),
            };

            state.pool.set_mc_particle_weights(&track_id, weights)?;
        }

        debug!("contaminated: {} tied weight maps", ties);

        let report = state.session.evaluate(&state.pool);
        ensure(report.mismatched == 0, || {
            format!("{} tracks matched the contaminating particle", report.mismatched)
        })?;
        ensure(report.matched == state.built, || {
            format!("only {}/{} tracks matched their origin", report.matched, state.built)
        })
    }

    // ========================================================================
    // EVT-003: DECAY CHAIN
    // ========================================================================

    fn run_decay_chain(&self, state: &mut EventState) -> Result<(), SimError> {
        let num_parents = (self.num_particles / 4).max(1);
        let mut parents = Vec::with_capacity(num_parents);
        let mut daughters_by_parent = Vec::with_capacity(num_parents);

        for _ in 0..num_parents {
            let parent = state.oracle.charged_particle();
            let parent_track = state.build(&parent)?;
            state
                .pool
                .set_mc_particle_weights(&parent_track, EventState::pure_weights(parent.id))?;

            let mut daughter_tracks = Vec::new();
            for daughter in state.oracle.three_prong_decay(&parent) {
                let daughter_track = state.build(&daughter)?;
                state
                    .pool
                    .set_mc_particle_weights(&daughter_track, EventState::pure_weights(daughter.id))?;
                state.pool.set_parent_daughter(parent_track, daughter_track)?;
                daughter_tracks.push(daughter_track);
            }

            for (i, first) in daughter_tracks.iter().enumerate() {
                for second in &daughter_tracks[i + 1..] {
                    state.pool.set_siblings(*first, *second)?;
                }
            }

            parents.push(parent_track);
            daughters_by_parent.push(daughter_tracks);
        }

        // Topology as seen through the pool
        for (parent, daughters) in parents.iter().zip(&daughters_by_parent) {
            ensure(state.pool.daughters_of(parent)?.len() == daughters.len(), || {
                format!("parent {} lost daughters", parent)
            })?;

            for daughter in daughters {
                let resolved = state.pool.parents_of(daughter)?;
                ensure(resolved.len() == 1 && resolved[0].id() == *parent, || {
                    format!("daughter {} does not resolve to parent {}", daughter, parent)
                })?;
                ensure(state.pool.siblings_of(daughter)?.len() == daughters.len() - 1, || {
                    format!("daughter {} has wrong sibling count", daughter)
                })?;
            }
        }

        // Removing parents must leave daughters intact with dangling handles
        for parent in &parents {
            state.pool.remove(parent)?;
        }

        for (parent, daughters) in parents.iter().zip(&daughters_by_parent) {
            for daughter in daughters {
                let track = state
                    .pool
                    .get(daughter)
                    .ok_or_else(|| SimError::Assertion(format!("daughter {} vanished with parent", daughter)))?;

                ensure(track.parents().contains(parent), || {
                    format!("daughter {} forgot its removed parent", daughter)
                })?;
                ensure(state.pool.parents_of(daughter)?.is_empty(), || {
                    format!("daughter {} resolved a removed parent", daughter)
                })?;
            }
        }

        let report = state.session.evaluate(&state.pool);
        ensure(report.missing_tracks == parents.len(), || {
            format!("expected {} missing tracks, found {}", parents.len(), report.missing_tracks)
        })?;
        ensure(report.mismatched == 0 && report.unmatched == 0, || report.summary())
    }

    // ========================================================================
    // EVT-004: NEUTRAL REJECTION
    // ========================================================================

    fn run_neutral_rejection(&self, state: &mut EventState) -> Result<(), SimError> {
        let mut expected_charged = 0;
        let mut expected_neutral = 0;

        for index in 0..self.num_particles {
            if index % 3 == 0 {
                let neutral = state.oracle.neutral_particle();
                match state.build(&neutral) {
                    Err(TrackError::InvalidParameter(_)) => expected_neutral += 1,
                    Err(e) => return Err(e.into()),
                    Ok(track_id) => {
                        return Err(SimError::Assertion(format!("neutral particle became track {}", track_id)))
                    }
                }
            } else {
                let charged = state.oracle.charged_particle();
                let track_id = state.build(&charged)?;
                state
                    .pool
                    .set_mc_particle_weights(&track_id, EventState::pure_weights(charged.id))?;
                expected_charged += 1;
            }
        }

        ensure(state.rejected == expected_neutral, || {
            format!("{} rejections for {} neutrals", state.rejected, expected_neutral)
        })?;
        ensure(state.pool.len() == expected_charged, || {
            format!("pool holds {} tracks, expected {}", state.pool.len(), expected_charged)
        })?;
        ensure(state.pool.tracks().all(|track| track.charge() != 0), || {
            "zero-charge track in pool".to_string()
        })
    }

    // ========================================================================
    // EVT-005: CLUSTER MATCHING
    // ========================================================================

    fn run_cluster_matching(&self, state: &mut EventState) -> Result<(), SimError> {
        let mut clusterless = 0;

        for index in 0..self.num_particles {
            let particle = state.oracle.charged_particle();
            let track_id = state.build(&particle)?;
            state
                .pool
                .set_mc_particle_weights(&track_id, EventState::pure_weights(particle.id))?;

            let reaches_calorimeter = state
                .pool
                .get(&track_id)
                .map(|track| track.reaches_calorimeter())
                .unwrap_or(false);

            if !reaches_calorimeter {
                clusterless += 1;
                continue;
            }

            let cluster = ClusterId::from_seed(index as u64);
            let stray = ClusterId::from_seed((index + self.num_particles) as u64);

            state.pool.associate_cluster(&track_id, cluster)?;

            match state.pool.associate_cluster(&track_id, stray) {
                Err(TrackError::AlreadyInitialized) => {}
                other => return Err(SimError::Assertion(format!("re-association returned {:?}", other))),
            }

            match state.pool.remove_cluster_association(&track_id, stray) {
                Err(TrackError::NotFound) => {}
                other => return Err(SimError::Assertion(format!("wrong removal returned {:?}", other))),
            }

            let associated = state.pool.get(&track_id).map(|track| track.associated_cluster());
            ensure(associated == Some(Ok(cluster)), || {
                format!("track {} lost cluster {}", track_id, cluster)
            })?;

            // Track + cluster consumed by a charged PFO
            state.pool.set_availability(&track_id, false)?;
        }

        let available = state.pool.available_tracks().count();
        ensure(available == clusterless, || {
            format!("{} tracks available, expected {} clusterless", available, clusterless)
        })?;
        ensure(
            state.pool.available_tracks().all(|track| !track.has_associated_cluster()),
            || "available track still holds a cluster".to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_clean_scenario() {
        let result = ScenarioRunner::new(42).with_particles(30).run(ScenarioId::Clean);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.tracks_built, 30);
        assert_eq!(result.report.efficiency(), 1.0);
    }

    #[test]
    fn test_contaminated_scenario() {
        let result = ScenarioRunner::new(7).with_particles(40).run(ScenarioId::Contaminated);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.report.mismatched, 0);
    }

    #[test]
    fn test_decay_chain_scenario() {
        let (result, pool) = ScenarioRunner::new(3).with_particles(20).run_detailed(ScenarioId::DecayChain);
        assert!(result.passed, "{:?}", result.failure_reason);

        // 5 parents with 3 daughters each; parents removed at the end
        assert_eq!(result.tracks_built, 20);
        assert_eq!(pool.len(), 15);
        assert_eq!(result.report.missing_tracks, 5);
    }

    #[test]
    fn test_neutral_rejection_scenario() {
        let result = ScenarioRunner::new(11).with_particles(30).run(ScenarioId::NeutralRejection);
        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.tracks_rejected, 10);
        assert_eq!(result.tracks_built, 20);
    }

    #[test]
    fn test_cluster_matching_scenario() {
        let result = ScenarioRunner::new(5).with_particles(30).run(ScenarioId::ClusterMatching);
        assert!(result.passed, "{:?}", result.failure_reason);
    }

    #[test]
    fn test_runs_are_deterministic() {
        let runner = ScenarioRunner::new(99).with_particles(25);
        let a = runner.run(ScenarioId::Contaminated);
        let b = runner.run(ScenarioId::Contaminated);
        assert_eq!(a.report, b.report);
    }

    #[test]
    fn test_invalid_field_fails_cleanly() {
        let result = ScenarioRunner::new(1).with_field(f64::NAN).run(ScenarioId::Clean);
        assert!(!result.passed);
        assert_eq!(result.tracks_built, 0);
        assert!(result.failure_reason.is_some());
    }

    #[test]
    fn test_zero_field_still_builds_tracks() {
        let result = ScenarioRunner::new(8).with_field(0.0).with_particles(10).run(ScenarioId::Clean);
        assert!(result.passed, "{:?}", result.failure_reason);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_scenarios_pass_for_any_seed(seed in any::<u64>(), particles in 1usize..24) {
            let runner = ScenarioRunner::new(seed).with_particles(particles);
            for scenario in [ScenarioId::Clean, ScenarioId::Contaminated, ScenarioId::DecayChain] {
                let result = runner.run(scenario);
                prop_assert!(result.passed, "{}: {:?}", scenario, result.failure_reason);
            }
        }
    }
}
