//! Ground truth oracle for event simulation.
//!
//! The Oracle plays the role of the event generator plus detector:
//! - True particles (species, charge, mass, momentum, production vertex)
//! - Decays that produce parent/daughter/sibling topologies
//! - Smeared track parameters as the tracking code would hand them over
//! - Truth weight maps, optionally contaminated by a second particle

use crate::SimError;
use nalgebra::Vector3;
use pflow_core::{Helix, McParticleId, McParticleWeightMap, TrackId, TrackParameters, TrackState};
use pflow_env::DetectorAddress;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Speed of light in mm/ns.
const SPEED_OF_LIGHT: f64 = 299.792458;

/// Charged species the generator draws from: (PDG code, charge, mass in GeV).
const CHARGED_SPECIES: [(i32, i32, f64); 10] = [
    (211, 1, 0.13957),
    (-211, -1, 0.13957),
    (321, 1, 0.493677),
    (-321, -1, 0.493677),
    (11, -1, 0.000511),
    (-11, 1, 0.000511),
    (13, -1, 0.105658),
    (-13, 1, 0.105658),
    (2212, 1, 0.938272),
    (-2212, -1, 0.938272),
];

/// Neutral species: photon, neutron, K0-long.
const NEUTRAL_SPECIES: [(i32, i32, f64); 3] = [(22, 0, 0.0), (2112, 0, 0.939565), (130, 0, 0.497611)];

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Event generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    /// Momentum range of primary particles (GeV/c)
    pub min_momentum: f64,
    pub max_momentum: f64,

    /// Relative momentum resolution of the tracker
    pub momentum_smearing: f64,

    /// Largest weight handed to a contaminating particle, at most 0.5
    pub max_contamination: f64,

    /// Inner radius of the calorimeter barrel (mm)
    pub calorimeter_radius: f64,

    /// Half length of the calorimeter barrel (mm)
    pub calorimeter_half_length: f64,

    /// Outer radius of the tracker (mm)
    pub tracker_radius: f64,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            min_momentum: 0.5,
            max_momentum: 50.0,
            momentum_smearing: 0.001, // 0.1% at the DCA
            max_contamination: 0.3,
            calorimeter_radius: 1800.0,
            calorimeter_half_length: 2350.0,
            tracker_radius: 1700.0,
        }
    }
}

impl EventConfig {
    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<(), SimError> {
        if !self.max_momentum.is_finite() {
            return Err(SimError::InvalidConfig(format!("non-finite max momentum {}", self.max_momentum)));
        }

        if !(self.min_momentum > 0.0) || !(self.max_momentum > self.min_momentum) {
            return Err(SimError::InvalidConfig(format!(
                "momentum range [{}, {}] is empty",
                self.min_momentum, self.max_momentum
            )));
        }

        if !(0.0..=0.5).contains(&self.max_contamination) {
            return Err(SimError::InvalidConfig(format!(
                "contamination {} outside [0, 0.5]",
                self.max_contamination
            )));
        }

        if !self.momentum_smearing.is_finite() || self.momentum_smearing < 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "momentum smearing {} must be finite and non-negative",
                self.momentum_smearing
            )));
        }

        if !self.calorimeter_radius.is_finite() || !self.calorimeter_half_length.is_finite() {
            return Err(SimError::InvalidConfig("calorimeter dimensions must be finite".to_string()));
        }

        if !(self.tracker_radius > 0.0) || !(self.calorimeter_radius > self.tracker_radius) {
            return Err(SimError::InvalidConfig("tracker must sit inside the calorimeter".to_string()));
        }

        if !(self.calorimeter_half_length > 0.0) {
            return Err(SimError::InvalidConfig("calorimeter half length must be positive".to_string()));
        }

        Ok(())
    }
}

// ============================================================================
// TRUTH
// ============================================================================

/// A ground truth particle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TruthParticle {
    pub id: McParticleId,

    /// PDG code
    pub pdg: i32,

    /// Charge in units of e
    pub charge: i32,

    /// Mass (GeV/c²)
    pub mass: f64,

    /// Momentum at production (GeV/c)
    pub momentum: Vector3<f64>,

    /// Production vertex (mm)
    pub vertex: Vector3<f64>,

    /// Particle this one decayed from
    pub parent: Option<McParticleId>,
}

impl TruthParticle {
    pub fn energy(&self) -> f64 {
        (self.mass * self.mass + self.momentum.norm_squared()).sqrt()
    }

    pub fn is_charged(&self) -> bool {
        self.charge != 0
    }
}

/// A track as delivered by the tracking stage, with its true origin.
#[derive(Debug, Clone)]
pub struct GeneratedTrack {
    /// Identity the track should be built with
    pub track_id: TrackId,

    /// Particle that produced the hits
    pub origin: McParticleId,

    pub parameters: TrackParameters,
}

// ============================================================================
// ORACLE
// ============================================================================

/// The Oracle - generates truth particles and the tracks they leave.
pub struct Oracle {
    /// RNG for physics (kinematics, smearing, contamination)
    rng: ChaCha8Rng,

    config: EventConfig,

    smearing: Normal<f64>,

    /// Counters for deterministic identities
    next_particle: u64,
    next_track: u64,
    next_address: u64,
}

impl Oracle {
    /// Creates a new oracle with the given seed.
    pub fn new(seed: u64, config: EventConfig) -> Result<Self, SimError> {
        config.validate()?;

        let smearing = Normal::new(1.0, config.momentum_smearing)
            .map_err(|e| SimError::InvalidConfig(format!("momentum smearing: {}", e)))?;

        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            config,
            smearing,
            next_particle: 0,
            next_track: 0,
            next_address: 1,
        })
    }

    pub fn config(&self) -> &EventConfig {
        &self.config
    }

    fn next_particle_id(&mut self) -> McParticleId {
        let id = McParticleId::from_seed(self.next_particle);
        self.next_particle += 1;
        id
    }

    fn random_direction(&mut self) -> Vector3<f64> {
        let cos_theta: f64 = self.rng.gen_range(-0.95..0.95);
        let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();
        let phi: f64 = self.rng.gen_range(0.0..2.0 * PI);
        Vector3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta)
    }

    fn spawn(&mut self, species: (i32, i32, f64), momentum: Vector3<f64>, vertex: Vector3<f64>, parent: Option<McParticleId>) -> TruthParticle {
        let (pdg, charge, mass) = species;
        TruthParticle {
            id: self.next_particle_id(),
            pdg,
            charge,
            mass,
            momentum,
            vertex,
            parent,
        }
    }

    /// Generates a charged primary from the interaction point.
    pub fn charged_particle(&mut self) -> TruthParticle {
        let species = CHARGED_SPECIES[self.rng.gen_range(0..CHARGED_SPECIES.len())];
        let magnitude = self.rng.gen_range(self.config.min_momentum..self.config.max_momentum);
        let momentum = self.random_direction() * magnitude;
        let vertex = Vector3::new(
            self.rng.gen_range(-0.01..0.01),
            self.rng.gen_range(-0.01..0.01),
            self.rng.gen_range(-1.0..1.0),
        );

        self.spawn(species, momentum, vertex, None)
    }

    /// Generates a neutral primary, which the tracker never sees as a track.
    pub fn neutral_particle(&mut self) -> TruthParticle {
        let species = NEUTRAL_SPECIES[self.rng.gen_range(0..NEUTRAL_SPECIES.len())];
        let magnitude = self.rng.gen_range(self.config.min_momentum..self.config.max_momentum);
        let momentum = self.random_direction() * magnitude;

        self.spawn(species, momentum, Vector3::zeros(), None)
    }

    /// Three-prong decay of a charged parent into pions.
    ///
    /// Charge is conserved: two daughters carry the parent's charge sign, one
    /// the opposite. Daughter momenta sum to the parent's momentum.
    pub fn three_prong_decay(&mut self, parent: &TruthParticle) -> Vec<TruthParticle> {
        let sign = parent.charge.signum();
        let direction = parent.momentum.normalize();
        let decay_length: f64 = self.rng.gen_range(10.0..500.0);
        let vertex = parent.vertex + direction * decay_length;

        // Momentum fractions, strictly positive and summing to one
        let a: f64 = self.rng.gen_range(0.2..0.5);
        let b: f64 = self.rng.gen_range(0.2..0.4);
        let fractions = [a, b, 1.0 - a - b];

        // Transverse kicks that cancel between the first two daughters
        let kick = direction.cross(&Vector3::z()).try_normalize(1e-9).unwrap_or_else(|| Vector3::x())
            * self.rng.gen_range(0.0..0.2)
            * parent.momentum.norm();

        let momenta = [
            parent.momentum * fractions[0] + kick,
            parent.momentum * fractions[1] - kick,
            parent.momentum * fractions[2],
        ];
        let charges = [sign, sign, -sign];

        momenta
            .iter()
            .zip(charges)
            .map(|(momentum, charge)| {
                let pdg = 211 * charge;
                self.spawn((pdg, charge, 0.13957), *momentum, vertex, Some(parent.id))
            })
            .collect()
    }

    /// Smears a truth particle into the parameters the tracking stage would produce.
    pub fn track_parameters(&mut self, particle: &TruthParticle, field_tesla: f64) -> GeneratedTrack {
        let scale = self.smearing.sample(&mut self.rng).max(0.5);
        let momentum = particle.momentum * scale;

        let dca_helix = Helix::new(particle.vertex, momentum, f64::from(particle.charge), field_tesla);

        let direction = momentum.try_normalize(1e-12).unwrap_or_else(|| Vector3::z());
        let (end_position, _, _) = self.project_to_cylinder(
            &particle.vertex,
            &direction,
            self.config.tracker_radius,
            self.config.calorimeter_half_length,
        );
        let (calorimeter_position, is_projected_to_end_cap, path_length) = self.project_to_cylinder(
            &particle.vertex,
            &direction,
            self.config.calorimeter_radius,
            self.config.calorimeter_half_length,
        );

        // Looping tracks never get further out than the helix diameter
        let reaches_calorimeter = is_projected_to_end_cap || 2.0 * dca_helix.radius() >= self.config.calorimeter_radius;

        let energy = (particle.mass * particle.mass + momentum.norm_squared()).sqrt();
        let beta = if energy > 0.0 { momentum.norm() / energy } else { 1.0 };
        let time_at_calorimeter = path_length / (SPEED_OF_LIGHT * beta.max(1e-3));

        let parent_address = DetectorAddress::new(self.next_address);
        self.next_address += 1;

        let track_id = TrackId::from_seed(self.next_track);
        self.next_track += 1;

        let parameters = TrackParameters {
            d0: dca_helix.d0(),
            z0: dca_helix.z0(),
            particle_id: particle.pdg,
            charge: particle.charge,
            mass: particle.mass,
            momentum_at_dca: momentum,
            track_state_at_start: TrackState::new(particle.vertex, momentum),
            track_state_at_end: TrackState::new(end_position, momentum),
            track_state_at_calorimeter: TrackState::new(calorimeter_position, momentum),
            time_at_calorimeter,
            reaches_calorimeter,
            is_projected_to_end_cap,
            can_form_pfo: reaches_calorimeter,
            can_form_clusterless_pfo: !reaches_calorimeter,
            parent_address,
        };

        GeneratedTrack {
            track_id,
            origin: particle.id,
            parameters,
        }
    }

    /// Straight-line projection onto a closed cylinder around the z axis.
    ///
    /// Returns (intersection, hits the end cap, path length).
    fn project_to_cylinder(
        &self,
        start: &Vector3<f64>,
        direction: &Vector3<f64>,
        radius: f64,
        half_length: f64,
    ) -> (Vector3<f64>, bool, f64) {
        let transverse = direction.x.hypot(direction.y);
        let barrel_path = if transverse > 0.0 { radius / transverse } else { f64::INFINITY };
        let endcap_path = if direction.z != 0.0 {
            (half_length.copysign(direction.z) - start.z) / direction.z
        } else {
            f64::INFINITY
        };

        if endcap_path < barrel_path {
            (start + direction * endcap_path, true, endcap_path)
        } else {
            (start + direction * barrel_path, false, barrel_path)
        }
    }

    /// Truth weights for a track: the origin first, then maybe one contaminant.
    ///
    /// The contaminant weight stays at or below the origin's, and the origin
    /// is inserted first, so the origin is always the main particle.
    pub fn weights(&mut self, origin: McParticleId, others: &[McParticleId]) -> McParticleWeightMap {
        let candidates: Vec<McParticleId> = others.iter().copied().filter(|id| *id != origin).collect();

        if candidates.is_empty() || self.config.max_contamination == 0.0 {
            return std::iter::once((origin, 1.0)).collect();
        }

        let contaminant = candidates[self.rng.gen_range(0..candidates.len())];
        let fraction = self.rng.gen_range(0.0..=self.config.max_contamination);

        vec![(origin, 1.0 - fraction), (contaminant, fraction)].into_iter().collect()
    }
}
