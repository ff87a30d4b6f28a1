//! The TRACK entity - a reconstructed charged-particle trajectory
//!
//! A Track is built once from a validated parameter bundle and never changes
//! its kinematics afterwards. What does change over the life of an event:
//! - Hierarchy links to other Tracks (parents, daughters, siblings)
//! - The association to at most one calorimeter Cluster
//! - The Monte-Carlo truth weights used for validation
//! - Whether a particle-flow object has already consumed it
//!
//! Every link is a non-owning handle. The event-level `TrackPool` owns the
//! Tracks and resolves handles; a Track only ever owns its helix fit.

use crate::pflow_handles::{ClusterId, McParticleId, TrackId};
use crate::pflow_helix::Helix;
use crate::pflow_truth::McParticleWeightMap;
use nalgebra::Vector3;
use pflow_env::{DetectorAddress, EnvError, FieldLookup};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use tracing::trace;

// ============================================================================
// INPUT
// ============================================================================

/// Position and momentum at one point along a track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackState {
    /// Position (mm)
    pub position: Vector3<f64>,

    /// Momentum (GeV/c)
    pub momentum: Vector3<f64>,
}

impl TrackState {
    pub fn new(position: Vector3<f64>, momentum: Vector3<f64>) -> Self {
        Self { position, momentum }
    }

    /// Magnitude of the momentum.
    #[inline]
    pub fn momentum_magnitude(&self) -> f64 {
        self.momentum.norm()
    }
}

/// Everything needed to build a Track.
///
/// The producer is expected to have filled every field; no field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackParameters {
    /// Transverse impact parameter (mm)
    pub d0: f64,

    /// Longitudinal impact parameter (mm)
    pub z0: f64,

    /// PDG code of the particle hypothesis
    pub particle_id: i32,

    /// Charge in units of e, must be non-zero
    pub charge: i32,

    /// Mass of the particle hypothesis (GeV/c²)
    pub mass: f64,

    /// Momentum at the distance of closest approach (GeV/c)
    pub momentum_at_dca: Vector3<f64>,

    pub track_state_at_start: TrackState,
    pub track_state_at_end: TrackState,
    pub track_state_at_calorimeter: TrackState,

    /// Time at the calorimeter (ns)
    pub time_at_calorimeter: f64,

    pub reaches_calorimeter: bool,
    pub is_projected_to_end_cap: bool,

    /// May seed a particle-flow object together with a cluster
    pub can_form_pfo: bool,

    /// May seed a particle-flow object without any cluster
    pub can_form_clusterless_pfo: bool,

    /// Detector-level track this was built from
    pub parent_address: DetectorAddress,
}

// ============================================================================
// TRACK
// ============================================================================

/// A reconstructed track.
///
/// Invariants, established by the constructor and never broken afterwards:
/// - charge is non-zero
/// - energy at the DCA is non-zero
/// - exactly one helix fit exists, owned by the Track
/// - relationship sets hold no nil handles and no duplicates
/// - the associated cluster, once set, is only replaced after an explicit removal
#[derive(Debug)]
pub struct Track {
    id: TrackId,

    // === Kinematics (immutable) ===
    d0: f64,
    z0: f64,
    particle_id: i32,
    charge: i32,
    mass: f64,
    momentum_at_dca: Vector3<f64>,
    momentum_magnitude_at_dca: f64,
    energy_at_dca: f64,

    track_state_at_start: TrackState,
    track_state_at_end: TrackState,
    track_state_at_calorimeter: TrackState,
    time_at_calorimeter: f64,

    reaches_calorimeter: bool,
    is_projected_to_end_cap: bool,
    can_form_pfo: bool,
    can_form_clusterless_pfo: bool,

    parent_address: DetectorAddress,

    /// Helix fitted to the calorimeter state
    helix_fit_at_calorimeter: Helix,

    // === Relationships (non-owning) ===
    associated_cluster: Option<ClusterId>,
    parent_tracks: HashSet<TrackId>,
    daughter_tracks: HashSet<TrackId>,
    sibling_tracks: HashSet<TrackId>,

    mc_particle_weight_map: McParticleWeightMap,

    /// False once a particle-flow object has consumed this track
    is_available: bool,
}

impl Track {
    /// Build a Track with a fresh random identity.
    pub fn new<F>(parameters: &TrackParameters, field: &F) -> Result<Self, TrackError>
    where
        F: FieldLookup + ?Sized,
    {
        Self::with_id(TrackId::new(), parameters, field)
    }

    /// Build a Track with the given identity.
    ///
    /// Fails with `InvalidParameter` if the charge is zero or the derived
    /// energy at the DCA is zero. The field is read once, at the detector
    /// origin rather than at the track's own position, and used to fit the
    /// helix at the calorimeter state. Field lookup failures are passed through.
    pub fn with_id<F>(id: TrackId, parameters: &TrackParameters, field: &F) -> Result<Self, TrackError>
    where
        F: FieldLookup + ?Sized,
    {
        if id.is_nil() {
            return Err(TrackError::InvalidParameter("track id is nil"));
        }

        let momentum_magnitude_at_dca = parameters.momentum_at_dca.norm();
        let energy_at_dca =
            (parameters.mass * parameters.mass + momentum_magnitude_at_dca * momentum_magnitude_at_dca).sqrt();

        if energy_at_dca == 0.0 {
            return Err(TrackError::InvalidParameter("energy at DCA is zero"));
        }

        if parameters.charge == 0 {
            return Err(TrackError::InvalidParameter("charge is zero"));
        }

        let field_tesla = field.field_at(&Vector3::zeros())?;
        let calorimeter_state = parameters.track_state_at_calorimeter;
        let helix_fit_at_calorimeter = Helix::new(
            calorimeter_state.position,
            calorimeter_state.momentum,
            f64::from(parameters.charge),
            field_tesla,
        );

        trace!(
            track = %id,
            charge = parameters.charge,
            energy = energy_at_dca,
            field = field_tesla,
            "track constructed"
        );

        Ok(Self {
            id,
            d0: parameters.d0,
            z0: parameters.z0,
            particle_id: parameters.particle_id,
            charge: parameters.charge,
            mass: parameters.mass,
            momentum_at_dca: parameters.momentum_at_dca,
            momentum_magnitude_at_dca,
            energy_at_dca,
            track_state_at_start: parameters.track_state_at_start,
            track_state_at_end: parameters.track_state_at_end,
            track_state_at_calorimeter: calorimeter_state,
            time_at_calorimeter: parameters.time_at_calorimeter,
            reaches_calorimeter: parameters.reaches_calorimeter,
            is_projected_to_end_cap: parameters.is_projected_to_end_cap,
            can_form_pfo: parameters.can_form_pfo,
            can_form_clusterless_pfo: parameters.can_form_clusterless_pfo,
            parent_address: parameters.parent_address,
            helix_fit_at_calorimeter,
            associated_cluster: None,
            parent_tracks: HashSet::new(),
            daughter_tracks: HashSet::new(),
            sibling_tracks: HashSet::new(),
            mc_particle_weight_map: McParticleWeightMap::new(),
            is_available: true,
        })
    }

    // ========================================================================
    // MONTE-CARLO TRUTH
    // ========================================================================

    /// The MC particle contributing the largest weight to this track.
    ///
    /// Ties go to the entry that comes first in the weight map.
    pub fn main_mc_particle(&self) -> Result<McParticleId, TrackError> {
        self.mc_particle_weight_map
            .main_particle()
            .ok_or(TrackError::NotInitialized)
    }

    /// Replace the whole truth-weight map.
    pub fn set_mc_particle_weight_map(&mut self, mc_particle_weight_map: McParticleWeightMap) {
        self.mc_particle_weight_map = mc_particle_weight_map;
    }

    /// Drop all truth associations.
    pub fn remove_mc_particles(&mut self) {
        self.mc_particle_weight_map.clear();
    }

    pub fn mc_particle_weight_map(&self) -> &McParticleWeightMap {
        &self.mc_particle_weight_map
    }

    // ========================================================================
    // CLUSTER ASSOCIATION
    // ========================================================================

    /// Associate a cluster with this track.
    ///
    /// Any existing association blocks the call, even for the same cluster.
    pub fn set_associated_cluster(&mut self, cluster: ClusterId) -> Result<(), TrackError> {
        if cluster.is_nil() {
            return Err(TrackError::InvalidParameter("cluster reference is nil"));
        }

        if self.associated_cluster.is_some() {
            return Err(TrackError::AlreadyInitialized);
        }

        self.associated_cluster = Some(cluster);
        Ok(())
    }

    /// Remove the association to `cluster`.
    ///
    /// Fails with `NotFound` unless `cluster` is the one currently associated.
    pub fn remove_associated_cluster(&mut self, cluster: ClusterId) -> Result<(), TrackError> {
        if self.associated_cluster != Some(cluster) {
            return Err(TrackError::NotFound);
        }

        self.associated_cluster = None;
        Ok(())
    }

    /// The associated cluster, or `NotInitialized` if there is none.
    pub fn associated_cluster(&self) -> Result<ClusterId, TrackError> {
        self.associated_cluster.ok_or(TrackError::NotInitialized)
    }

    pub fn has_associated_cluster(&self) -> bool {
        self.associated_cluster.is_some()
    }

    // ========================================================================
    // HIERARCHY
    // ========================================================================

    /// Record `track` as a parent of this track.
    ///
    /// Only this track's set changes; the caller is responsible for the
    /// matching daughter link on the other side.
    pub fn add_parent(&mut self, track: TrackId) -> Result<(), TrackError> {
        Self::insert_link(&mut self.parent_tracks, track)
    }

    /// Record `track` as a daughter of this track.
    pub fn add_daughter(&mut self, track: TrackId) -> Result<(), TrackError> {
        Self::insert_link(&mut self.daughter_tracks, track)
    }

    /// Record `track` as a sibling of this track.
    pub fn add_sibling(&mut self, track: TrackId) -> Result<(), TrackError> {
        Self::insert_link(&mut self.sibling_tracks, track)
    }

    fn insert_link(set: &mut HashSet<TrackId>, track: TrackId) -> Result<(), TrackError> {
        if track.is_nil() {
            return Err(TrackError::InvalidParameter("track reference is nil"));
        }

        if !set.insert(track) {
            return Err(TrackError::AlreadyPresent(track));
        }

        Ok(())
    }

    pub fn parents(&self) -> &HashSet<TrackId> {
        &self.parent_tracks
    }

    pub fn daughters(&self) -> &HashSet<TrackId> {
        &self.daughter_tracks
    }

    pub fn siblings(&self) -> &HashSet<TrackId> {
        &self.sibling_tracks
    }

    // ========================================================================
    // AVAILABILITY
    // ========================================================================

    /// True until a particle-flow object takes ownership of this track's energy.
    pub fn is_available(&self) -> bool {
        self.is_available
    }

    pub fn set_availability(&mut self, is_available: bool) {
        self.is_available = is_available;
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn d0(&self) -> f64 {
        self.d0
    }

    pub fn z0(&self) -> f64 {
        self.z0
    }

    pub fn particle_id(&self) -> i32 {
        self.particle_id
    }

    pub fn charge(&self) -> i32 {
        self.charge
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    pub fn momentum_at_dca(&self) -> &Vector3<f64> {
        &self.momentum_at_dca
    }

    pub fn momentum_magnitude_at_dca(&self) -> f64 {
        self.momentum_magnitude_at_dca
    }

    /// sqrt(m² + |p|²) at the DCA.
    pub fn energy_at_dca(&self) -> f64 {
        self.energy_at_dca
    }

    pub fn track_state_at_start(&self) -> &TrackState {
        &self.track_state_at_start
    }

    pub fn track_state_at_end(&self) -> &TrackState {
        &self.track_state_at_end
    }

    pub fn track_state_at_calorimeter(&self) -> &TrackState {
        &self.track_state_at_calorimeter
    }

    pub fn time_at_calorimeter(&self) -> f64 {
        self.time_at_calorimeter
    }

    pub fn reaches_calorimeter(&self) -> bool {
        self.reaches_calorimeter
    }

    pub fn is_projected_to_end_cap(&self) -> bool {
        self.is_projected_to_end_cap
    }

    pub fn can_form_pfo(&self) -> bool {
        self.can_form_pfo
    }

    pub fn can_form_clusterless_pfo(&self) -> bool {
        self.can_form_clusterless_pfo
    }

    pub fn parent_address(&self) -> DetectorAddress {
        self.parent_address
    }

    pub fn helix_fit_at_calorimeter(&self) -> &Helix {
        &self.helix_fit_at_calorimeter
    }
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.momentum_at_dca;
        writeln!(f, " Track: ")?;
        writeln!(f, " d0     {}", self.d0)?;
        writeln!(f, " z0     {}", self.z0)?;
        writeln!(f, " p0     ({}, {}, {})", p.x, p.y, p.z)
    }
}

// ============================================================================
// ERRORS
// ============================================================================

/// Errors raised by Track construction, Track mutators and the track pool.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TrackError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(&'static str),

    #[error("Association already initialized")]
    AlreadyInitialized,

    #[error("Track already present: {0}")]
    AlreadyPresent(TrackId),

    #[error("Association not found")]
    NotFound,

    #[error("Not initialized")]
    NotInitialized,

    #[error("Track not found: {0}")]
    TrackNotFound(TrackId),

    #[error("Field lookup failed: {0}")]
    Field(#[from] EnvError),
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pflow_env::{SolenoidField, UniformField};
    use proptest::prelude::*;
    use std::sync::Mutex;

    fn sample_parameters() -> TrackParameters {
        TrackParameters {
            d0: 0.12,
            z0: -0.4,
            particle_id: 211,
            charge: 1,
            mass: 0.13957,
            momentum_at_dca: Vector3::new(3.0, 4.0, 1.0),
            track_state_at_start: TrackState::new(Vector3::new(0.1, 0.0, -0.4), Vector3::new(3.0, 4.0, 1.0)),
            track_state_at_end: TrackState::new(Vector3::new(1200.0, 1500.0, 400.0), Vector3::new(2.9, 4.1, 1.0)),
            track_state_at_calorimeter: TrackState::new(
                Vector3::new(1250.0, 1560.0, 420.0),
                Vector3::new(2.8, 4.15, 1.0),
            ),
            time_at_calorimeter: 6.7,
            reaches_calorimeter: true,
            is_projected_to_end_cap: false,
            can_form_pfo: true,
            can_form_clusterless_pfo: false,
            parent_address: DetectorAddress::new(0xbeef),
        }
    }

    fn field() -> UniformField {
        UniformField::new(3.5).unwrap()
    }

    fn sample_track() -> Track {
        Track::new(&sample_parameters(), &field()).unwrap()
    }

    /// Field that remembers where it was queried.
    struct RecordingField {
        queried: Mutex<Vec<Vector3<f64>>>,
    }

    impl FieldLookup for RecordingField {
        fn field_at(&self, position: &Vector3<f64>) -> Result<f64, EnvError> {
            self.queried.lock().unwrap().push(*position);
            Ok(2.0)
        }
    }

    struct BrokenField;

    impl FieldLookup for BrokenField {
        fn field_at(&self, _position: &Vector3<f64>) -> Result<f64, EnvError> {
            Err(EnvError::lookup_failed("geometry not loaded"))
        }
    }

    #[test]
    fn test_construction_copies_parameters() {
        let parameters = sample_parameters();
        let track = Track::new(&parameters, &field()).unwrap();

        assert_eq!(track.d0(), 0.12);
        assert_eq!(track.z0(), -0.4);
        assert_eq!(track.particle_id(), 211);
        assert_eq!(track.charge(), 1);
        assert_eq!(track.mass(), 0.13957);
        assert_eq!(track.momentum_at_dca(), &parameters.momentum_at_dca);
        assert_eq!(track.track_state_at_start(), &parameters.track_state_at_start);
        assert_eq!(track.track_state_at_end(), &parameters.track_state_at_end);
        assert_eq!(track.track_state_at_calorimeter(), &parameters.track_state_at_calorimeter);
        assert_eq!(track.time_at_calorimeter(), 6.7);
        assert!(track.reaches_calorimeter());
        assert!(!track.is_projected_to_end_cap());
        assert!(track.can_form_pfo());
        assert!(!track.can_form_clusterless_pfo());
        assert_eq!(track.parent_address(), DetectorAddress::new(0xbeef));
    }

    #[test]
    fn test_construction_derives_energy() {
        let track = sample_track();

        assert_relative_eq!(track.momentum_magnitude_at_dca(), 26.0_f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(
            track.energy_at_dca(),
            (0.13957_f64.powi(2) + 26.0).sqrt(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_construction_initial_state() {
        let track = sample_track();

        assert!(track.is_available());
        assert!(!track.has_associated_cluster());
        assert_eq!(track.associated_cluster(), Err(TrackError::NotInitialized));
        assert!(track.parents().is_empty());
        assert!(track.daughters().is_empty());
        assert!(track.siblings().is_empty());
        assert!(track.mc_particle_weight_map().is_empty());
    }

    #[test]
    fn test_zero_charge_rejected() {
        let parameters = TrackParameters { charge: 0, ..sample_parameters() };
        let result = Track::new(&parameters, &field());
        assert!(matches!(result, Err(TrackError::InvalidParameter(_))));
    }

    #[test]
    fn test_zero_energy_rejected() {
        let parameters = TrackParameters {
            mass: 0.0,
            momentum_at_dca: Vector3::zeros(),
            ..sample_parameters()
        };
        let result = Track::new(&parameters, &field());
        assert!(matches!(result, Err(TrackError::InvalidParameter(_))));
    }

    #[test]
    fn test_massless_track_with_momentum_accepted() {
        let parameters = TrackParameters { mass: 0.0, ..sample_parameters() };
        let track = Track::new(&parameters, &field()).unwrap();
        assert_relative_eq!(track.energy_at_dca(), track.momentum_magnitude_at_dca());
    }

    #[test]
    fn test_resting_massive_track_accepted() {
        let parameters = TrackParameters {
            momentum_at_dca: Vector3::zeros(),
            ..sample_parameters()
        };
        let track = Track::new(&parameters, &field()).unwrap();
        assert_relative_eq!(track.energy_at_dca(), 0.13957);
    }

    #[test]
    fn test_nil_id_rejected() {
        let result = Track::with_id(TrackId::nil(), &sample_parameters(), &field());
        assert!(matches!(result, Err(TrackError::InvalidParameter(_))));
    }

    #[test]
    fn test_field_queried_at_origin_only() {
        let recorder = RecordingField { queried: Mutex::new(Vec::new()) };
        let track = Track::new(&sample_parameters(), &recorder).unwrap();

        let queried = recorder.queried.lock().unwrap();
        assert_eq!(queried.as_slice(), &[Vector3::<f64>::zeros()]);
        assert_eq!(track.helix_fit_at_calorimeter().field_tesla(), 2.0);
    }

    #[test]
    fn test_helix_fitted_at_calorimeter_state() {
        // Calorimeter state sits outside the coil, but the field comes from the origin
        let solenoid = SolenoidField::new(3.5, -1.5, 1000.0, 2000.0, 8000.0).unwrap();
        let parameters = sample_parameters();
        let track = Track::new(&parameters, &solenoid).unwrap();

        let helix = track.helix_fit_at_calorimeter();
        assert_eq!(helix.field_tesla(), 3.5);
        assert_eq!(helix.reference_point(), &parameters.track_state_at_calorimeter.position);
        assert_eq!(helix.momentum(), &parameters.track_state_at_calorimeter.momentum);
        assert_eq!(helix.charge(), 1.0);
    }

    #[test]
    fn test_field_failure_propagates() {
        let result = Track::new(&sample_parameters(), &BrokenField);
        assert!(matches!(result, Err(TrackError::Field(EnvError::LookupFailed(_)))));
    }

    #[test]
    fn test_dyn_field_lookup() {
        let boxed: Box<dyn FieldLookup> = Box::new(field());
        let track = Track::new(&sample_parameters(), boxed.as_ref()).unwrap();
        assert_eq!(track.helix_fit_at_calorimeter().field_tesla(), 3.5);
    }

    #[test]
    fn test_main_mc_particle_empty() {
        let track = sample_track();
        assert_eq!(track.main_mc_particle(), Err(TrackError::NotInitialized));
    }

    #[test]
    fn test_main_mc_particle_first_maximum_wins() {
        let mut track = sample_track();
        let a = McParticleId::from_seed(1);
        let b = McParticleId::from_seed(2);
        let c = McParticleId::from_seed(3);

        track.set_mc_particle_weight_map(vec![(a, 0.3), (b, 0.7), (c, 0.7)].into_iter().collect());
        assert_eq!(track.main_mc_particle(), Ok(b));
    }

    #[test]
    fn test_weight_map_replaced_wholesale() {
        let mut track = sample_track();
        let a = McParticleId::from_seed(1);
        let b = McParticleId::from_seed(2);

        track.set_mc_particle_weight_map(vec![(a, 1.0)].into_iter().collect());
        track.set_mc_particle_weight_map(vec![(b, 0.4)].into_iter().collect());

        assert_eq!(track.mc_particle_weight_map().len(), 1);
        assert!(!track.mc_particle_weight_map().contains(&a));
        assert_eq!(track.main_mc_particle(), Ok(b));
    }

    #[test]
    fn test_remove_mc_particles() {
        let mut track = sample_track();
        track.set_mc_particle_weight_map(vec![(McParticleId::from_seed(1), 1.0)].into_iter().collect());

        track.remove_mc_particles();
        assert!(track.mc_particle_weight_map().is_empty());
        assert_eq!(track.main_mc_particle(), Err(TrackError::NotInitialized));

        // Removing again is harmless
        track.remove_mc_particles();
        assert!(track.mc_particle_weight_map().is_empty());
    }

    #[test]
    fn test_cluster_association_lifecycle() {
        let mut track = sample_track();
        let x = ClusterId::from_seed(1);

        assert_eq!(track.set_associated_cluster(x), Ok(()));
        assert_eq!(track.associated_cluster(), Ok(x));

        assert_eq!(track.remove_associated_cluster(x), Ok(()));
        assert!(!track.has_associated_cluster());

        // Can be set again after removal
        assert_eq!(track.set_associated_cluster(x), Ok(()));
    }

    #[test]
    fn test_second_cluster_rejected() {
        let mut track = sample_track();
        let x = ClusterId::from_seed(1);
        let y = ClusterId::from_seed(2);

        track.set_associated_cluster(x).unwrap();
        assert_eq!(track.set_associated_cluster(y), Err(TrackError::AlreadyInitialized));
        assert_eq!(track.set_associated_cluster(x), Err(TrackError::AlreadyInitialized));
        assert_eq!(track.associated_cluster(), Ok(x));
    }

    #[test]
    fn test_nil_cluster_rejected() {
        let mut track = sample_track();
        assert!(matches!(
            track.set_associated_cluster(ClusterId::nil()),
            Err(TrackError::InvalidParameter(_))
        ));
        assert!(!track.has_associated_cluster());
    }

    #[test]
    fn test_remove_unassociated_cluster() {
        let mut track = sample_track();
        let x = ClusterId::from_seed(1);
        let z = ClusterId::from_seed(3);

        assert_eq!(track.remove_associated_cluster(x), Err(TrackError::NotFound));
        assert_eq!(track.remove_associated_cluster(ClusterId::nil()), Err(TrackError::NotFound));

        track.set_associated_cluster(z).unwrap();
        assert_eq!(track.remove_associated_cluster(x), Err(TrackError::NotFound));
        assert_eq!(track.associated_cluster(), Ok(z));
    }

    #[test]
    fn test_duplicate_parent_rejected() {
        let mut track = sample_track();
        let parent = TrackId::from_seed(10);

        assert_eq!(track.add_parent(parent), Ok(()));
        assert_eq!(track.add_parent(parent), Err(TrackError::AlreadyPresent(parent)));
        assert_eq!(track.parents().len(), 1);
        assert!(track.parents().contains(&parent));
    }

    #[test]
    fn test_nil_links_rejected() {
        let mut track = sample_track();

        assert!(matches!(track.add_parent(TrackId::nil()), Err(TrackError::InvalidParameter(_))));
        assert!(matches!(track.add_daughter(TrackId::nil()), Err(TrackError::InvalidParameter(_))));
        assert!(matches!(track.add_sibling(TrackId::nil()), Err(TrackError::InvalidParameter(_))));

        assert!(track.parents().is_empty());
        assert!(track.daughters().is_empty());
        assert!(track.siblings().is_empty());
    }

    #[test]
    fn test_link_sets_are_independent() {
        let mut track = sample_track();
        let other = TrackId::from_seed(5);

        // The same track may appear in every set; sets do not check each other
        track.add_parent(other).unwrap();
        track.add_daughter(other).unwrap();
        track.add_sibling(other).unwrap();

        assert_eq!(track.add_daughter(other), Err(TrackError::AlreadyPresent(other)));
        assert_eq!(track.add_sibling(other), Err(TrackError::AlreadyPresent(other)));
        assert_eq!(track.daughters().len(), 1);
        assert_eq!(track.siblings().len(), 1);
    }

    #[test]
    fn test_links_are_not_symmetric() {
        let mut a = sample_track();
        let b = sample_track();

        a.add_parent(b.id()).unwrap();
        assert!(b.daughters().is_empty());
    }

    #[test]
    fn test_availability_flag() {
        let mut track = sample_track();
        track.set_availability(false);
        assert!(!track.is_available());
        track.set_availability(true);
        assert!(track.is_available());
    }

    #[test]
    fn test_display_summary() {
        let track = sample_track();
        let dump = track.to_string();

        assert!(dump.starts_with(" Track: "));
        assert!(dump.contains(" d0     0.12"));
        assert!(dump.contains(" z0     -0.4"));
        assert!(dump.contains(" p0     (3, 4, 1)"));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Property: any non-zero charge with non-zero energy builds, and accessors echo the input
        #[test]
        fn prop_valid_parameters_construct(
            charge in prop_oneof![-3i32..=-1, 1i32..=3],
            mass in 0.0f64..10.0,
            px in -50.0f64..50.0,
            py in -50.0f64..50.0,
            pz in -50.0f64..50.0,
            d0 in -10.0f64..10.0,
            z0 in -10.0f64..10.0,
        ) {
            let momentum = Vector3::new(px, py, pz);
            prop_assume!(mass > 1e-3 || momentum.norm() > 1e-3);

            let parameters = TrackParameters {
                charge,
                mass,
                d0,
                z0,
                momentum_at_dca: momentum,
                ..sample_parameters()
            };
            let track = Track::new(&parameters, &field()).unwrap();

            prop_assert_eq!(track.charge(), charge);
            prop_assert_eq!(track.mass(), mass);
            prop_assert_eq!(track.d0(), d0);
            prop_assert_eq!(track.z0(), z0);
            prop_assert_eq!(track.momentum_at_dca(), &momentum);
            prop_assert!(track.energy_at_dca() > 0.0);
        }

        /// Property: zero charge never builds
        #[test]
        fn prop_zero_charge_fails(mass in 0.0f64..10.0, pz in -50.0f64..50.0) {
            let parameters = TrackParameters {
                charge: 0,
                mass,
                momentum_at_dca: Vector3::new(0.0, 0.0, pz),
                ..sample_parameters()
            };
            prop_assert!(matches!(Track::new(&parameters, &field()), Err(TrackError::InvalidParameter(_))));
        }
    }
}
