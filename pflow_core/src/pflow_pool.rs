//! The event-level track registry.
//!
//! Tracks never own each other. The pool owns every Track of an event and is
//! the only place a `TrackId` is turned back into a Track. Removing a Track
//! leaves any handles other Tracks hold to it dangling; `resolve` skips those
//! rather than failing.

use crate::pflow_handles::{ClusterId, TrackId};
use crate::pflow_track::{Track, TrackError, TrackParameters};
use crate::pflow_truth::McParticleWeightMap;
use pflow_env::FieldLookup;
use std::collections::HashMap;
use tracing::debug;

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Configuration for the TrackPool
#[derive(Debug, Clone)]
pub struct TrackPoolConfig {
    /// Tracks to reserve room for (default: 256, a busy multi-jet event)
    pub initial_capacity: usize,
}

impl Default for TrackPoolConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 256,
        }
    }
}

// ============================================================================
// TRACK POOL
// ============================================================================

/// Owns the Tracks of one event and resolves handles to them.
pub struct TrackPool {
    tracks: HashMap<TrackId, Track>,
    config: TrackPoolConfig,
}

impl TrackPool {
    /// Create a new pool with the given configuration.
    pub fn new(config: TrackPoolConfig) -> Self {
        Self {
            tracks: HashMap::with_capacity(config.initial_capacity),
            config,
        }
    }

    /// Create a new pool with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(TrackPoolConfig::default())
    }

    pub fn config(&self) -> &TrackPoolConfig {
        &self.config
    }

    // ========================================================================
    // TRACK LIFECYCLE
    // ========================================================================

    /// Build a Track from parameters and take ownership of it.
    ///
    /// A failed construction leaves the pool untouched.
    pub fn create_track<F>(&mut self, parameters: &TrackParameters, field: &F) -> Result<TrackId, TrackError>
    where
        F: FieldLookup + ?Sized,
    {
        let track = Track::new(parameters, field)?;
        self.insert(track)
    }

    /// Take ownership of an already built Track.
    pub fn insert(&mut self, track: Track) -> Result<TrackId, TrackError> {
        let track_id = track.id();
        if self.tracks.contains_key(&track_id) {
            return Err(TrackError::AlreadyPresent(track_id));
        }

        self.tracks.insert(track_id, track);
        debug!(track = %track_id, total = self.tracks.len(), "track added to pool");

        Ok(track_id)
    }

    /// Remove a Track and hand it back to the caller.
    ///
    /// Tracks that link to it keep their handles; only this Track goes away.
    pub fn remove(&mut self, track_id: &TrackId) -> Result<Track, TrackError> {
        let track = self
            .tracks
            .remove(track_id)
            .ok_or(TrackError::TrackNotFound(*track_id))?;

        debug!(track = %track_id, total = self.tracks.len(), "track removed from pool");
        Ok(track)
    }

    /// Drop every Track (end of event).
    pub fn clear(&mut self) {
        debug!(count = self.tracks.len(), "clearing track pool");
        self.tracks.clear();
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    /// Get a reference to a track by its ID.
    pub fn get(&self, track_id: &TrackId) -> Option<&Track> {
        self.tracks.get(track_id)
    }

    /// Get a mutable reference to a track by its ID.
    pub fn get_mut(&mut self, track_id: &TrackId) -> Option<&mut Track> {
        self.tracks.get_mut(track_id)
    }

    pub fn contains(&self, track_id: &TrackId) -> bool {
        self.tracks.contains_key(track_id)
    }

    /// Get all tracks as an iterator.
    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    /// Tracks not yet consumed by a particle-flow object.
    pub fn available_tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values().filter(|track| track.is_available())
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    fn track_mut(&mut self, track_id: &TrackId) -> Result<&mut Track, TrackError> {
        self.tracks
            .get_mut(track_id)
            .ok_or(TrackError::TrackNotFound(*track_id))
    }

    fn track(&self, track_id: &TrackId) -> Result<&Track, TrackError> {
        self.tracks
            .get(track_id)
            .ok_or(TrackError::TrackNotFound(*track_id))
    }

    // ========================================================================
    // HANDLE RESOLUTION
    // ========================================================================

    /// The live Tracks among `track_ids`. Dangling handles are skipped.
    pub fn resolve<'a, I>(&self, track_ids: I) -> Vec<&Track>
    where
        I: IntoIterator<Item = &'a TrackId>,
    {
        track_ids
            .into_iter()
            .filter_map(|track_id| self.tracks.get(track_id))
            .collect()
    }

    pub fn parents_of(&self, track_id: &TrackId) -> Result<Vec<&Track>, TrackError> {
        Ok(self.resolve(self.track(track_id)?.parents()))
    }

    pub fn daughters_of(&self, track_id: &TrackId) -> Result<Vec<&Track>, TrackError> {
        Ok(self.resolve(self.track(track_id)?.daughters()))
    }

    pub fn siblings_of(&self, track_id: &TrackId) -> Result<Vec<&Track>, TrackError> {
        Ok(self.resolve(self.track(track_id)?.siblings()))
    }

    // ========================================================================
    // FRAMEWORK-LEVEL RELATIONSHIPS
    // ========================================================================

    /// Link `parent` and `daughter` on both sides.
    ///
    /// All checks run before either Track changes, so a failure leaves both
    /// untouched.
    pub fn set_parent_daughter(&mut self, parent: TrackId, daughter: TrackId) -> Result<(), TrackError> {
        if parent.is_nil() || daughter.is_nil() {
            return Err(TrackError::InvalidParameter("track reference is nil"));
        }

        if parent == daughter {
            return Err(TrackError::InvalidParameter("track cannot be its own parent"));
        }

        if self.track(&parent)?.daughters().contains(&daughter) {
            return Err(TrackError::AlreadyPresent(daughter));
        }

        if self.track(&daughter)?.parents().contains(&parent) {
            return Err(TrackError::AlreadyPresent(parent));
        }

        self.track_mut(&parent)?.add_daughter(daughter)?;
        self.track_mut(&daughter)?.add_parent(parent)?;

        debug!(parent = %parent, daughter = %daughter, "parent-daughter link");
        Ok(())
    }

    /// Link two Tracks as siblings on both sides.
    pub fn set_siblings(&mut self, first: TrackId, second: TrackId) -> Result<(), TrackError> {
        if first.is_nil() || second.is_nil() {
            return Err(TrackError::InvalidParameter("track reference is nil"));
        }

        if first == second {
            return Err(TrackError::InvalidParameter("track cannot be its own sibling"));
        }

        if self.track(&first)?.siblings().contains(&second) {
            return Err(TrackError::AlreadyPresent(second));
        }

        if self.track(&second)?.siblings().contains(&first) {
            return Err(TrackError::AlreadyPresent(first));
        }

        self.track_mut(&first)?.add_sibling(second)?;
        self.track_mut(&second)?.add_sibling(first)?;

        debug!(first = %first, second = %second, "sibling link");
        Ok(())
    }

    // ========================================================================
    // ID-ADDRESSED FORWARDING
    // ========================================================================

    pub fn associate_cluster(&mut self, track_id: &TrackId, cluster: ClusterId) -> Result<(), TrackError> {
        self.track_mut(track_id)?.set_associated_cluster(cluster)
    }

    pub fn remove_cluster_association(&mut self, track_id: &TrackId, cluster: ClusterId) -> Result<(), TrackError> {
        self.track_mut(track_id)?.remove_associated_cluster(cluster)
    }

    pub fn set_mc_particle_weights(
        &mut self,
        track_id: &TrackId,
        mc_particle_weight_map: McParticleWeightMap,
    ) -> Result<(), TrackError> {
        self.track_mut(track_id)?.set_mc_particle_weight_map(mc_particle_weight_map);
        Ok(())
    }

    pub fn set_availability(&mut self, track_id: &TrackId, is_available: bool) -> Result<(), TrackError> {
        self.track_mut(track_id)?.set_availability(is_available);
        Ok(())
    }
}

impl Default for TrackPool {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pflow_handles::McParticleId;
    use crate::pflow_track::TrackState;
    use nalgebra::Vector3;
    use pflow_env::{DetectorAddress, UniformField};

    fn parameters(charge: i32, px: f64) -> TrackParameters {
        let state = TrackState::new(Vector3::new(0.0, 0.0, 0.0), Vector3::new(px, 1.0, 0.5));
        TrackParameters {
            d0: 0.0,
            z0: 0.0,
            particle_id: 211 * charge,
            charge,
            mass: 0.13957,
            momentum_at_dca: state.momentum,
            track_state_at_start: state,
            track_state_at_end: state,
            track_state_at_calorimeter: state,
            time_at_calorimeter: 0.0,
            reaches_calorimeter: true,
            is_projected_to_end_cap: false,
            can_form_pfo: true,
            can_form_clusterless_pfo: true,
            parent_address: DetectorAddress::NONE,
        }
    }

    fn field() -> UniformField {
        UniformField::new(3.5).unwrap()
    }

    fn pool_with_tracks(n: usize) -> (TrackPool, Vec<TrackId>) {
        let mut pool = TrackPool::with_defaults();
        let ids = (0..n)
            .map(|i| pool.create_track(&parameters(1, 1.0 + i as f64), &field()).unwrap())
            .collect();
        (pool, ids)
    }

    #[test]
    fn test_pool_creation() {
        let pool = TrackPool::with_defaults();
        assert!(pool.is_empty());
        assert_eq!(pool.config().initial_capacity, 256);
    }

    #[test]
    fn test_create_track() {
        let (pool, ids) = pool_with_tracks(3);
        assert_eq!(pool.len(), 3);
        for id in &ids {
            assert_eq!(pool.get(id).unwrap().id(), *id);
        }
    }

    #[test]
    fn test_failed_construction_leaves_pool_untouched() {
        let mut pool = TrackPool::with_defaults();
        let result = pool.create_track(&parameters(0, 1.0), &field());

        assert!(matches!(result, Err(TrackError::InvalidParameter(_))));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_insert_duplicate_id() {
        let mut pool = TrackPool::with_defaults();
        let id = TrackId::from_seed(1);

        pool.insert(Track::with_id(id, &parameters(1, 1.0), &field()).unwrap()).unwrap();
        let duplicate = Track::with_id(id, &parameters(-1, 2.0), &field()).unwrap();

        assert_eq!(pool.insert(duplicate).err(), Some(TrackError::AlreadyPresent(id)));
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.get(&id).unwrap().charge(), 1);
    }

    #[test]
    fn test_remove_unknown_track() {
        let mut pool = TrackPool::with_defaults();
        let id = TrackId::from_seed(9);
        assert!(matches!(pool.remove(&id), Err(TrackError::TrackNotFound(missing)) if missing == id));
    }

    #[test]
    fn test_remove_does_not_touch_linked_tracks() {
        let (mut pool, ids) = pool_with_tracks(3);
        let (parent, daughter, sibling) = (ids[0], ids[1], ids[2]);

        pool.set_parent_daughter(parent, daughter).unwrap();
        pool.set_siblings(daughter, sibling).unwrap();

        let removed = pool.remove(&daughter).unwrap();
        assert_eq!(removed.parents().len(), 1);
        drop(removed);

        // The other tracks survive and keep their (now dangling) handles
        assert_eq!(pool.len(), 2);
        assert!(pool.get(&parent).unwrap().daughters().contains(&daughter));
        assert!(pool.get(&sibling).unwrap().siblings().contains(&daughter));

        // Resolution skips what is no longer in the pool
        assert!(pool.daughters_of(&parent).unwrap().is_empty());
        assert!(pool.siblings_of(&sibling).unwrap().is_empty());
    }

    #[test]
    fn test_set_parent_daughter_is_symmetric() {
        let (mut pool, ids) = pool_with_tracks(2);

        pool.set_parent_daughter(ids[0], ids[1]).unwrap();

        let daughters = pool.daughters_of(&ids[0]).unwrap();
        assert_eq!(daughters.len(), 1);
        assert_eq!(daughters[0].id(), ids[1]);

        let parents = pool.parents_of(&ids[1]).unwrap();
        assert_eq!(parents.len(), 1);
        assert_eq!(parents[0].id(), ids[0]);
    }

    #[test]
    fn test_set_parent_daughter_is_atomic() {
        let (mut pool, ids) = pool_with_tracks(2);
        let (parent, daughter) = (ids[0], ids[1]);

        // One side already linked through the entity API
        pool.get_mut(&daughter).unwrap().add_parent(parent).unwrap();

        assert_eq!(pool.set_parent_daughter(parent, daughter), Err(TrackError::AlreadyPresent(parent)));
        assert!(pool.get(&parent).unwrap().daughters().is_empty());
    }

    #[test]
    fn test_set_parent_daughter_unknown_track() {
        let (mut pool, ids) = pool_with_tracks(1);
        let ghost = TrackId::from_seed(77);

        assert_eq!(pool.set_parent_daughter(ids[0], ghost), Err(TrackError::TrackNotFound(ghost)));
        assert!(pool.get(&ids[0]).unwrap().daughters().is_empty());

        assert!(matches!(
            pool.set_parent_daughter(TrackId::nil(), ids[0]),
            Err(TrackError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_set_parent_daughter_rejects_self_link() {
        let (mut pool, ids) = pool_with_tracks(1);

        assert!(matches!(
            pool.set_parent_daughter(ids[0], ids[0]),
            Err(TrackError::InvalidParameter(_))
        ));

        let track = pool.get(&ids[0]).unwrap();
        assert!(track.parents().is_empty());
        assert!(track.daughters().is_empty());
    }

    #[test]
    fn test_set_siblings() {
        let (mut pool, ids) = pool_with_tracks(2);

        pool.set_siblings(ids[0], ids[1]).unwrap();
        assert!(pool.get(&ids[0]).unwrap().siblings().contains(&ids[1]));
        assert!(pool.get(&ids[1]).unwrap().siblings().contains(&ids[0]));

        assert_eq!(pool.set_siblings(ids[1], ids[0]), Err(TrackError::AlreadyPresent(ids[0])));
        assert!(matches!(pool.set_siblings(ids[0], ids[0]), Err(TrackError::InvalidParameter(_))));
    }

    #[test]
    fn test_cluster_forwarding() {
        let (mut pool, ids) = pool_with_tracks(1);
        let cluster = ClusterId::from_seed(1);

        pool.associate_cluster(&ids[0], cluster).unwrap();
        assert_eq!(pool.associate_cluster(&ids[0], ClusterId::from_seed(2)), Err(TrackError::AlreadyInitialized));
        assert_eq!(pool.remove_cluster_association(&ids[0], ClusterId::from_seed(2)), Err(TrackError::NotFound));
        pool.remove_cluster_association(&ids[0], cluster).unwrap();

        let ghost = TrackId::from_seed(5);
        assert_eq!(pool.associate_cluster(&ghost, cluster), Err(TrackError::TrackNotFound(ghost)));
    }

    #[test]
    fn test_truth_forwarding() {
        let (mut pool, ids) = pool_with_tracks(1);
        let mc = McParticleId::from_seed(3);

        pool.set_mc_particle_weights(&ids[0], vec![(mc, 1.0)].into_iter().collect()).unwrap();
        assert_eq!(pool.get(&ids[0]).unwrap().main_mc_particle(), Ok(mc));
    }

    #[test]
    fn test_available_tracks() {
        let (mut pool, ids) = pool_with_tracks(3);

        pool.set_availability(&ids[1], false).unwrap();
        let available: Vec<TrackId> = pool.available_tracks().map(|t| t.id()).collect();

        assert_eq!(available.len(), 2);
        assert!(!available.contains(&ids[1]));
    }

    #[test]
    fn test_clear() {
        let (mut pool, _ids) = pool_with_tracks(4);
        pool.clear();
        assert!(pool.is_empty());
    }
}
