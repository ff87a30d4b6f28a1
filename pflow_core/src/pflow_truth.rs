//! Monte-Carlo truth association.
//!
//! A reconstructed Track may be built from hits left by several simulated
//! particles. The weight map records the fractional contribution of each one.

use crate::pflow_handles::McParticleId;
use serde::{Deserialize, Serialize};

/// Insertion-ordered map from MC particle to contribution weight.
///
/// Keys are unique. Iteration follows insertion order, which is what decides
/// ties in `main_particle`. Serialized as a list of pairs; deserializing goes
/// through `insert`, so a repeated key keeps its first position and last weight.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<(McParticleId, f64)>", into = "Vec<(McParticleId, f64)>")]
pub struct McParticleWeightMap {
    entries: Vec<(McParticleId, f64)>,
}

impl McParticleWeightMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update a weight.
    ///
    /// Updating an existing key keeps its original position.
    /// Returns the previous weight for the key, if any.
    pub fn insert(&mut self, mc_particle: McParticleId, weight: f64) -> Option<f64> {
        match self.entries.iter_mut().find(|(id, _)| *id == mc_particle) {
            Some(entry) => Some(std::mem::replace(&mut entry.1, weight)),
            None => {
                self.entries.push((mc_particle, weight));
                None
            }
        }
    }

    /// Get the weight for a particle.
    pub fn get(&self, mc_particle: &McParticleId) -> Option<f64> {
        self.entries
            .iter()
            .find(|(id, _)| id == mc_particle)
            .map(|(_, weight)| *weight)
    }

    /// Remove a particle, returning its weight.
    pub fn remove(&mut self, mc_particle: &McParticleId) -> Option<f64> {
        let index = self.entries.iter().position(|(id, _)| id == mc_particle)?;
        Some(self.entries.remove(index).1)
    }

    pub fn contains(&self, mc_particle: &McParticleId) -> bool {
        self.entries.iter().any(|(id, _)| id == mc_particle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate over (particle, weight) in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (McParticleId, f64)> + '_ {
        self.entries.iter().copied()
    }

    /// Sum of all weights.
    pub fn total_weight(&self) -> f64 {
        self.entries.iter().map(|(_, weight)| weight).sum()
    }

    /// The particle with the largest weight.
    ///
    /// The running best starts at zero and is only replaced by a strictly
    /// greater weight: among equal maxima the earliest entry wins, and entries
    /// with zero, negative or NaN weight never win.
    pub fn main_particle(&self) -> Option<McParticleId> {
        let mut best_weight = 0.0;
        let mut best = None;

        for &(mc_particle, weight) in &self.entries {
            if weight > best_weight {
                best_weight = weight;
                best = Some(mc_particle);
            }
        }

        best
    }
}

impl FromIterator<(McParticleId, f64)> for McParticleWeightMap {
    fn from_iter<I: IntoIterator<Item = (McParticleId, f64)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (mc_particle, weight) in iter {
            map.insert(mc_particle, weight);
        }
        map
    }
}

impl From<Vec<(McParticleId, f64)>> for McParticleWeightMap {
    fn from(entries: Vec<(McParticleId, f64)>) -> Self {
        entries.into_iter().collect()
    }
}

impl From<McParticleWeightMap> for Vec<(McParticleId, f64)> {
    fn from(map: McParticleWeightMap) -> Self {
        map.entries
    }
}

impl Extend<(McParticleId, f64)> for McParticleWeightMap {
    fn extend<I: IntoIterator<Item = (McParticleId, f64)>>(&mut self, iter: I) {
        for (mc_particle, weight) in iter {
            self.insert(mc_particle, weight);
        }
    }
}
