//! Identity handles for event objects.
//!
//! Tracks, clusters and MC particles refer to each other by identity only.
//! A handle never owns what it names; the event-level pools resolve handles
//! to live objects. The nil UUID plays the role of a null reference and is
//! rejected by every mutator that stores a handle.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Builds a deterministic UUID from a seed (for simulation and tests).
fn uuid_from_seed(seed: u64, salt: u64) -> Uuid {
    let mut bytes = [0u8; 16];
    bytes[0..8].copy_from_slice(&seed.wrapping_add(1).to_le_bytes());
    bytes[8..16].copy_from_slice(&(seed ^ salt).wrapping_mul(0x517cc1b727220a95).to_le_bytes());
    Uuid::from_bytes(bytes)
}

/// Identity of a reconstructed Track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(pub Uuid);

/// Identity of a calorimeter Cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClusterId(pub Uuid);

/// Identity of a Monte-Carlo truth particle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct McParticleId(pub Uuid);

impl TrackId {
    /// Creates a new random TrackId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The null reference.
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Creates a TrackId from a UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Creates a deterministic TrackId from a seed.
    pub fn from_seed(seed: u64) -> Self {
        Self(uuid_from_seed(seed, 0x7472_6163_6b00_0000))
    }

    /// Returns true for the null reference.
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl ClusterId {
    /// Creates a new random ClusterId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The null reference.
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Creates a ClusterId from a UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Creates a deterministic ClusterId from a seed.
    pub fn from_seed(seed: u64) -> Self {
        Self(uuid_from_seed(seed, 0x636c_7573_7465_7200))
    }

    /// Returns true for the null reference.
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl McParticleId {
    /// Creates a new random McParticleId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The null reference.
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Creates an McParticleId from a UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Creates a deterministic McParticleId from a seed.
    pub fn from_seed(seed: u64) -> Self {
        Self(uuid_from_seed(seed, 0x6d63_7061_7274_0000))
    }

    /// Returns true for the null reference.
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for ClusterId {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for McParticleId {
    fn default() -> Self {
        Self::new()
    }
}

// Show first 8 chars for readability
impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl std::fmt::Display for ClusterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl std::fmt::Display for McParticleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}
