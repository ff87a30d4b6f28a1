//! pflow Core - Track Entity for Particle-Flow Event Reconstruction
//!
//! A Track is the reconstructed trajectory of a charged particle. This library
//! keeps three things straight about it:
//! 1. **Physical consistency**: no Track exists with zero charge, zero energy
//!    or without its helix fit
//! 2. **Relationship bookkeeping**: parent/daughter/sibling links and the
//!    cluster association are non-owning handles resolved by an event pool
//! 3. **Truth matching**: a deterministic best-match reduction over the
//!    Monte-Carlo weight map

pub mod pflow_handles;
pub mod pflow_helix;
pub mod pflow_truth;
pub mod pflow_track;
pub mod pflow_pool;
pub mod validation;

// Re-export key types for convenience
pub use pflow_handles::{ClusterId, McParticleId, TrackId};
pub use pflow_helix::Helix;
pub use pflow_pool::{TrackPool, TrackPoolConfig};
pub use pflow_track::{Track, TrackError, TrackParameters, TrackState};
pub use pflow_truth::McParticleWeightMap;
pub use validation::{TruthMatchReport, TruthMatchSession};
