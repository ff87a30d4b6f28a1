//! Common types for the pflow environment abstraction.

use serde::{Deserialize, Serialize};

/// Opaque address of the detector-level object a Track was built from.
///
/// The reconstruction core never dereferences or frees it. It only hands it
/// back to the caller, who owns whatever it points at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DetectorAddress(pub u64);

impl DetectorAddress {
    /// Address used when the caller has nothing to cross-reference.
    pub const NONE: DetectorAddress = DetectorAddress(0);

    /// Creates an address from a raw value.
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns true if no address was supplied.
    pub fn is_none(&self) -> bool {
        self.0 == 0
    }

    /// Returns the raw value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for DetectorAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}
