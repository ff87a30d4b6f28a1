//! Error types for the pflow environment abstraction.

use thiserror::Error;

/// Errors that can occur while querying a collaborator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvError {
    /// Field map was configured with an unusable value
    #[error("Invalid field configuration: {0}")]
    InvalidField(String),

    /// Query point lies outside the region the field map describes
    #[error("Position ({x:.1}, {y:.1}, {z:.1}) mm is outside the field map")]
    OutsideFieldMap { x: f64, y: f64, z: f64 },

    /// Generic lookup failure reported by an external implementation
    #[error("Field lookup failed: {0}")]
    LookupFailed(String),
}

impl EnvError {
    /// Creates an invalid-field error.
    pub fn invalid_field(msg: impl Into<String>) -> Self {
        Self::InvalidField(msg.into())
    }

    /// Creates a lookup failure.
    pub fn lookup_failed(msg: impl Into<String>) -> Self {
        Self::LookupFailed(msg.into())
    }
}
