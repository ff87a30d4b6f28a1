//! Magnetic field lookup trait.

use crate::error::EnvError;
use nalgebra::Vector3;

/// The interface to the detector's magnetic field description.
///
/// Track construction asks for the field magnitude once, and uses it to build
/// the helix fit at the calorimeter. Passing the lookup explicitly (rather than
/// reading a global geometry helper) keeps Track construction testable with
/// any field configuration.
///
/// # Implementations
///
/// - `UniformField` - a constant value, used by tests and the simulation
/// - `SolenoidField` - separate values inside and outside the coil
///
/// # Units
///
/// Positions are in millimetres, the returned magnitude is in tesla.
pub trait FieldLookup: Send + Sync {
    /// Returns the field magnitude at the given position.
    ///
    /// # Returns
    /// * `Ok(tesla)` - The field magnitude
    /// * `Err(EnvError::OutsideFieldMap)` - The position is not covered
    fn field_at(&self, position: &Vector3<f64>) -> Result<f64, EnvError>;
}

impl<T: FieldLookup + ?Sized> FieldLookup for &T {
    fn field_at(&self, position: &Vector3<f64>) -> Result<f64, EnvError> {
        (**self).field_at(position)
    }
}

impl<T: FieldLookup + ?Sized> FieldLookup for Box<T> {
    fn field_at(&self, position: &Vector3<f64>) -> Result<f64, EnvError> {
        (**self).field_at(position)
    }
}

impl<T: FieldLookup + ?Sized> FieldLookup for std::sync::Arc<T> {
    fn field_at(&self, position: &Vector3<f64>) -> Result<f64, EnvError> {
        (**self).field_at(position)
    }
}
