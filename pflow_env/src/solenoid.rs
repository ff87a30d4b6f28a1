//! Concrete field maps.

use crate::{EnvError, FieldLookup};
use nalgebra::Vector3;
use serde::{Deserialize, Deserializer, Serialize};

/// A field with the same magnitude everywhere.
///
/// This is what a detector description degenerates to when only the central
/// solenoid value is known, and it is the default for simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UniformField {
    tesla: f64,
}

impl UniformField {
    /// Creates a uniform field. Rejects non-finite values.
    pub fn new(tesla: f64) -> Result<Self, EnvError> {
        if !tesla.is_finite() {
            return Err(EnvError::invalid_field(format!("non-finite field value {}", tesla)));
        }

        Ok(Self { tesla })
    }

    /// Returns the configured magnitude.
    pub fn tesla(&self) -> f64 {
        self.tesla
    }
}

impl<'de> Deserialize<'de> for UniformField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            tesla: f64,
        }

        let raw = Raw::deserialize(deserializer)?;
        UniformField::new(raw.tesla).map_err(serde::de::Error::custom)
    }
}

impl FieldLookup for UniformField {
    fn field_at(&self, _position: &Vector3<f64>) -> Result<f64, EnvError> {
        Ok(self.tesla)
    }
}

/// A solenoid: one value inside the coil cylinder, another in the return yoke.
///
/// Points beyond `outer_extent_mm` (radially or along z) are not described by
/// the map and produce `EnvError::OutsideFieldMap`. Deserialized maps go
/// through the same checks as `SolenoidField::new`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SolenoidField {
    /// Field inside the coil (tesla)
    inner_tesla: f64,

    /// Field in the return yoke (tesla), usually opposite in sign
    outer_tesla: f64,

    /// Coil inner radius (mm)
    coil_radius_mm: f64,

    /// Coil half length along z (mm)
    half_length_mm: f64,

    /// Largest |coordinate| the map covers (mm)
    outer_extent_mm: f64,
}

impl SolenoidField {
    /// Creates a solenoid field map.
    ///
    /// # Arguments
    /// * `inner_tesla` - Field inside the coil
    /// * `outer_tesla` - Field outside the coil
    /// * `coil_radius_mm` - Radius of the coil
    /// * `half_length_mm` - Half length of the coil
    /// * `outer_extent_mm` - Extent of the map, must contain the coil
    pub fn new(
        inner_tesla: f64,
        outer_tesla: f64,
        coil_radius_mm: f64,
        half_length_mm: f64,
        outer_extent_mm: f64,
    ) -> Result<Self, EnvError> {
        if !inner_tesla.is_finite() || !outer_tesla.is_finite() {
            return Err(EnvError::invalid_field("non-finite field value"));
        }

        if !(coil_radius_mm > 0.0) || !(half_length_mm > 0.0) {
            return Err(EnvError::invalid_field("coil dimensions must be positive"));
        }

        if !outer_extent_mm.is_finite() || outer_extent_mm < coil_radius_mm.max(half_length_mm) {
            return Err(EnvError::invalid_field("field map extent does not contain the coil"));
        }

        Ok(Self {
            inner_tesla,
            outer_tesla,
            coil_radius_mm,
            half_length_mm,
            outer_extent_mm,
        })
    }

    pub fn inner_tesla(&self) -> f64 {
        self.inner_tesla
    }

    pub fn outer_tesla(&self) -> f64 {
        self.outer_tesla
    }

    pub fn coil_radius_mm(&self) -> f64 {
        self.coil_radius_mm
    }

    pub fn half_length_mm(&self) -> f64 {
        self.half_length_mm
    }

    pub fn outer_extent_mm(&self) -> f64 {
        self.outer_extent_mm
    }

    /// Returns true if the position lies inside the coil cylinder.
    pub fn is_inside_coil(&self, position: &Vector3<f64>) -> bool {
        let rho = position.x.hypot(position.y);
        rho < self.coil_radius_mm && position.z.abs() < self.half_length_mm
    }
}

impl<'de> Deserialize<'de> for SolenoidField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Raw {
            inner_tesla: f64,
            outer_tesla: f64,
            coil_radius_mm: f64,
            half_length_mm: f64,
            outer_extent_mm: f64,
        }

        let raw = Raw::deserialize(deserializer)?;
        SolenoidField::new(
            raw.inner_tesla,
            raw.outer_tesla,
            raw.coil_radius_mm,
            raw.half_length_mm,
            raw.outer_extent_mm,
        )
        .map_err(serde::de::Error::custom)
    }
}

impl FieldLookup for SolenoidField {
    fn field_at(&self, position: &Vector3<f64>) -> Result<f64, EnvError> {
        let extent = self.outer_extent_mm;
        if position.x.abs() > extent || position.y.abs() > extent || position.z.abs() > extent {
            return Err(EnvError::OutsideFieldMap {
                x: position.x,
                y: position.y,
                z: position.z,
            });
        }

        if self.is_inside_coil(position) {
            Ok(self.inner_tesla)
        } else {
            Ok(self.outer_tesla)
        }
    }
}
