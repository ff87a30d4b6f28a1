//! The trajectory model - a helix in a solenoidal field.
//!
//! A charged particle in a uniform field along z moves on a circle in the
//! transverse plane while advancing linearly in z. The helix is fitted once,
//! from a single track state, and owned by the Track that built it.
//!
//! Units: millimetres, GeV/c, tesla, elementary charge.

use nalgebra::{Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Transverse momentum per unit (field × radius): GeV / (T · mm).
pub const FIELD_CONVERSION: f64 = 2.99792458e-4;

/// Helix parameters derived from a reference point and momentum.
///
/// When the field or the transverse momentum is zero the model degenerates
/// to a straight line: `radius` is infinite, `curvature` is zero and there is
/// no circle centre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Helix {
    /// Point the helix was fitted at
    reference_point: Vector3<f64>,

    /// Momentum at the reference point
    momentum: Vector3<f64>,

    /// Charge in units of e
    charge: f64,

    /// Field magnitude used for the fit (tesla)
    field_tesla: f64,

    transverse_momentum: f64,

    /// Radius of the transverse circle (mm), infinite for a straight line
    radius: f64,

    /// Signed curvature 1/R; positive for clockwise rotation seen from +z
    curvature: f64,

    /// pz / pT
    tan_lambda: f64,

    /// Circle centre in the transverse plane
    centre: Option<Vector2<f64>>,

    /// Azimuth of the momentum at the point of closest approach to the z axis
    phi0: f64,

    /// Signed transverse distance of closest approach to the z axis
    d0: f64,

    /// z at the point of closest approach to the z axis
    z0: f64,
}

impl Helix {
    /// Fit a helix to a track state.
    ///
    /// # Arguments
    /// * `position` - Reference point (mm)
    /// * `momentum` - Momentum at the reference point (GeV/c)
    /// * `charge` - Charge in units of e
    /// * `field_tesla` - Field magnitude along z
    pub fn new(position: Vector3<f64>, momentum: Vector3<f64>, charge: f64, field_tesla: f64) -> Self {
        let transverse_momentum = momentum.x.hypot(momentum.y);
        let tan_lambda = if transverse_momentum > 0.0 {
            momentum.z / transverse_momentum
        } else {
            f64::INFINITY.copysign(momentum.z)
        };

        // Rotation sense: +1 clockwise seen from +z (positive charge, positive field)
        let rotation = (charge * field_tesla).signum();
        let bending = FIELD_CONVERSION * (charge * field_tesla).abs();

        if transverse_momentum == 0.0 || bending == 0.0 {
            return Self::straight_line(position, momentum, charge, field_tesla, transverse_momentum, tan_lambda);
        }

        let radius = transverse_momentum / bending;
        let phi_momentum = momentum.y.atan2(momentum.x);

        // The centre sits a quarter turn from the momentum, on the side the force points to
        let centre_angle = phi_momentum - rotation * PI / 2.0;
        let centre = Vector2::new(
            position.x + radius * centre_angle.cos(),
            position.y + radius * centre_angle.sin(),
        );

        let phi_reference = (position.y - centre.y).atan2(position.x - centre.x);
        let phi_pca = (-centre.y).atan2(-centre.x);

        let d0 = rotation * (radius - centre.norm());
        let phi0 = normalize_angle(phi_pca - rotation * PI / 2.0);

        // Arc length from the reference point back (or forward) to the PCA
        let delta_phi = normalize_angle(phi_pca - phi_reference);
        let arc_length = -rotation * delta_phi * radius;
        let z0 = position.z + arc_length * tan_lambda;

        Self {
            reference_point: position,
            momentum,
            charge,
            field_tesla,
            transverse_momentum,
            radius,
            curvature: rotation / radius,
            tan_lambda,
            centre: Some(centre),
            phi0,
            d0,
            z0,
        }
    }

    fn straight_line(
        position: Vector3<f64>,
        momentum: Vector3<f64>,
        charge: f64,
        field_tesla: f64,
        transverse_momentum: f64,
        tan_lambda: f64,
    ) -> Self {
        let (phi0, d0, z0) = if transverse_momentum > 0.0 {
            let ux = momentum.x / transverse_momentum;
            let uy = momentum.y / transverse_momentum;
            let along = position.x * ux + position.y * uy;

            (uy.atan2(ux), position.x * uy - position.y * ux, position.z - along * tan_lambda)
        } else {
            (0.0, position.x.hypot(position.y), position.z)
        };

        Self {
            reference_point: position,
            momentum,
            charge,
            field_tesla,
            transverse_momentum,
            radius: f64::INFINITY,
            curvature: 0.0,
            tan_lambda,
            centre: None,
            phi0,
            d0,
            z0,
        }
    }

    /// Position on the trajectory at the given z.
    ///
    /// Returns None when the trajectory has no longitudinal motion.
    pub fn position_at_z(&self, z: f64) -> Option<Vector3<f64>> {
        if self.momentum.z == 0.0 {
            return None;
        }

        let dz = z - self.reference_point.z;

        match self.centre {
            Some(centre) => {
                let arc_length = dz / self.tan_lambda;
                let phi_reference = (self.reference_point.y - centre.y).atan2(self.reference_point.x - centre.x);
                let phi = phi_reference - self.curvature * arc_length;

                Some(Vector3::new(
                    centre.x + self.radius * phi.cos(),
                    centre.y + self.radius * phi.sin(),
                    z,
                ))
            }
            None => Some(self.reference_point + self.momentum * (dz / self.momentum.z)),
        }
    }

    /// True if the model degenerated to a straight line.
    pub fn is_straight_line(&self) -> bool {
        self.centre.is_none()
    }

    pub fn reference_point(&self) -> &Vector3<f64> {
        &self.reference_point
    }

    pub fn momentum(&self) -> &Vector3<f64> {
        &self.momentum
    }

    pub fn charge(&self) -> f64 {
        self.charge
    }

    pub fn field_tesla(&self) -> f64 {
        self.field_tesla
    }

    pub fn transverse_momentum(&self) -> f64 {
        self.transverse_momentum
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    pub fn curvature(&self) -> f64 {
        self.curvature
    }

    pub fn tan_lambda(&self) -> f64 {
        self.tan_lambda
    }

    pub fn centre(&self) -> Option<Vector2<f64>> {
        self.centre
    }

    pub fn phi0(&self) -> f64 {
        self.phi0
    }

    pub fn d0(&self) -> f64 {
        self.d0
    }

    pub fn z0(&self) -> f64 {
        self.z0
    }
}

/// Wrap an angle into (-π, π].
fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(2.0 * PI);
    if wrapped > PI {
        wrapped - 2.0 * PI
    } else {
        wrapped
    }
}
