use crate::DistortionCurve;
use nalgebra::{Point2, Vector2};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Affine skew correction `[c d; e 1]` applied to sensor coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Skew {
    pub c: f64,
    pub d: f64,
    pub e: f64,
}

impl Skew {
    /// No skew, `c = 1` and `d = e = 0`.
    pub fn identity() -> Self {
        Self {
            c: 1.0,
            d: 0.0,
            e: 0.0,
        }
    }
}

impl Default for Skew {
    fn default() -> Self {
        Self::identity()
    }
}

/// A camera described by a sampled distortion curve.
///
/// This is the universal representation every other model can be converted
/// to and from.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct UniversalModel {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Optical center `(cu, cv)` in pixels.
    pub optical_center: Point2<f64>,
    pub skew: Skew,
    /// Half field of view `(fu, fv)` in radians along the horizontal and vertical
    /// axes through the optical center.
    pub fov: Vector2<f64>,
    pub curve: DistortionCurve,
}

impl UniversalModel {
    /// Radii on the sensor at the horizontal and vertical field of view.
    pub fn fov_radii(&self) -> Vector2<f64> {
        self.fov.map(|angle| self.curve.radius_from_angle(angle))
    }
}
