use crate::CurveError;
use float_ord::FloatOrd;
use log::*;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// One row of a distortion lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct CurveSample {
    /// Incidence angle in degrees.
    pub angle: f64,
    /// Image radius in mm.
    pub radius: f64,
}

impl CurveSample {
    pub fn new(angle: f64, radius: f64) -> Self {
        Self { angle, radius }
    }
}

/// The sampling grid used when a curve is synthesized from a closed form model.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct CurveGrid {
    /// Number of samples.
    pub size: usize,
    /// Angle between two consecutive samples in degrees.
    pub step: f64,
}

impl Default for CurveGrid {
    fn default() -> Self {
        Self {
            size: 1001,
            step: 0.1,
        }
    }
}

impl CurveGrid {
    /// Grid angle of sample `index` in radians.
    pub fn angle(&self, index: usize) -> f64 {
        index as f64 * self.step.to_radians()
    }
}

/// A sampled angle to radius lookup table.
///
/// Sample `i` sits at the incidence angle `i * step`. Both lookups assume
/// that the radii are non-decreasing; [`DistortionCurve::is_monotonic`] can be
/// used to check this, but it is not enforced.
///
/// The interpolation brackets used by the lookups are shifted by one sample
/// with respect to the grid angles: querying the angle of sample `k` yields
/// the radius of sample `k - 1`, and querying the radius of sample `k`
/// yields the angle of sample `k + 1`. The two lookups are consistent with
/// each other, so converting back and forth is lossless.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct DistortionCurve {
    step: f64,
    samples: Vec<CurveSample>,
}

impl DistortionCurve {
    /// Creates a curve from samples spaced `step` degrees apart.
    ///
    /// Every angle and radius must be finite.
    pub fn new(step: f64, samples: Vec<CurveSample>) -> Result<Self, CurveError> {
        if !(step > 0.0 && step.is_finite()) {
            return Err(CurveError::InvalidStep { step });
        }
        if samples.len() < 2 {
            return Err(CurveError::TooShort {
                len: samples.len(),
            });
        }
        if let Some((index, sample)) = samples
            .iter()
            .enumerate()
            .find(|(_, s)| !(s.angle.is_finite() && s.radius.is_finite()))
        {
            return Err(CurveError::NonFinite {
                index,
                angle: sample.angle,
                radius: sample.radius,
            });
        }
        Ok(Self { step, samples })
    }

    /// Evaluates `radius(theta)` (theta in radians) at every angle of `grid`.
    pub fn from_fn(grid: CurveGrid, mut radius: impl FnMut(f64) -> f64) -> Result<Self, CurveError> {
        let samples = (0..grid.size)
            .map(|i| CurveSample::new(i as f64 * grid.step, radius(grid.angle(i))))
            .collect();
        Self::new(grid.step, samples)
    }

    /// Angular step in degrees.
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Angular step in radians.
    pub fn step_radians(&self) -> f64 {
        self.step.to_radians()
    }

    pub fn samples(&self) -> &[CurveSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always `false`, a curve holds at least two samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn radii(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.radius)
    }

    /// Grid angles in radians paired with the sampled radii.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        let step = self.step_radians();
        self.samples
            .iter()
            .enumerate()
            .map(move |(i, s)| (i as f64 * step, s.radius))
    }

    /// The grid this curve was sampled on.
    pub fn grid(&self) -> CurveGrid {
        CurveGrid {
            size: self.len(),
            step: self.step,
        }
    }

    /// Largest angle covered by the curve in radians.
    pub fn max_angle(&self) -> f64 {
        (self.len() - 1) as f64 * self.step_radians()
    }

    /// Largest sampled radius.
    pub fn max_radius(&self) -> f64 {
        self.radii().map(FloatOrd).max().map_or(0.0, |r| r.0)
    }

    /// Whether the radii never decrease.
    pub fn is_monotonic(&self) -> bool {
        self.samples.windows(2).all(|w| w[0].radius <= w[1].radius)
    }

    /// Looks up the radius at the incidence angle `theta` (radians).
    ///
    /// Negative angles give `0.0` and angles past the end of the curve give the
    /// last radius. In between the radius is linearly interpolated.
    pub fn radius_from_angle(&self, theta: f64) -> f64 {
        let step = self.step_radians();
        let last = self.len() - 1;
        if theta < 0.0 {
            return 0.0;
        }
        if theta >= last as f64 * step {
            debug!("angle {} clamped to the end of the distortion curve", theta);
            return self.samples[last].radius;
        }
        let lower = (theta / step).floor() as isize - 1;
        if lower >= last as isize {
            return self.samples[last].radius;
        }
        // Below the first bracket the curve starts from the origin.
        let r_lower = if lower < 0 {
            0.0
        } else {
            self.samples[lower as usize].radius
        };
        let r_upper = self.samples[(lower + 1) as usize].radius;
        let theta_lower = (lower + 1) as f64 * step;
        let theta_upper = (lower + 2) as f64 * step;
        ((theta - theta_lower) * r_upper + (theta_upper - theta) * r_lower) / step
    }

    /// Looks up the incidence angle (radians) that produces `radius`.
    ///
    /// Negative radii give `0.0` and radii at or past the largest sample give
    /// the last grid angle. Otherwise the bracketing samples are found through
    /// a binary search and the angle is linearly interpolated.
    ///
    /// If no bracket exists, which happens for radii below the first sample,
    /// for non-monotonic curves and for NaN, [`CurveError::Ambiguous`] is
    /// returned.
    pub fn angle_from_radius(&self, radius: f64) -> Result<f64, CurveError> {
        let step = self.step_radians();
        let last = self.len() - 1;
        if radius < 0.0 {
            return Ok(0.0);
        }
        if radius >= self.max_radius() {
            debug!("radius {} clamped to the end of the distortion curve", radius);
            return Ok(last as f64 * step);
        }

        let (mut top, mut bottom) = (0, last - 1);
        while top <= bottom {
            let mid = (top + bottom) / 2;
            let r_lower = self.samples[mid].radius;
            let r_upper = self.samples[mid + 1].radius;
            if radius >= r_lower && radius < r_upper {
                let theta_lower = (mid + 1) as f64 * step;
                let theta_upper = (mid + 2) as f64 * step;
                return Ok(((radius - r_lower) * theta_upper + (r_upper - radius) * theta_lower)
                    / (r_upper - r_lower));
            }
            if radius < r_upper {
                if mid == 0 {
                    break;
                }
                bottom = mid - 1;
            } else {
                top = mid + 1;
            }
        }
        Err(CurveError::Ambiguous { radius })
    }
}

/// Aggregate radius deviation between two curves.
///
/// The squared radius differences are summed over the samples both curves
/// share, skipping the first one, and the square root of that sum is divided
/// by the length of `reference`.
pub fn curve_offset_error(reference: &DistortionCurve, other: &DistortionCurve) -> f64 {
    let sum: f64 = reference
        .radii()
        .zip(other.radii())
        .skip(1)
        .map(|(a, b)| (a - b) * (a - b))
        .sum();
    sum.sqrt() / reference.len() as f64
}

/// Largest absolute radius deviation over the samples both curves share.
pub fn curve_max_offset(reference: &DistortionCurve, other: &DistortionCurve) -> f64 {
    reference
        .radii()
        .zip(other.radii())
        .map(|(a, b)| FloatOrd((a - b).abs()))
        .max()
        .map_or(0.0, |d| d.0)
}
