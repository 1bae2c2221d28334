use crate::{
    CurveError, CurveGrid, DistortionCurve, FitError, KannalaBrandtPolynomial, Skew,
    UniversalModel,
};
use cv_matrix::Matrix;
use log::*;
use nalgebra::{Point2, Vector2};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A camera described by a Kannala-Brandt polynomial.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct KannalaBrandtModel {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// Maps the incidence angle in radians to the sensor radius in mm.
    pub polynomial: KannalaBrandtPolynomial,
    /// Optical center `(cu, cv)` in pixels.
    pub optical_center: Point2<f64>,
    /// Pixels per mm `(mu, mv)`.
    ///
    /// These are derived at fit time so that `cu / mu` and `cv / mv` are the
    /// sensor radii at the horizontal and vertical field of view.
    pub pixel_density: Vector2<f64>,
}

impl KannalaBrandtModel {
    /// Number of polynomial coefficients.
    pub fn order(&self) -> usize {
        self.polynomial.order()
    }

    /// Sensor radii `(cu / mu, cv / mv)` at the field of view.
    pub fn fov_radii(&self) -> Vector2<f64> {
        self.optical_center
            .coords
            .component_div(&self.pixel_density)
    }

    /// Samples the polynomial on `grid` to build the equivalent universal model.
    ///
    /// The field of view is recovered by looking up [`Self::fov_radii`] in the
    /// new curve. The skew is always the identity.
    ///
    /// A polynomial that stops increasing inside the grid still produces a
    /// curve, but a warning is logged since lookups into it are unreliable.
    pub fn extract(&self, grid: CurveGrid) -> Result<UniversalModel, CurveError> {
        let curve = DistortionCurve::from_fn(grid, |theta| self.polynomial.evaluate(theta))?;
        if let Some(theta) = (0..grid.size)
            .map(|i| grid.angle(i))
            .find(|&theta| self.polynomial.derivative(theta) <= 0.0)
        {
            warn!(
                "Kannala-Brandt polynomial is not increasing at {} rad, extracted curve is not monotonic",
                theta
            );
        }
        let radii = self.fov_radii();
        let fov = Vector2::new(
            curve.angle_from_radius(radii.x)?,
            curve.angle_from_radius(radii.y)?,
        );
        info!(
            "extracted universal model with {} samples, fov ({}, {}) rad",
            curve.len(),
            fov.x,
            fov.y
        );
        Ok(UniversalModel {
            width: self.width,
            height: self.height,
            optical_center: self.optical_center,
            skew: Skew::identity(),
            fov,
            curve,
        })
    }

    /// [`Self::extract`] on the default grid of 1001 samples at 0.1 degrees.
    pub fn to_universal(&self) -> Result<UniversalModel, CurveError> {
        self.extract(CurveGrid::default())
    }
}

/// Sufficient statistics of a curve for the Kannala-Brandt normal equations.
///
/// For the grid angles $θ_i$ and radii $r_i$ of a curve this holds
///
/// * $S_p = \sum_i θ_i^p$ for $p = 3 … 4m+2$
/// * $T_p = \sum_i r_i ⋅ θ_i^p$ for $p = 3 … 2m+1$
///
/// where $m$ is the order of the fit.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerSums {
    order: usize,
    theta: Vec<f64>,
    radius_theta: Vec<f64>,
}

impl PowerSums {
    pub fn new(curve: &DistortionCurve, order: usize) -> Self {
        let mut theta = vec![0.0; (4 * order + 2).saturating_sub(2)];
        let mut radius_theta = vec![0.0; (2 * order + 1).saturating_sub(2)];
        for (t, r) in curve.points() {
            let mut power = t * t * t;
            for sum in &mut theta {
                *sum += power;
                power *= t;
            }
            let mut power = r * t * t * t;
            for sum in &mut radius_theta {
                *sum += power;
                power *= t;
            }
        }
        Self {
            order,
            theta,
            radius_theta,
        }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// $S_p$, valid for `3 <= p <= 4 * order + 2`.
    pub fn theta(&self, p: usize) -> f64 {
        self.theta[p - 3]
    }

    /// $T_p$, valid for `3 <= p <= 2 * order + 1`.
    pub fn radius_theta(&self, p: usize) -> f64 {
        self.radius_theta[p - 3]
    }

    /// Builds `A` and `B` of `A·K = B` for `K = [k_2, …, k_m]`.
    ///
    /// With $k_1$ fixed to one, the residual of sample $i$ is
    /// $r_i - θ_i - \sum_j k_j ⋅ θ_i^{2j-1}$. Setting its gradient to zero gives
    ///
    /// $$
    /// A_{ij} = S_{2i+2j+6}, \quad B_i = T_{2i+3} - S_{2i+4}
    /// $$
    ///
    /// with zero based `i` and `j` below `m - 1`.
    pub fn normal_equations(&self) -> (Matrix, Matrix) {
        let n = self.order.saturating_sub(1);
        let a = Matrix::from_fn(n, n, |i, j| self.theta(2 * i + 2 * j + 6));
        let b = Matrix::from_fn(n, 1, |i, _| {
            self.radius_theta(2 * i + 3) - self.theta(2 * i + 4)
        });
        (a, b)
    }
}

/// Least-squares fit of a Kannala-Brandt polynomial to a distortion curve.
///
/// The fit is a single linear solve of the normal equations (see
/// [`PowerSums::normal_equations`]), there is no iterative refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KannalaBrandtFitter {
    /// Number of coefficients of the fitted polynomial, including the fixed $k_1$.
    pub order: usize,
}

impl Default for KannalaBrandtFitter {
    fn default() -> Self {
        Self { order: 5 }
    }
}

impl KannalaBrandtFitter {
    pub fn new(order: usize) -> Self {
        Self { order }
    }

    /// Fits the distortion curve of `model` and derives the pixel density from
    /// its field of view.
    pub fn fit(&self, model: &UniversalModel) -> Result<KannalaBrandtModel, FitError> {
        let radii = Vector2::new(
            fov_radius(&model.curve, model.fov.x)?,
            fov_radius(&model.curve, model.fov.y)?,
        );
        let polynomial = self.fit_curve(&model.curve)?;
        info!(
            "fitted Kannala-Brandt polynomial of order {}: {:?}",
            self.order,
            polynomial.coefficients()
        );
        Ok(KannalaBrandtModel {
            width: model.width,
            height: model.height,
            polynomial,
            optical_center: model.optical_center,
            pixel_density: model.optical_center.coords.component_div(&radii),
        })
    }

    /// Fits only the polynomial, $k_1$ is always exactly one.
    pub fn fit_curve(&self, curve: &DistortionCurve) -> Result<KannalaBrandtPolynomial, FitError> {
        match self.order {
            0 => return Err(FitError::InvalidOrder),
            1 => return Ok(vec![1.0].into()),
            _ => {}
        }
        if !curve.is_monotonic() {
            warn!("fitting a distortion curve whose radii are not monotonic");
        }
        let sums = PowerSums::new(curve, self.order);
        let (a, b) = sums.normal_equations();
        let k = a.inverse()?.checked_mul(&b)?;
        debug!("normal equations:\n{}solution:\n{}", a, k);
        let coefficients: Vec<f64> = core::iter::once(1.0).chain(k.iter()).collect();
        if coefficients.iter().any(|k| !k.is_finite()) {
            return Err(FitError::NonFinite(coefficients));
        }
        Ok(coefficients.into())
    }
}

fn fov_radius(curve: &DistortionCurve, fov: f64) -> Result<f64, FitError> {
    let max = curve.max_angle();
    let radius = curve.radius_from_angle(fov);
    if !(0.0..=max).contains(&fov) || radius == 0.0 || !radius.is_finite() {
        return Err(FitError::FovOutOfRange { fov, max });
    }
    Ok(radius)
}
