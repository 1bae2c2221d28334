//! Fisheye camera models and the conversions between them.
//!
//! Two intrinsic models are supported:
//!
//! * The [`UniversalModel`] samples the lens distortion directly as a table of
//!   incidence angle to sensor radius ([`DistortionCurve`]), together with the
//!   optical center, a skew correction and the field of view.
//! * The [`KannalaBrandtModel`] expresses the radius as an odd power series of
//!   the incidence angle, `r = θ + k_2⋅θ^3 + … + k_n⋅θ^(2n-1)`.
//!
//! A universal model is turned into a Kannala-Brandt model by
//! [`KannalaBrandtFitter::fit`], a one shot linear least-squares fit solved with
//! [`cv_matrix`]. [`KannalaBrandtModel::extract`] goes the other way by sampling
//! the polynomial on a [`CurveGrid`].
//!
//! ```
//! use cv_fisheye::{CurveGrid, DistortionCurve, KannalaBrandtFitter, Skew, UniversalModel};
//! use nalgebra::{Point2, Vector2};
//!
//! let curve = DistortionCurve::from_fn(CurveGrid::default(), |t| t + 0.1 * t * t * t).unwrap();
//! let camera = UniversalModel {
//!     width: 1280,
//!     height: 960,
//!     optical_center: Point2::new(640.0, 480.0),
//!     skew: Skew::identity(),
//!     fov: Vector2::new(1.4, 1.0),
//!     curve,
//! };
//! let fitted = KannalaBrandtFitter::new(3).fit(&camera).unwrap();
//! assert!((fitted.polynomial[1] - 0.1).abs() < 1e-6);
//! ```
//!
//! Models are stored in a plain `key = value` text format, see [`config`] and
//! [`CameraModel::load`].

pub mod config;
mod curve;
mod error;
mod kannala_brandt;
mod model;
mod polynomial;
mod universal;

pub use config::ConfigFile;
pub use curve::*;
pub use error::*;
pub use kannala_brandt::*;
pub use model::*;
pub use polynomial::*;
pub use universal::*;

pub use nalgebra;
