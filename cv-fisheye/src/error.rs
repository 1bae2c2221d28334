use cv_matrix::MatrixError;
use std::path::PathBuf;
use thiserror::Error;

/// Problems with a [`crate::DistortionCurve`] or a lookup into it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CurveError {
    #[error("a distortion curve needs at least 2 samples, got {len}")]
    TooShort { len: usize },
    #[error("the angular step must be positive and finite, got {step}")]
    InvalidStep { step: f64 },
    #[error("sample {index} is not finite: angle {angle}, radius {radius}")]
    NonFinite { index: usize, angle: f64, radius: f64 },
    #[error("radius {radius} could not be bracketed by the curve samples")]
    Ambiguous { radius: f64 },
}

/// Reasons a Kannala-Brandt fit can fail.
#[derive(Debug, Error)]
pub enum FitError {
    #[error("a Kannala-Brandt model needs at least one coefficient")]
    InvalidOrder,
    #[error("field of view {fov} rad is outside of the distortion curve (max {max} rad)")]
    FovOutOfRange { fov: f64, max: f64 },
    #[error("normal equations have a non-finite solution {0:?}")]
    NonFinite(Vec<f64>),
    #[error("normal equations could not be solved: {0}")]
    Singular(#[from] MatrixError),
}

/// Errors while reading or writing key=value files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: {reason}")]
    Syntax { line: usize, reason: String },
    #[error("missing config term `{0}`")]
    MissingKey(String),
    #[error("config term `{key}` takes a single value, found {count} words")]
    MultipleValues { key: String, count: usize },
    #[error("config term `{key}` has invalid value `{value}`")]
    Parse { key: String, value: String },
    #[error("unsupported camera model type `{0}`")]
    UnsupportedModel(String),
    #[error("malformed distortion curve: {0}")]
    MalformedCurve(String),
    #[error(transparent)]
    Curve(#[from] CurveError),
}
