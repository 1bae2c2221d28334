use derive_more::{AsRef, Deref, From, Into};

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Odd power series used by the Kannala-Brandt projection.
///
/// $$
/// r(θ) = k_1 ⋅ θ + k_2 ⋅ θ^3 + k_3 ⋅ θ^5 + ⋯ + k_n ⋅ θ^{2n-1}
/// $$
///
/// The coefficients are stored as `[k_1, k_2, …, k_n]`. A fitted model always
/// has `k_1 = 1`, but evaluation does not rely on it.
#[derive(Debug, Clone, PartialEq, Default, AsRef, Deref, From, Into)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct KannalaBrandtPolynomial(Vec<f64>);

impl KannalaBrandtPolynomial {
    pub fn new(coefficients: Vec<f64>) -> Self {
        Self(coefficients)
    }

    /// Number of coefficients.
    pub fn order(&self) -> usize {
        self.0.len()
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.0
    }

    /// Computes $r(θ)$.
    pub fn evaluate(&self, theta: f64) -> f64 {
        self.with_derivative(theta).0
    }

    /// Computes $\frac{dr}{dθ}$.
    pub fn derivative(&self, theta: f64) -> f64 {
        self.with_derivative(theta).1
    }

    /// Simultaneously compute value and first derivative.
    ///
    /// # Method
    ///
    /// With $x = θ^2$ the series is $θ ⋅ p(x)$ where $p(x) = \sum_i k_i ⋅ x^{i-1}$.
    /// Horner's scheme yields $p$ and $p'$ together and
    ///
    /// $$
    /// \frac{dr}{dθ} = p(x) + 2 ⋅ x ⋅ p'(x)
    /// $$
    ///
    pub fn with_derivative(&self, theta: f64) -> (f64, f64) {
        let x = theta * theta;
        let mut p = 0.0;
        let mut dp = 0.0;
        for &k in self.0.iter().rev() {
            dp = dp * x + p;
            p = p * x + k;
        }
        (theta * p, p + 2.0 * x * dp)
    }
}
