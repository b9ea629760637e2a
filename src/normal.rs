//! Stateless standard normal distribution functions.
//!
//! Every grid cell evaluates these thousands of times, possibly from several
//! threads, so they are plain functions rather than a shared distribution object.

use std::f64::consts::{PI, SQRT_2};

use statrs::function::erf::{erfc, erfc_inv};

/// Standard normal cumulative distribution function `Φ(x)`.
///
/// Uses the complementary error function so the lower tail keeps full relative precision.
pub fn cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// Standard normal density `φ(x)`.
pub fn pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Inverse of [`cdf`]. Returns `-inf`/`+inf` at the endpoints and NaN outside `[0, 1]`.
pub fn inverse_cdf(p: f64) -> f64 {
    if !(0.0..=1.0).contains(&p) {
        return f64::NAN;
    }
    if p == 0.0 {
        return f64::NEG_INFINITY;
    }
    if p == 1.0 {
        return f64::INFINITY;
    }
    -SQRT_2 * erfc_inv(2.0 * p)
}
