//! Normalized sums over a timeline that feed every Newton-Raphson iteration.

use serde::{Deserialize, Serialize};

use crate::error::{Result, WsbError};
use crate::normal;
use crate::timeline::Timeline;

/// A hypothesis `(mu, sigma)` evaluated against a timeline.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrialParameters {
    /// Immediacy.
    pub mu: f64,
    /// Longevity; must be strictly positive.
    pub sigma: f64,
}

impl TrialParameters {
    pub fn new(mu: f64, sigma: f64) -> Self {
        Self { mu, sigma }
    }

    /// Standardized log-time `(ln(t) - mu) / sigma`.
    pub fn standardize(&self, log_time: f64) -> f64 {
        (log_time - self.mu) / self.sigma
    }

    fn validate(&self) -> Result<()> {
        if !self.mu.is_finite() {
            return Err(WsbError::invalid_option("mu", self.mu));
        }
        if !(self.sigma.is_finite() && self.sigma > 0.0) {
            return Err(WsbError::invalid_option("sigma", self.sigma));
        }
        Ok(())
    }
}

/// Sums for one `(mu, sigma)` against one timeline, each averaged over `n` events.
///
/// With `x_i = (ln(t_i) - mu) / sigma`, the `mean_*` fields are the sample
/// means of the named transform of `x_i`. Recomputed on every iteration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IterationStatistics {
    pub mu: f64,
    pub sigma: f64,
    /// Mean references per new paper in the domain.
    pub m: f64,
    /// Reference time: the last timestamp of the timeline.
    pub t: f64,
    /// Number of citations.
    pub n: f64,
    /// `(ln(t) - mu) / sigma`.
    pub xt: f64,
    /// `m / n`.
    pub mhat: f64,
    pub mean_ln_t: f64,
    pub mean_ln_t_sqrd: f64,
    pub mean_x: f64,
    pub mean_x_sqrd: f64,
    pub mean_cdf: f64,
    pub mean_pdf: f64,
    pub mean_x_pdf: f64,
    pub mean_x_sqrd_pdf: f64,
    pub mean_x_cubed_pdf: f64,
}

impl IterationStatistics {
    /// Evaluates every sum for `trial` against `timeline`, taking `t` and `n` from the timeline.
    pub fn evaluate(timeline: &Timeline, trial: TrialParameters, m: f64) -> Result<Self> {
        trial.validate()?;
        let t = timeline.last_timestamp().ok_or(WsbError::EmptyTimeline)?;
        let n = timeline.len() as f64;

        let mut stats = Self {
            mu: trial.mu,
            sigma: trial.sigma,
            m,
            t,
            n,
            xt: trial.standardize(t.ln()),
            mhat: m / n,
            mean_ln_t: 0.0,
            mean_ln_t_sqrd: 0.0,
            mean_x: 0.0,
            mean_x_sqrd: 0.0,
            mean_cdf: 0.0,
            mean_pdf: 0.0,
            mean_x_pdf: 0.0,
            mean_x_sqrd_pdf: 0.0,
            mean_x_cubed_pdf: 0.0,
        };

        for &ln_ti in timeline.log_times() {
            let xi = trial.standardize(ln_ti);
            let density = normal::pdf(xi);

            stats.mean_ln_t += ln_ti;
            stats.mean_ln_t_sqrd += ln_ti * ln_ti;
            stats.mean_x += xi;
            stats.mean_x_sqrd += xi * xi;
            stats.mean_cdf += normal::cdf(xi);
            stats.mean_pdf += density;
            stats.mean_x_pdf += xi * density;
            stats.mean_x_sqrd_pdf += xi * xi * density;
            stats.mean_x_cubed_pdf += xi * xi * xi * density;
        }

        stats.mean_ln_t /= n;
        stats.mean_ln_t_sqrd /= n;
        stats.mean_x /= n;
        stats.mean_x_sqrd /= n;
        stats.mean_cdf /= n;
        stats.mean_pdf /= n;
        stats.mean_x_pdf /= n;
        stats.mean_x_sqrd_pdf /= n;
        stats.mean_x_cubed_pdf /= n;

        Ok(stats)
    }

    /// `Φ(xt)`.
    pub fn cdf_t(&self) -> f64 {
        normal::cdf(self.xt)
    }

    /// `φ(xt)`.
    pub fn pdf_t(&self) -> f64 {
        normal::pdf(self.xt)
    }

    /// `(1 + mhat) Φ(xt) - E[Φ(x_i)]`, shared by the residuals and by lambda.
    pub fn exposure(&self) -> f64 {
        (1.0 + self.mhat) * self.cdf_t() - self.mean_cdf
    }
}
