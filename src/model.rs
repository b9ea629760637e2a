//! The WSB cumulative-citation curve and synthetic timelines with known parameters.
//!
//! A paper with parameters `(lambda, mu, sigma)` in a field where new papers carry `m`
//! references on average accumulates
//!
//! ```text
//! c(t) = m (exp(lambda Φ((ln t - mu) / sigma)) - 1)
//! ```
//!
//! citations by day `t`, approaching the ultimate impact `m (e^lambda - 1)`.

use rand::rngs::SmallRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Exp1};

use crate::error::{Result, WsbError};
use crate::normal;
use crate::solving::Solution;
use crate::timeline::{CitationEvent, Timeline};

/// A fully specified WSB model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WsbModel {
    pub lambda: f64,
    pub mu: f64,
    pub sigma: f64,
    pub m: f64,
}

impl WsbModel {
    /// Validates and builds a model.
    pub fn new(lambda: f64, mu: f64, sigma: f64, m: f64) -> Result<Self> {
        if !(lambda.is_finite() && lambda >= 0.0) {
            return Err(WsbError::invalid_option("lambda", lambda));
        }
        if !mu.is_finite() {
            return Err(WsbError::invalid_option("mu", mu));
        }
        if !(sigma.is_finite() && sigma > 0.0) {
            return Err(WsbError::invalid_option("sigma", sigma));
        }
        if !(m.is_finite() && m >= 0.0) {
            return Err(WsbError::invalid_option("m", m));
        }
        Ok(Self {
            lambda,
            mu,
            sigma,
            m,
        })
    }

    /// The model implied by an estimated solution.
    pub fn from_solution(solution: &Solution, m: f64) -> Result<Self> {
        Self::new(solution.lambda, solution.mu, solution.sigma, m)
    }

    fn cdf_at(&self, t_days: f64) -> f64 {
        if t_days <= 0.0 {
            return 0.0;
        }
        normal::cdf((t_days.ln() - self.mu) / self.sigma)
    }

    /// Expected cumulative citations after `t_days` days.
    pub fn cumulative_citations(&self, t_days: f64) -> f64 {
        self.m * ((self.lambda * self.cdf_at(t_days)).exp() - 1.0)
    }

    /// Evaluates [`cumulative_citations`](Self::cumulative_citations) at every time.
    pub fn fitted_curve(&self, times_days: &[f64]) -> Vec<f64> {
        times_days
            .iter()
            .map(|&t| self.cumulative_citations(t))
            .collect()
    }

    /// Total citations the paper ever collects, `m (e^lambda - 1)`.
    pub fn ultimate_impact(&self) -> f64 {
        self.m * (self.lambda.exp() - 1.0)
    }

    /// Day at which the curve reaches `citations`, or `None` beyond the ultimate impact.
    pub fn time_to_reach(&self, citations: f64) -> Option<f64> {
        if citations <= 0.0
            || citations >= self.ultimate_impact()
            || self.lambda == 0.0
            || self.m == 0.0
        {
            return None;
        }
        let p = (1.0 + citations / self.m).ln() / self.lambda;
        let t = (self.mu + self.sigma * normal::inverse_cdf(p)).exp();
        (t.is_finite() && t > 0.0).then_some(t)
    }

    /// Deterministic timeline: citation `i` sits exactly where the curve reaches `i`,
    /// for every `i` the curve reaches by `horizon_days`.
    pub fn quantile_timeline(&self, horizon_days: f64) -> Result<Timeline> {
        let total = self.cumulative_citations(horizon_days).floor() as usize;
        let mut timestamps = Vec::with_capacity(total);
        for i in 1..=total {
            match self.time_to_reach(i as f64) {
                Some(t) if t <= horizon_days => timestamps.push(t),
                _ => break,
            }
        }
        Timeline::from_timestamps(timestamps)
    }

    /// Seeded draw of the self-exciting citation process up to `horizon_days`.
    ///
    /// With `N` citations so far the intensity is `lambda (m + N) φ(x_t) / (sigma t)`, so
    /// in `Φ(x_t)` units the wait for the next citation is `Exp(1) / (lambda (m + N))`.
    pub fn simulate_timeline(&self, horizon_days: f64, seed: u64) -> Result<Timeline> {
        let mut rng = SmallRng::seed_from_u64(seed);
        let horizon_p = self.cdf_at(horizon_days);
        let mut p = 0.0_f64;
        let mut events = Vec::new();

        if self.lambda > 0.0 && self.m > 0.0 {
            loop {
                let rate = self.lambda * (self.m + events.len() as f64);
                let wait: f64 = Exp1.sample(&mut rng);
                p += wait / rate;
                if p >= horizon_p {
                    break;
                }
                let timestamp = (self.mu + self.sigma * normal::inverse_cdf(p)).exp();
                if !(timestamp.is_finite() && timestamp > 0.0) {
                    continue;
                }
                events.push(CitationEvent {
                    timestamp,
                    cumulative_index: events.len() + 1,
                });
            }
        }
        Timeline::new(events)
    }
}
