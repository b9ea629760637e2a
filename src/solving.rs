//! Newton-Raphson solver for `(mu, sigma)` and the closed-form lambda estimator.

use log::trace;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WsbError};
use crate::normal;
use crate::options::SolverOptions;
use crate::residual::NewtonSystem;
use crate::statistics::{IterationStatistics, TrialParameters};
use crate::timeline::Timeline;

/// One converged root of the WSB equations.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    /// Relative fitness.
    pub lambda: f64,
    /// Immediacy.
    pub mu: f64,
    /// Longevity.
    pub sigma: f64,
    /// Newton iterations needed to converge.
    pub iterations: usize,
}

impl Solution {
    /// The `(mu, sigma)` pair of this solution.
    pub fn parameters(&self) -> TrialParameters {
        TrialParameters::new(self.mu, self.sigma)
    }
}

/// Closed-form fitness `1 / [(1 + mhat) Φ(xt) - E[Φ(x_i)]]` at `trial`.
///
/// Only needs the CDF sum, so it skips the full [`IterationStatistics`] pass.
pub fn estimate_lambda(timeline: &Timeline, trial: TrialParameters, m: f64) -> Result<f64> {
    let t = timeline.last_timestamp().ok_or(WsbError::EmptyTimeline)?;
    let n = timeline.len() as f64;
    let mhat = m / n;

    let mean_cdf = timeline
        .log_times()
        .iter()
        .map(|&ln_ti| normal::cdf(trial.standardize(ln_ti)))
        .sum::<f64>()
        / n;

    let lambda = 1.0 / ((1.0 + mhat) * normal::cdf(trial.standardize(t.ln())) - mean_cdf);
    if !lambda.is_finite() {
        return Err(WsbError::InvalidLambda {
            lambda,
            mu: trial.mu,
            sigma: trial.sigma,
        });
    }
    Ok(lambda)
}

/// Mutable state carried between Newton-Raphson steps.
#[derive(Clone, Copy, Debug)]
struct IterationState {
    x: Vector2<f64>,
    iteration: usize,
    step_norm: f64,
}

/// Runs Newton-Raphson from `initial` until convergence, divergence or a singular Jacobian.
///
/// The divergence check runs before the convergence check, so a run needs at most
/// `max_iterations + 1` Jacobian solves before it terminates.
pub fn newton_raphson(
    timeline: &Timeline,
    initial: TrialParameters,
    m: f64,
    options: &SolverOptions,
) -> Result<Solution> {
    if timeline.is_empty() {
        return Err(WsbError::EmptyTimeline);
    }

    let mut state = IterationState {
        x: Vector2::new(initial.mu, initial.sigma),
        iteration: 0,
        step_norm: options.initial_step_norm,
    };

    loop {
        if state.iteration > options.max_iterations {
            return Err(WsbError::DidNotConverge {
                iterations: state.iteration,
                step_norm: state.step_norm,
            });
        }

        let trial = TrialParameters::new(state.x[0], state.x[1]);
        if !(trial.sigma > 0.0) {
            return Err(WsbError::LeftDomain {
                iteration: state.iteration,
                mu: trial.mu,
                sigma: trial.sigma,
            });
        }

        if state.step_norm < options.tolerance {
            let lambda = estimate_lambda(timeline, trial, m)?;
            return Ok(Solution {
                lambda,
                mu: trial.mu,
                sigma: trial.sigma,
                iterations: state.iteration,
            });
        }

        let stats = IterationStatistics::evaluate(timeline, trial, m)?;
        let system = NewtonSystem::from_statistics(&stats);
        if !system.is_finite() {
            return Err(WsbError::numerical("residual and Jacobian evaluation"));
        }

        let lu = system.jacobian.lu();
        let pivots_ok = lu
            .u()
            .diagonal()
            .iter()
            .all(|pivot| pivot.abs() > options.singularity_threshold);
        let delta = match lu.solve(&system.residual) {
            Some(delta) if pivots_ok => delta,
            _ => return Err(WsbError::singular(state.iteration + 1, trial.mu, trial.sigma)),
        };
        if !delta.iter().all(|v| v.is_finite()) {
            return Err(WsbError::numerical("Newton update"));
        }

        state.x -= delta;
        state.step_norm = delta.norm();
        state.iteration += 1;

        trace!(
            "iteration {}: mu = {}, sigma = {}, fn = {:e}, gn = {:e}, step = {:e}",
            state.iteration,
            state.x[0],
            state.x[1],
            system.fn_value(),
            system.gn_value(),
            state.step_norm
        );
    }
}
