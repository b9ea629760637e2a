//! Configuration structures for the Newton-Raphson solver and the convergence grid search.

use serde::{Deserialize, Serialize};

use crate::error::{Result, WsbError};

/// Configuration for a single Newton-Raphson run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolverOptions {
    /// Euclidean step norm below which a run is considered converged.
    pub tolerance: f64,
    /// Iteration cap; a run that reaches `max_iterations + 1` iterations diverged.
    pub max_iterations: usize,
    /// Sentinel step norm used to enter the loop; must exceed `tolerance`.
    pub initial_step_norm: f64,
    /// Smallest absolute LU pivot accepted before the Jacobian is declared singular.
    pub singularity_threshold: f64,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            tolerance: 1e-8,
            max_iterations: 31,
            initial_step_norm: 0.1,
            singularity_threshold: 1e-11,
        }
    }
}

impl SolverOptions {
    /// Override the convergence tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Override the iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Override the pivot threshold used for singularity detection.
    pub fn with_singularity_threshold(mut self, threshold: f64) -> Self {
        self.singularity_threshold = threshold;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(WsbError::invalid_option("solver tolerance", self.tolerance));
        }
        if !(self.initial_step_norm.is_finite() && self.initial_step_norm >= self.tolerance) {
            return Err(WsbError::invalid_option(
                "initial step norm",
                self.initial_step_norm,
            ));
        }
        if !(self.singularity_threshold >= 0.0) {
            return Err(WsbError::invalid_option(
                "singularity threshold",
                self.singularity_threshold,
            ));
        }
        Ok(())
    }
}

/// What to do when a full sweep accepts no solution.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// Return the empty solution set straight away.
    Never,
    /// Sweep once more with the given step, provided it is finer than the configured step.
    FinerStep(f64),
}

/// Configuration of the grid of initial guesses and the deduplication rule.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// First value on both the `mu0` and `sigma0` axes.
    pub start: f64,
    /// Exclusive upper bound of both axes.
    pub end: f64,
    /// Increment between consecutive grid values.
    pub step: f64,
    /// Two lambdas closer than this are the same solution.
    pub dedup_tolerance: f64,
    /// Fallback applied when the first sweep finds nothing.
    pub retry: RetryPolicy,
    /// Dispatch grid cells across the rayon thread pool.
    pub parallel: bool,
    /// Options forwarded to every Newton-Raphson run.
    pub solver: SolverOptions,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            start: 0.1,
            end: 12.0,
            step: 1.0,
            dedup_tolerance: 1e-2,
            retry: RetryPolicy::FinerStep(0.1),
            parallel: true,
            solver: SolverOptions::default(),
        }
    }
}

impl SearchOptions {
    /// Override the grid step while preserving other defaults.
    pub fn with_step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    /// Override the bounds of the grid.
    pub fn with_bounds(mut self, start: f64, end: f64) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// Override the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Enable or disable parallel dispatch of grid cells.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Override the lambda deduplication tolerance.
    pub fn with_dedup_tolerance(mut self, tolerance: f64) -> Self {
        self.dedup_tolerance = tolerance;
        self
    }

    /// Override the solver settings.
    pub fn with_solver(mut self, solver: SolverOptions) -> Self {
        self.solver = solver;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(WsbError::invalid_option("grid step", self.step));
        }
        if !self.start.is_finite() {
            return Err(WsbError::invalid_option("grid start", self.start));
        }
        if !(self.end.is_finite() && self.end > self.start) {
            return Err(WsbError::invalid_option("grid end", self.end));
        }
        if !(self.dedup_tolerance >= 0.0) {
            return Err(WsbError::invalid_option(
                "dedup tolerance",
                self.dedup_tolerance,
            ));
        }
        if let RetryPolicy::FinerStep(step) = self.retry {
            if !(step.is_finite() && step > 0.0) {
                return Err(WsbError::invalid_option("retry step", step));
            }
        }
        self.solver.validate()
    }
}
