use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for `wsbrs` operations.
///
/// Per-run failures inside a grid search ([`SingularJacobian`](WsbError::SingularJacobian),
/// [`DidNotConverge`](WsbError::DidNotConverge), [`LeftDomain`](WsbError::LeftDomain),
/// [`InvalidLambda`](WsbError::InvalidLambda), [`NumericalError`](WsbError::NumericalError))
/// are recorded in the run log and never abort the sweep, which is why the type is `Clone`
/// and serializable along with the rest of a search report.
#[derive(Clone, Debug, Error, PartialEq, Serialize, Deserialize)]
pub enum WsbError {
    /// Raised when the requested window holds no citations.
    #[error("timeline is empty; at least one citation is required before solving")]
    EmptyTimeline,

    /// Raised when coarse interval indices are not strictly increasing.
    #[error("interval index {found} at position {position} does not follow {previous}")]
    UnorderedIntervals {
        /// Position of the offending pair in the input series.
        position: usize,
        /// Interval index of the preceding pair.
        previous: usize,
        /// Interval index that broke the ordering.
        found: usize,
    },

    /// Raised when a hand-built timeline violates its invariants.
    #[error("citation event {index} is invalid: {reason}")]
    InvalidTimeline {
        /// Zero-based position of the offending event.
        index: usize,
        /// Which invariant failed.
        reason: Cow<'static, str>,
    },

    /// Raised when a configuration value or model input is out of range.
    #[error("invalid value for {name}: {value}")]
    InvalidOption {
        /// Name of the option or input.
        name: Cow<'static, str>,
        /// The rejected value.
        value: f64,
    },

    /// Raised when the Jacobian cannot be factorized during an iteration.
    #[error("Jacobian is singular at iteration {iteration} (mu = {mu}, sigma = {sigma})")]
    SingularJacobian {
        /// Iteration at which the factorization failed.
        iteration: usize,
        /// Current mu when the failure happened.
        mu: f64,
        /// Current sigma when the failure happened.
        sigma: f64,
    },

    /// Raised when Newton-Raphson exceeds its iteration budget.
    #[error("Newton-Raphson did not converge after {iterations} iterations; last step norm {step_norm}")]
    DidNotConverge {
        /// Number of iterations performed before termination.
        iterations: usize,
        /// Euclidean norm of the final update.
        step_norm: f64,
    },

    /// Raised when a Newton step lands outside `sigma > 0`.
    #[error("Newton step left the admissible region at iteration {iteration} (mu = {mu}, sigma = {sigma})")]
    LeftDomain {
        /// Iteration that produced the inadmissible point.
        iteration: usize,
        mu: f64,
        sigma: f64,
    },

    /// Raised when the closed-form lambda is undefined (zero denominator).
    #[error("lambda {lambda} is not a valid fitness (mu = {mu}, sigma = {sigma})")]
    InvalidLambda {
        /// The offending lambda value.
        lambda: f64,
        /// Converged mu.
        mu: f64,
        /// Converged sigma.
        sigma: f64,
    },

    /// Raised when numerical routines produce NaN or infinities.
    #[error("encountered a non-finite value during {context}")]
    NumericalError { context: Cow<'static, str> },

    /// Raised when a grid search is interrupted through its cancellation flag.
    #[error("search cancelled after {completed} grid cells")]
    Cancelled { completed: usize },
}

impl WsbError {
    /// Helper to raise when the Jacobian factorization fails.
    pub fn singular(iteration: usize, mu: f64, sigma: f64) -> Self {
        Self::SingularJacobian {
            iteration,
            mu,
            sigma,
        }
    }

    /// Helper to reject an out-of-range option or input.
    pub fn invalid_option(name: &'static str, value: f64) -> Self {
        Self::InvalidOption {
            name: Cow::Borrowed(name),
            value,
        }
    }

    /// Helper to reject a timeline event that breaks an invariant.
    pub fn invalid_timeline(index: usize, reason: &'static str) -> Self {
        Self::InvalidTimeline {
            index,
            reason: Cow::Borrowed(reason),
        }
    }

    /// Helper to raise when a numerical routine yields NaN or infinities.
    pub fn numerical(context: &'static str) -> Self {
        Self::NumericalError {
            context: Cow::Borrowed(context),
        }
    }

    /// Whether this error is a contained per-run failure rather than a precondition failure.
    pub fn is_per_run(&self) -> bool {
        matches!(
            self,
            Self::SingularJacobian { .. }
                | Self::DidNotConverge { .. }
                | Self::LeftDomain { .. }
                | Self::InvalidLambda { .. }
                | Self::NumericalError { .. }
        )
    }
}

/// Type alias for results returned by this crate.
pub type Result<T> = std::result::Result<T, WsbError>;
