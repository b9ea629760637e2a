//! Convergence grid search: run Newton-Raphson from a grid of initial guesses and keep
//! every distinct root.

use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WsbError};
use crate::options::{RetryPolicy, SearchOptions};
use crate::solving::{newton_raphson, Solution};
use crate::statistics::TrialParameters;
use crate::timeline::Timeline;

/// Distinct solutions in discovery order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SolutionSet(Vec<Solution>);

impl SolutionSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Solution> {
        self.0.iter()
    }

    /// Solutions as a slice, in discovery order.
    pub fn as_slice(&self) -> &[Solution] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Solution> {
        self.0
    }
}

impl<'a> IntoIterator for &'a SolutionSet {
    type Item = &'a Solution;
    type IntoIter = std::slice::Iter<'a, Solution>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Outcome of one grid cell, kept for diagnostics whether or not it was accepted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridRun {
    /// Initial mu guess.
    pub mu0: f64,
    /// Initial sigma guess.
    pub sigma0: f64,
    /// 0 for the first sweep, 1 for the retry.
    pub sweep: usize,
    /// The converged solution or the per-run failure.
    pub outcome: std::result::Result<Solution, WsbError>,
    /// Whether the solution entered the [`SolutionSet`].
    pub accepted: bool,
}

impl GridRun {
    /// Lambda of a converged run, unique or not.
    pub fn lambda(&self) -> Option<f64> {
        self.outcome.as_ref().ok().map(|solution| solution.lambda)
    }
}

/// Everything a grid search produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchReport {
    /// Accepted distinct solutions in discovery order.
    pub solutions: SolutionSet,
    /// Every grid cell across every sweep, in scan order.
    pub runs: Vec<GridRun>,
    /// Number of sweeps performed (1 or 2).
    pub sweeps: usize,
    /// Step of the last sweep.
    pub final_step: f64,
}

impl SearchReport {
    /// Lambdas of all converged runs in scan order, including duplicates and negatives.
    pub fn lambda_history(&self) -> Vec<f64> {
        self.runs.iter().filter_map(GridRun::lambda).collect()
    }
}

/// Values `start, start + step, ...` strictly below `end`, accumulated by repeated addition.
pub fn grid_axis(start: f64, end: f64, step: f64) -> Vec<f64> {
    let mut values = Vec::new();
    if !(step > 0.0) {
        return values;
    }
    let mut value = start;
    while value < end {
        values.push(value);
        value += step;
    }
    values
}

/// Runs the grid search with the default never-raised cancellation flag.
pub fn search(timeline: &Timeline, m: f64, options: &SearchOptions) -> Result<SearchReport> {
    let cancel = AtomicBool::new(false);
    search_with_cancel(timeline, m, options, &cancel)
}

/// Runs the grid search, checking `cancel` before every grid cell.
///
/// Per-cell failures land in the run log; only invalid inputs, an empty timeline and
/// cancellation end the search with an error. An empty [`SolutionSet`] is a valid result.
pub fn search_with_cancel(
    timeline: &Timeline,
    m: f64,
    options: &SearchOptions,
    cancel: &AtomicBool,
) -> Result<SearchReport> {
    options.validate()?;
    if timeline.is_empty() {
        return Err(WsbError::EmptyTimeline);
    }
    if !(m.is_finite() && m >= 0.0) {
        return Err(WsbError::invalid_option("m", m));
    }
    if timeline.is_degenerate() {
        warn!(
            "timeline has {} citation(s); estimates are statistically degenerate",
            timeline.len()
        );
    }

    let mut runs = sweep(timeline, m, options, options.step, 0, cancel)?;
    let mut solutions = deduplicate(&mut runs, options.dedup_tolerance);
    let mut sweeps = 1;
    let mut final_step = options.step;

    if solutions.is_empty() {
        if let RetryPolicy::FinerStep(retry_step) = options.retry {
            if retry_step < options.step {
                warn!(
                    "no solution with step {}; retrying with step {}",
                    options.step, retry_step
                );
                let mut retry = sweep(timeline, m, options, retry_step, 1, cancel)?;
                solutions = deduplicate(&mut retry, options.dedup_tolerance);
                runs.extend(retry);
                sweeps = 2;
                final_step = retry_step;
            }
        }
    }

    info!(
        "grid search finished: {} run(s), {} sweep(s), {} distinct solution(s)",
        runs.len(),
        sweeps,
        solutions.len()
    );

    Ok(SearchReport {
        solutions,
        runs,
        sweeps,
        final_step,
    })
}

fn sweep(
    timeline: &Timeline,
    m: f64,
    options: &SearchOptions,
    step: f64,
    sweep_index: usize,
    cancel: &AtomicBool,
) -> Result<Vec<GridRun>> {
    let axis = grid_axis(options.start, options.end, step);
    let cells: Vec<(f64, f64)> = axis
        .iter()
        .flat_map(|&mu0| axis.iter().map(move |&sigma0| (mu0, sigma0)))
        .collect();

    let run_cell = |&(mu0, sigma0): &(f64, f64)| -> Option<GridRun> {
        if cancel.load(Ordering::Relaxed) {
            return None;
        }
        let outcome = newton_raphson(
            timeline,
            TrialParameters::new(mu0, sigma0),
            m,
            &options.solver,
        );
        match &outcome {
            Ok(solution) => debug!(
                "start ({mu0:.3}, {sigma0:.3}) converged to lambda = {}, mu = {}, sigma = {} in {} iterations",
                solution.lambda, solution.mu, solution.sigma, solution.iterations
            ),
            Err(error) => debug!("start ({mu0:.3}, {sigma0:.3}) failed: {error}"),
        }
        Some(GridRun {
            mu0,
            sigma0,
            sweep: sweep_index,
            outcome,
            accepted: false,
        })
    };

    // Indexed collection keeps scan order regardless of scheduling.
    let results: Vec<Option<GridRun>> = if options.parallel {
        cells.par_iter().map(run_cell).collect()
    } else {
        cells.iter().map(run_cell).collect()
    };

    collect_completed(results)
}

/// A sweep counts as cancelled only if some cell was skipped; a flag raised after the
/// last cell finished leaves the result intact.
fn collect_completed(results: Vec<Option<GridRun>>) -> Result<Vec<GridRun>> {
    let completed = results.iter().filter(|run| run.is_some()).count();
    if completed < results.len() {
        return Err(WsbError::Cancelled { completed });
    }
    Ok(results.into_iter().flatten().collect())
}

/// Sequential reduction over runs in scan order.
///
/// A converged run is accepted when its lambda is non-negative and no previously
/// accepted lambda lies within `tolerance`. Rejected lambdas never suppress later runs.
pub fn deduplicate(runs: &mut [GridRun], tolerance: f64) -> SolutionSet {
    let mut accepted: Vec<Solution> = Vec::new();
    for run in runs.iter_mut() {
        let Ok(candidate) = run.outcome.as_ref() else {
            continue;
        };
        if candidate.lambda < 0.0 {
            continue;
        }
        let is_unique = accepted
            .iter()
            .all(|existing| (existing.lambda - candidate.lambda).abs() >= tolerance);
        if is_unique {
            accepted.push(*candidate);
            run.accepted = true;
        }
    }
    SolutionSet(accepted)
}
