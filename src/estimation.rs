//! High-level estimation entry points.

use std::sync::atomic::AtomicBool;

use log::{info, warn};

use crate::error::{Result, WsbError};
use crate::history::{CitationHistory, TrainingWindow};
use crate::model::WsbModel;
use crate::options::{SearchOptions, SolverOptions};
use crate::search::{search_with_cancel, SearchReport, SolutionSet};
use crate::solving::{newton_raphson, Solution};
use crate::statistics::TrialParameters;
use crate::timeline::Timeline;

/// A validated estimation problem: one non-empty timeline and the field constant `m`.
#[derive(Clone, Debug)]
pub struct WsbProblem {
    timeline: Timeline,
    m: f64,
}

impl WsbProblem {
    /// Constructs a new problem, refusing empty timelines up front.
    pub fn new(timeline: Timeline, m: f64) -> Result<Self> {
        if timeline.is_empty() {
            return Err(WsbError::EmptyTimeline);
        }
        if !(m.is_finite() && m >= 0.0) {
            return Err(WsbError::invalid_option("m", m));
        }
        Ok(Self { timeline, m })
    }

    /// Accessor for the timeline.
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Mean references per new paper.
    pub fn m(&self) -> f64 {
        self.m
    }

    /// Single Newton-Raphson run from `initial`.
    pub fn solve_from(&self, initial: TrialParameters, options: &SolverOptions) -> Result<Solution> {
        options.validate()?;
        newton_raphson(&self.timeline, initial, self.m, options)
    }

    /// Full grid search over initial guesses.
    pub fn search(&self, options: &SearchOptions) -> Result<SearchReport> {
        let cancel = AtomicBool::new(false);
        self.search_with_cancel(options, &cancel)
    }

    /// Grid search that stops early once `cancel` is raised.
    pub fn search_with_cancel(
        &self,
        options: &SearchOptions,
        cancel: &AtomicBool,
    ) -> Result<SearchReport> {
        search_with_cancel(&self.timeline, self.m, options, cancel)
    }

    /// Model curves for every solution in `solutions`.
    pub fn models(&self, solutions: &SolutionSet) -> Result<Vec<WsbModel>> {
        solutions
            .iter()
            .map(|solution| WsbModel::from_solution(solution, self.m))
            .collect()
    }
}

/// Result of fitting one training window of a paper.
#[derive(Clone, Debug, PartialEq)]
pub struct WindowEstimate {
    pub window: TrainingWindow,
    /// Citations inside the window.
    pub citations: usize,
    /// The search report, or why the window could not be fitted.
    pub outcome: Result<SearchReport>,
}

impl WindowEstimate {
    /// Accepted solutions, empty when the window failed.
    pub fn solutions(&self) -> &[Solution] {
        match &self.outcome {
            Ok(report) => report.solutions.as_slice(),
            Err(_) => &[],
        }
    }
}

/// Fits `history` once per training window.
///
/// A window that cannot be fitted (for example because it holds no citations) records
/// its error and the remaining windows still run.
pub fn estimate_windows(
    history: &CitationHistory,
    windows: &[TrainingWindow],
    m: f64,
    options: &SearchOptions,
) -> Vec<WindowEstimate> {
    windows
        .iter()
        .map(|&window| {
            let timeline = history.timeline(window);
            let citations = timeline.as_ref().map_or(0, Timeline::len);
            let outcome = timeline
                .and_then(|timeline| WsbProblem::new(timeline, m))
                .and_then(|problem| problem.search(options));

            match &outcome {
                Ok(report) => info!(
                    "paper {} ({:?}): {} solution(s) from {} citation(s)",
                    history.paper_id(),
                    window,
                    report.solutions.len(),
                    citations
                ),
                Err(error) => warn!(
                    "paper {} ({:?}) not fitted: {}",
                    history.paper_id(),
                    window,
                    error
                ),
            }

            WindowEstimate {
                window,
                citations,
                outcome,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::RetryPolicy;
    use crate::timeline::TimelineBuilder;

    #[test]
    fn problem_refuses_empty_timeline() {
        let timeline = Timeline::from_timestamps(Vec::new()).unwrap();
        assert!(matches!(
            WsbProblem::new(timeline, 10.0),
            Err(WsbError::EmptyTimeline)
        ));
    }

    #[test]
    fn problem_refuses_negative_scale() {
        let timeline = Timeline::from_timestamps(vec![100.0, 200.0]).unwrap();
        assert!(matches!(
            WsbProblem::new(timeline, -1.0),
            Err(WsbError::InvalidOption { ref name, .. }) if name == "m"
        ));
    }

    #[test]
    fn zero_scale_problem_builds_models() {
        let timeline = TimelineBuilder::from_counts(&[5, 14, 20, 16, 12, 9]).build().unwrap();
        let problem = WsbProblem::new(timeline, 0.0).unwrap();
        let options = SearchOptions::default()
            .with_step(2.0)
            .with_retry(RetryPolicy::Never);
        let report = problem.search(&options).unwrap();

        let models = problem.models(&report.solutions).unwrap();
        assert_eq!(models.len(), report.solutions.len());
        assert!(models.iter().all(|model| model.m == 0.0));

        let fixed = Solution {
            lambda: 1.5,
            mu: 7.0,
            sigma: 1.0,
            iterations: 4,
        };
        assert!(WsbModel::from_solution(&fixed, problem.m()).is_ok());
    }

    #[test]
    fn empty_window_does_not_abort_other_windows() {
        let history = CitationHistory::new("late-bloomer", Some(2001), vec![0, 0, 0, 0, 0, 1, 3, 2]);
        let options = SearchOptions::default()
            .with_step(4.0)
            .with_retry(RetryPolicy::Never);
        let estimates = estimate_windows(
            &history,
            &[TrainingWindow::Years(5), TrainingWindow::All],
            10.0,
            &options,
        );

        assert_eq!(estimates.len(), 2);
        assert_eq!(estimates[0].citations, 0);
        assert!(matches!(estimates[0].outcome, Err(WsbError::EmptyTimeline)));
        assert!(estimates[0].solutions().is_empty());
        assert_eq!(estimates[1].citations, 6);
        assert!(estimates[1].outcome.is_ok());
    }
}
