//! Wang–Song–Barabási (WSB) citation impact estimation.
//!
//! Given the first years of a paper's citation history, this crate recovers the three
//! WSB parameters: immediacy `mu`, longevity `sigma` and relative fitness `lambda`.
//! `(mu, sigma)` solve a pair of non-linear likelihood equations by Newton-Raphson and
//! `lambda` follows in closed form. Because the equations can have several roots, a grid
//! of initial guesses is swept and every distinct root is reported.
//!
//! The crate offers tools to
//!
//! - spread yearly counts into per-citation timelines (`timeline`, `history` modules),
//! - evaluate the per-iteration sums and the Newton system (`statistics`, `residual`),
//! - run Newton-Raphson and the closed-form lambda (`solving` module),
//! - sweep initial guesses in parallel and deduplicate roots (`search` module), and
//! - evaluate fitted curves and generate synthetic timelines (`model` module).
//!
//! # Quick start
//!
//! ```no_run
//! use wsbrs::history::{CitationHistory, TrainingWindow};
//! use wsbrs::{SearchOptions, WsbProblem};
//!
//! let history = CitationHistory::new("paper-1", Some(2004), vec![3, 11, 17, 14, 10, 7, 5, 4]);
//! let timeline = history.timeline(TrainingWindow::Years(5)).expect("ordered counts");
//!
//! let problem = WsbProblem::new(timeline, 30.0).expect("non-empty window");
//! let report = problem.search(&SearchOptions::default()).expect("valid options");
//!
//! for solution in &report.solutions {
//!     println!(
//!         "lambda = {:.4}, mu = {:.4}, sigma = {:.4}",
//!         solution.lambda, solution.mu, solution.sigma
//!     );
//! }
//! ```
//!
//! File ingestion, plotting and reporting are left to the caller; the crate performs no I/O.

pub mod error;
pub mod estimation;
pub mod history;
pub mod model;
pub mod normal;
pub mod options;
pub mod residual;
pub mod search;
pub mod solving;
pub mod statistics;
pub mod timeline;

pub use error::{Result, WsbError};
pub use estimation::{estimate_windows, WindowEstimate, WsbProblem};
pub use options::{RetryPolicy, SearchOptions, SolverOptions};
pub use search::{search, search_with_cancel, GridRun, SearchReport, SolutionSet};
pub use solving::{estimate_lambda, newton_raphson, Solution};
pub use statistics::{IterationStatistics, TrialParameters};
pub use timeline::{CitationEvent, Timeline, TimelineBuilder};
