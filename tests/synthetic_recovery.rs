use approx::assert_relative_eq;
use wsbrs::model::WsbModel;
use wsbrs::residual::NewtonSystem;
use wsbrs::{
    newton_raphson, IterationStatistics, RetryPolicy, SearchOptions, SearchReport, SolverOptions,
    TrialParameters, WsbError, WsbProblem,
};

const HORIZON_DAYS: f64 = 365.0 * 20.0;

fn reference_model() -> WsbModel {
    WsbModel::new(4.0, 7.0, 1.0, 30.0).unwrap()
}

/// Events placed exactly on the WSB curve; with a few thousand citations the
/// discretisation bias still dominates the error.
#[test]
fn solver_recovers_parameters_from_quantile_timeline() {
    let truth = reference_model();
    let timeline = truth.quantile_timeline(HORIZON_DAYS).unwrap();
    assert!(timeline.len() > 1_000);

    let solution = newton_raphson(
        &timeline,
        TrialParameters::new(7.1, 1.1),
        truth.m,
        &SolverOptions::default(),
    )
    .unwrap();

    assert!((solution.mu - truth.mu).abs() < 2e-2, "mu = {}", solution.mu);
    assert!((solution.sigma - truth.sigma).abs() < 2e-2, "sigma = {}", solution.sigma);
    assert_relative_eq!(solution.lambda, truth.lambda, max_relative = 2e-2);

    // The root itself is tight: residuals vanish and nearby restarts agree.
    let stats = IterationStatistics::evaluate(&timeline, solution.parameters(), truth.m).unwrap();
    let system = NewtonSystem::from_statistics(&stats);
    assert!(system.residual.norm() < 1e-8);

    for &(dmu, dsigma) in &[(-0.05, 0.05), (0.05, -0.05), (0.1, 0.1)] {
        let restart = newton_raphson(
            &timeline,
            TrialParameters::new(solution.mu + dmu, solution.sigma + dsigma),
            truth.m,
            &SolverOptions::default(),
        )
        .unwrap();
        assert_relative_eq!(restart.mu, solution.mu, epsilon = 1e-4);
        assert_relative_eq!(restart.sigma, solution.sigma, epsilon = 1e-4);
        assert_relative_eq!(restart.lambda, solution.lambda, max_relative = 1e-2);
    }
}

/// With hundreds of thousands of citations the bias shrinks below 1e-4.
#[test]
fn solver_recovers_parameters_at_high_citation_counts() {
    let truth = WsbModel::new(6.0, 7.0, 1.0, 1000.0).unwrap();
    let timeline = truth.quantile_timeline(365.0 * 60.0).unwrap();
    assert!(timeline.len() > 300_000);

    let solution = newton_raphson(
        &timeline,
        TrialParameters::new(7.1, 1.1),
        truth.m,
        &SolverOptions::default(),
    )
    .unwrap();

    assert!((solution.mu - truth.mu).abs() < 1e-4, "mu = {}", solution.mu);
    assert!((solution.sigma - truth.sigma).abs() < 1e-4, "sigma = {}", solution.sigma);
    assert_relative_eq!(solution.lambda, truth.lambda, max_relative = 1e-2);
}

#[test]
fn grid_search_finds_the_generating_root() {
    let truth = reference_model();
    let timeline = truth.quantile_timeline(HORIZON_DAYS).unwrap();
    let problem = WsbProblem::new(timeline, truth.m).unwrap();

    let report = problem.search(&SearchOptions::default()).unwrap();
    assert!(!report.solutions.is_empty());
    assert!(report.solutions.iter().all(|s| s.lambda >= 0.0));
    assert!(report.solutions.iter().any(|s| {
        (s.mu - truth.mu).abs() < 2e-2
            && (s.sigma - truth.sigma).abs() < 2e-2
            && (s.lambda - truth.lambda).abs() < 0.02 * truth.lambda
    }));

    // Accepted lambdas are pairwise distinct.
    let lambdas: Vec<f64> = report.solutions.iter().map(|s| s.lambda).collect();
    for (i, a) in lambdas.iter().enumerate() {
        for b in &lambdas[i + 1..] {
            assert!((a - b).abs() >= 1e-2);
        }
    }

    let models = problem.models(&report.solutions).unwrap();
    assert_eq!(models.len(), report.solutions.len());
}

#[test]
fn repeated_searches_are_identical() {
    let truth = reference_model();
    let timeline = truth.quantile_timeline(365.0 * 8.0).unwrap();
    let problem = WsbProblem::new(timeline, truth.m).unwrap();
    let options = SearchOptions::default();

    let first = problem.search(&options).unwrap();
    let second = problem.search(&options).unwrap();
    assert_eq!(first.solutions, second.solutions);
    assert_eq!(first.lambda_history(), second.lambda_history());
}

#[test]
fn solver_handles_simulated_process() {
    let truth = reference_model();
    let timeline = truth.simulate_timeline(HORIZON_DAYS, 2024).unwrap();
    assert!(timeline.len() > 100);

    let solution = newton_raphson(
        &timeline,
        TrialParameters::new(7.1, 1.1),
        truth.m,
        &SolverOptions::default(),
    )
    .unwrap();
    assert!((solution.mu - truth.mu).abs() < 0.25, "mu = {}", solution.mu);
    assert!((solution.sigma - truth.sigma).abs() < 0.25, "sigma = {}", solution.sigma);
    assert_relative_eq!(solution.lambda, truth.lambda, max_relative = 0.2);
}

#[test]
fn solution_set_serializes_as_plain_records() {
    let truth = reference_model();
    let timeline = truth.quantile_timeline(HORIZON_DAYS).unwrap();
    let report = WsbProblem::new(timeline, truth.m)
        .unwrap()
        .search(&SearchOptions::default())
        .unwrap();

    let json = serde_json::to_value(&report.solutions).unwrap();
    let records = json.as_array().expect("solution set serializes as an array");
    assert_eq!(records.len(), report.solutions.len());
    for record in records {
        assert!(record.get("lambda").is_some());
        assert!(record.get("mu").is_some());
        assert!(record.get("sigma").is_some());
        assert!(record.get("iterations").is_some());
    }
}

#[test]
fn search_report_round_trips_through_json() {
    let truth = reference_model();
    let timeline = truth.quantile_timeline(365.0 * 8.0).unwrap();
    let options = SearchOptions::default()
        .with_step(2.0)
        .with_retry(RetryPolicy::Never);
    let report = WsbProblem::new(timeline, truth.m)
        .unwrap()
        .search(&options)
        .unwrap();

    let json = serde_json::to_string(&report).unwrap();
    let restored: SearchReport = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, report);
    assert_eq!(restored.runs.len(), report.runs.len());

    let value = serde_json::to_value(&report).unwrap();
    let runs = value["runs"].as_array().expect("run log serializes as an array");
    for (record, run) in runs.iter().zip(&report.runs) {
        let key = if run.outcome.is_ok() { "Ok" } else { "Err" };
        assert!(record["outcome"].get(key).is_some(), "{record}");
    }
}

#[test]
fn per_run_failures_survive_serialization() {
    let failures = vec![
        WsbError::numerical("Newton update"),
        WsbError::singular(3, 0.5, 2.0),
        WsbError::DidNotConverge {
            iterations: 32,
            step_norm: 0.25,
        },
        WsbError::invalid_option("m", -1.0),
    ];
    let json = serde_json::to_string(&failures).unwrap();
    let restored: Vec<WsbError> = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, failures);
    assert_eq!(
        restored[0].to_string(),
        "encountered a non-finite value during Newton update"
    );
}
