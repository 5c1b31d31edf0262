//! EvaluateTestUseCase - one test from registry check to terminal outcome.
//!
//! The state machine is `pending -> passed | failed | run_error |
//! setup_failure | invalid_test`:
//! 1. tests missing from the suite registry are `invalid_test`
//! 2. a run log without the normal-termination marker is `run_error`
//! 3. missing or malformed answer files are `setup_failure`
//! 4. otherwise the comparator decides `passed` / `failed`

use curvegate_adapters::{AnswerStore, TestLocation};
use curvegate_domain::{Baseline, CompareOutcome, compare, new_analyzer};
use curvegate_error::CurvegateError;
use curvegate_types::{AnalysisSettings, CurveSet, StatsMap, TestOutcome, TestResult};
use tracing::{debug, info, warn};

pub const RUN_ERROR_MESSAGE: &str = "Code failed to run correctly";

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluateRequest {
    pub location: TestLocation,
    /// Whether the test is in its suite's registry.
    pub known: bool,
    pub analysis: AnalysisSettings,
    /// Run-log suffix that must carry the normal-termination marker.
    pub run_validation_suffix: Option<String>,
}

/// Turn a finished comparison into a terminal outcome.
pub fn outcome_from_comparison(outcome: CompareOutcome) -> TestOutcome {
    if outcome.passed {
        TestOutcome::Passed {
            summary: outcome.summary,
        }
    } else {
        TestOutcome::Failed {
            summary: outcome.summary,
            records: outcome.records,
        }
    }
}

enum Reference {
    Answers(CurveSet),
    Stats(StatsMap),
}

pub struct EvaluateTestUseCase<S: AnswerStore> {
    store: S,
}

impl<S: AnswerStore> EvaluateTestUseCase<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Evaluate one test. Problems with the test's own files become
    /// `setup_failure`; only tool-level problems are returned as errors.
    pub fn execute(&self, req: &EvaluateRequest) -> anyhow::Result<TestResult> {
        let loc = &req.location;
        let outcome = self.evaluate(req)?;
        info!(
            suite = %loc.suite,
            test = %loc.test,
            status = %outcome.status(),
            "test evaluated"
        );
        Ok(TestResult {
            suite: loc.suite.clone(),
            test: loc.test.clone(),
            outcome,
        })
    }

    fn evaluate(&self, req: &EvaluateRequest) -> anyhow::Result<TestOutcome> {
        let loc = &req.location;

        if !req.known {
            return Ok(TestOutcome::InvalidTest {
                message: format!("{} is not a known test in suite {}", loc.test, loc.suite),
            });
        }

        if let Some(suffix) = &req.run_validation_suffix {
            match self.store.terminated_normally(loc, suffix) {
                Ok(true) => {}
                Ok(false) => {
                    return Ok(TestOutcome::RunError {
                        message: RUN_ERROR_MESSAGE.to_string(),
                    });
                }
                Err(e) => return setup_failure(vec![e]),
            }
        }

        let mut problems = Vec::new();
        let output = self
            .store
            .load_output(loc)
            .map_err(|e| problems.push(e))
            .ok();
        let reference = self
            .load_reference(req)
            .map_err(|e| problems.push(e))
            .ok();

        let (Some(output), Some(reference)) = (output, reference) else {
            return setup_failure(problems);
        };

        let a = &req.analysis;
        let mut analyzer = new_analyzer(a.mode, a.significant_digits, a.stddev_multiplier);
        let baseline = match &reference {
            Reference::Answers(set) => Baseline::Answers(set),
            Reference::Stats(stats) => Baseline::Stats(stats),
        };
        let result = compare(baseline, &output, analyzer.as_mut());
        debug!(
            test = %loc.test,
            records = result.records.len(),
            max_error = result.summary.max_error,
            "comparison finished"
        );
        Ok(outcome_from_comparison(result))
    }

    fn load_reference(&self, req: &EvaluateRequest) -> Result<Reference, CurvegateError> {
        let loc = &req.location;
        if !req.analysis.mode.needs_history() {
            return self.store.load_baseline(loc).map(Reference::Answers);
        }

        let runs = self.store.load_history(loc)?;
        let stats = curvegate_stats::compute_stats(&runs);
        match self.store.save_stats(loc, &stats) {
            Ok(path) => debug!(path = %path.display(), runs = runs.len(), "stats written"),
            Err(e) => warn!(test = %loc.test, error = %e, "could not persist stats"),
        }
        Ok(Reference::Stats(stats))
    }
}

fn setup_failure(problems: Vec<CurvegateError>) -> anyhow::Result<TestOutcome> {
    if let Some(fatal) = problems.iter().find(|e| !e.is_setup_failure()) {
        anyhow::bail!("{fatal}");
    }
    for e in &problems {
        warn!(error = %e, "setup failure");
    }
    Ok(TestOutcome::SetupFailure {
        messages: problems.iter().map(ToString::to_string).collect(),
    })
}

/// Compute and persist stats for one test without comparing anything.
pub struct StatsUseCase<S: AnswerStore> {
    store: S,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatsOutcome {
    pub stats: StatsMap,
    pub runs: usize,
    pub path: std::path::PathBuf,
}

impl<S: AnswerStore> StatsUseCase<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn execute(&self, location: &TestLocation) -> anyhow::Result<StatsOutcome> {
        let runs = self.store.load_history(location)?;
        let stats = curvegate_stats::compute_stats(&runs);
        let path = self.store.save_stats(location, &stats)?;
        info!(test = %location.test, runs = runs.len(), path = %path.display(), "stats generated");
        Ok(StatsOutcome {
            stats,
            runs: runs.len(),
            path,
        })
    }
}


#[cfg(test)]
mod tests {
    use super::fake::{FakeStore, set};
    use super::*;
    use curvegate_adapters::StoreLayout;
    use curvegate_types::{AnalyzerKind, CurveReport, OutcomeStatus};

    fn request(test: &str, mode: AnalyzerKind) -> EvaluateRequest {
        EvaluateRequest {
            location: TestLocation::new("BAR", test, StoreLayout::default()),
            known: true,
            analysis: AnalysisSettings {
                mode,
                significant_digits: 6,
                stddev_multiplier: 2.0,
            },
            run_validation_suffix: None,
        }
    }

    #[test]
    fn unknown_test_is_invalid() {
        let store = FakeStore::default();
        let mut req = request("bar9", AnalyzerKind::Absolute);
        req.known = false;
        let result = EvaluateTestUseCase::new(&store).execute(&req).unwrap();
        assert_eq!(result.outcome.status(), OutcomeStatus::InvalidTest);
    }

    #[test]
    fn abnormal_termination_is_run_error() {
        let mut store = FakeStore::default();
        store.baselines.insert("bar1".into(), set(&[("ke", 0.0, 1.0)]));
        store.outputs.insert("bar1".into(), set(&[("ke", 0.0, 1.0)]));
        let mut req = request("bar1", AnalyzerKind::Absolute);
        req.run_validation_suffix = Some(".hsp".into());

        let result = EvaluateTestUseCase::new(&store).execute(&req).unwrap();
        assert_eq!(
            result.outcome,
            TestOutcome::RunError {
                message: RUN_ERROR_MESSAGE.into()
            }
        );

        store.normal_runs.push("bar1".into());
        let result = EvaluateTestUseCase::new(&store).execute(&req).unwrap();
        assert!(result.outcome.is_passed());
    }

    #[test]
    fn missing_files_are_setup_failure_listing_each_path() {
        let store = FakeStore::default();
        let req = request("bar1", AnalyzerKind::Absolute);
        let result = EvaluateTestUseCase::new(&store).execute(&req).unwrap();
        match result.outcome {
            TestOutcome::SetupFailure { messages } => {
                assert_eq!(messages.len(), 2);
                assert!(messages[0].contains("bar1.jansw"));
                assert!(messages[1].contains("bar1.answ"));
            }
            other => panic!("expected setup failure, got {other:?}"),
        }
    }

    #[test]
    fn absolute_comparison_passes_and_fails() {
        let mut store = FakeStore::default();
        store
            .baselines
            .insert("bar1".into(), set(&[("ke", 0.0, 1.0), ("ie", 0.0, 2.0)]));
        store.outputs.insert("bar1".into(), set(&[("ke", 0.0, 1.0)]));

        let result = EvaluateTestUseCase::new(&store)
            .execute(&request("bar1", AnalyzerKind::Absolute))
            .unwrap();
        match result.outcome {
            TestOutcome::Failed { records, .. } => {
                assert_eq!(records.get("ie"), Some(&CurveReport::MissingInTest));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn range_mode_uses_history_and_saves_stats() {
        let mut store = FakeStore::default();
        store.history.insert(
            "bar1".into(),
            vec![set(&[("vel", 0.0, 1.0)]), set(&[("vel", 0.0, 2.0)])],
        );
        store.outputs.insert("bar1".into(), set(&[("vel", 0.0, 1.5)]));

        let result = EvaluateTestUseCase::new(&store)
            .execute(&request("bar1", AnalyzerKind::Range))
            .unwrap();
        assert!(result.outcome.is_passed());
        assert_eq!(store.saved_stats.borrow().as_slice(), ["bar1".to_string()]);
    }

    #[test]
    fn stddev_mode_without_history_is_setup_failure() {
        let mut store = FakeStore::default();
        store.outputs.insert("bar1".into(), set(&[("vel", 0.0, 1.5)]));
        let result = EvaluateTestUseCase::new(&store)
            .execute(&request("bar1", AnalyzerKind::Stddev))
            .unwrap();
        assert_eq!(result.outcome.status(), OutcomeStatus::SetupFailure);
    }

    #[test]
    fn stats_use_case_reports_run_count() {
        let mut store = FakeStore::default();
        store.history.insert(
            "bar1".into(),
            vec![set(&[("vel", 0.0, 1.0)]), set(&[("vel", 0.0, 3.0)])],
        );
        let loc = TestLocation::new("BAR", "bar1", StoreLayout::default());
        let out = StatsUseCase::new(&store).execute(&loc).unwrap();
        assert_eq!(out.runs, 2);
        assert_eq!(out.stats.get("vel", 0.0).unwrap().mean, 2.0);
    }
}
