//! CheckUseCase - config-driven batch run.
//!
//! For every requested suite:
//! 1. Resolve the suite against the config
//! 2. Evaluate each selected test
//! 3. Stream the text log and fold counters
//!
//! A problem with one test never aborts the batch; it becomes that test's
//! outcome.

use curvegate_adapters::AnswerStore;
use curvegate_types::{ConfigFile, RunReport, TestOutcome, TestResult, ToolInfo};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::{
    Aggregator, Clock, EvaluateTestUseCase, Overrides, ReportHeader, RunSettings, SuitePlan,
    TextReporter, build_run_report,
};

/// Request for the check use case.
#[derive(Debug, Clone)]
pub struct CheckRequest {
    pub config: ConfigFile,

    /// Suites to run; empty means every suite in the config.
    pub suites: Vec<String>,

    /// Tests to run in each suite; empty means the suite's whole registry.
    pub tests: Vec<String>,

    pub overrides: Overrides,

    pub tool: ToolInfo,
}

#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub report: RunReport,

    /// The rendered text log.
    pub log: String,

    /// True if any test did not pass.
    pub failed: bool,
}

pub struct CheckUseCase<S: AnswerStore, C: Clock> {
    store: S,
    clock: C,
}

impl<S: AnswerStore, C: Clock> CheckUseCase<S, C> {
    pub fn new(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    pub fn execute(&self, req: CheckRequest) -> anyhow::Result<CheckOutcome> {
        let run = RunSettings::resolve(&req.config, &req.overrides);
        let generated_at = self.clock.now_rfc3339();
        let run_id = uuid::Uuid::new_v4().to_string();

        let suite_names: Vec<String> = if req.suites.is_empty() {
            req.config.suites.iter().map(|s| s.name.clone()).collect()
        } else {
            req.suites.clone()
        };

        let mut reporter = TextReporter::new(Vec::new(), run.brief);
        reporter.header(&ReportHeader::for_host(
            generated_at.clone(),
            run.layout.baseline_dir.display().to_string(),
            run.layout.output_dir.display().to_string(),
            run.analysis.clone(),
        ))?;

        let evaluate = EvaluateTestUseCase::new(&self.store);
        let mut aggregator = Aggregator::new();
        let mut results = Vec::new();
        let mut suite_settings = BTreeMap::new();

        for name in &suite_names {
            let plan = SuitePlan::resolve(&req.config, &run, &req.overrides, name);
            let tests = plan.selected_tests(&req.tests);
            debug!(suite = %plan.name, tests = tests.len(), "running suite");
            if plan.analysis != run.analysis {
                suite_settings.insert(plan.name.clone(), plan.analysis.clone());
            }

            let suite_results = if !plan.configured && tests.is_empty() {
                vec![unknown_suite(&plan.name)]
            } else {
                tests
                    .iter()
                    .map(|test| evaluate.execute(&plan.request(test)))
                    .collect::<anyhow::Result<Vec<_>>>()?
            };

            for result in suite_results {
                aggregator.fold(&result);
                reporter.test(&result, plan.analysis.significant_digits)?;
                results.push(result);
            }
        }

        reporter.summary(&aggregator)?;
        let log = String::from_utf8_lossy(&reporter.into_inner()).into_owned();

        let global = aggregator.global();
        info!(
            total = global.total,
            passed = global.passed,
            failed = global.failed,
            invalid = global.invalid,
            "check finished"
        );

        let failed = results.iter().any(|r| !r.outcome.is_passed());
        let mut report = build_run_report(req.tool, run_id, generated_at, run.analysis, results);
        report.suite_settings = suite_settings;
        Ok(CheckOutcome {
            report,
            log,
            failed,
        })
    }
}

fn unknown_suite(name: &str) -> TestResult {
    TestResult {
        suite: name.to_string(),
        test: name.to_string(),
        outcome: TestOutcome::InvalidTest {
            message: format!("{name} is not a known suite"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluate::fake::{FakeStore, set};
    use crate::parse_config;
    use curvegate_types::OutcomeStatus;

    #[derive(Clone)]
    struct FixedClock;

    impl Clock for FixedClock {
        fn now_rfc3339(&self) -> String {
            "2024-01-01T00:00:00Z".to_string()
        }
    }

    const CONFIG: &str = r#"
[[suite]]
name = "BAR"
tests = ["bar1", "bar2"]

[[suite]]
name = "PLATE"
tests = ["plate1"]
run_validation_suffix = ".hsp"
"#;

    fn tool() -> ToolInfo {
        ToolInfo {
            name: "curvegate".into(),
            version: "test".into(),
        }
    }

    fn store() -> FakeStore {
        let mut store = FakeStore::default();
        store.baselines.insert("bar1".into(), set(&[("ke", 0.0, 1.0)]));
        store.outputs.insert("bar1".into(), set(&[("ke", 0.0, 1.0)]));
        store.baselines.insert("bar2".into(), set(&[("ke", 0.0, 1.0)]));
        store.outputs.insert("bar2".into(), set(&[("ke", 0.0, 1.5)]));
        store.baselines.insert("plate1".into(), set(&[("ie", 0.0, 1.0)]));
        store.outputs.insert("plate1".into(), set(&[("ie", 0.0, 1.0)]));
        store
    }

    fn request(suites: &[&str], tests: &[&str]) -> CheckRequest {
        CheckRequest {
            config: parse_config(CONFIG).unwrap(),
            suites: suites.iter().map(|s| s.to_string()).collect(),
            tests: tests.iter().map(|s| s.to_string()).collect(),
            overrides: Overrides::default(),
            tool: tool(),
        }
    }

    #[test]
    fn runs_every_configured_suite() {
        let store = store();
        let outcome = CheckUseCase::new(&store, FixedClock)
            .execute(request(&[], &[]))
            .unwrap();

        let statuses: Vec<(String, OutcomeStatus)> = outcome
            .report
            .results
            .iter()
            .map(|r| (r.test.clone(), r.outcome.status()))
            .collect();
        assert_eq!(
            statuses,
            vec![
                ("bar1".to_string(), OutcomeStatus::Passed),
                ("bar2".to_string(), OutcomeStatus::Failed),
                ("plate1".to_string(), OutcomeStatus::RunError),
            ]
        );
        assert!(outcome.failed);
        assert_eq!(outcome.report.summary.total, 3);
        assert_eq!(outcome.report.summary.abnormal(), 1);
        assert_eq!(outcome.report.generated_at, "2024-01-01T00:00:00Z");

        assert!(outcome.log.contains("\nSuite: BAR\n"));
        assert!(outcome.log.contains("  **bar1 status: passed\n"));
        assert!(outcome.log.contains("  **plate1 status: Code failed to run correctly.\n"));
        assert!(outcome.log.contains("Tests run:  3\n"));
    }

    #[test]
    fn unknown_suite_without_tests_is_one_invalid_result() {
        let store = store();
        let outcome = CheckUseCase::new(&store, FixedClock)
            .execute(request(&["SLIDE"], &[]))
            .unwrap();
        assert_eq!(outcome.report.results.len(), 1);
        assert_eq!(
            outcome.report.results[0].outcome.status(),
            OutcomeStatus::InvalidTest
        );
        assert_eq!(outcome.report.summary.invalid, 1);
        assert!(outcome.failed);
    }

    #[test]
    fn unknown_test_names_are_invalid() {
        let store = store();
        let outcome = CheckUseCase::new(&store, FixedClock)
            .execute(request(&["BAR"], &["bar1", "bar9"]))
            .unwrap();
        let statuses: Vec<OutcomeStatus> = outcome
            .report
            .results
            .iter()
            .map(|r| r.outcome.status())
            .collect();
        assert_eq!(
            statuses,
            vec![OutcomeStatus::Passed, OutcomeStatus::InvalidTest]
        );
    }

    #[test]
    fn all_passing_run_is_not_failed() {
        let store = store();
        let outcome = CheckUseCase::new(&store, FixedClock)
            .execute(request(&["BAR"], &["bar1"]))
            .unwrap();
        assert!(!outcome.failed);
        assert_eq!(outcome.report.suites["BAR"].passed, 1);
    }

    #[test]
    fn suite_overrides_are_recorded_in_report() {
        let store = store();
        let mut req = request(&[], &[]);
        req.config.suites[1].significant_digits = Some(3);
        let outcome = CheckUseCase::new(&store, FixedClock).execute(req).unwrap();

        let report = &outcome.report;
        assert_eq!(report.suite_settings.len(), 1);
        assert_eq!(report.settings_for("PLATE").significant_digits, 3);
        assert_eq!(report.settings_for("BAR").significant_digits, 6);
    }
}
