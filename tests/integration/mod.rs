//! Library-level integration: filesystem store, use cases and the text log
//! working together.

use std::fs;
use std::path::Path;

use curvegate_adapters::{FsAnswerStore, StoreLayout, TestLocation};
use curvegate_app::{
    CheckRequest, CheckUseCase, Clock, EvaluateRequest, EvaluateTestUseCase, Overrides,
    StatsUseCase, parse_config, render_run_report,
};
use curvegate_types::{AnalysisSettings, AnalyzerKind, OutcomeStatus, TestOutcome, ToolInfo};
use tempfile::TempDir;

struct FixedClock;

impl Clock for FixedClock {
    fn now_rfc3339(&self) -> String {
        "2024-05-01T12:00:00Z".to_string()
    }
}

fn write(path: &Path, text: &str) {
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, text).expect("write fixture");
}

fn layout(root: &Path) -> StoreLayout {
    StoreLayout {
        baseline_dir: root.join("baselines"),
        output_dir: root.join("runs"),
        ..StoreLayout::default()
    }
}

fn tool() -> ToolInfo {
    ToolInfo {
        name: "curvegate".into(),
        version: "test".into(),
    }
}

#[test]
fn range_mode_uses_historical_runs_and_writes_stats() {
    let tmp = TempDir::new().expect("temp dir");
    let root = tmp.path();
    write(&root.join("baselines/BAR/run1/bar1.answ"), "# vel\n0 1.0\n1 10\n");
    write(&root.join("baselines/BAR/run2/bar1.answ"), "# vel\n0 2.0\n1 12\n");
    write(&root.join("runs/BAR/bar1/bar1.jansw"), "# vel\n0 2.5\n1 11\n");

    let req = EvaluateRequest {
        location: TestLocation::new("BAR", "bar1", layout(root)),
        known: true,
        analysis: AnalysisSettings {
            mode: AnalyzerKind::Range,
            significant_digits: 6,
            stddev_multiplier: 2.0,
        },
        run_validation_suffix: None,
    };
    let result = EvaluateTestUseCase::new(FsAnswerStore)
        .execute(&req)
        .expect("evaluate");

    match &result.outcome {
        TestOutcome::Failed { summary, records } => {
            assert_eq!(summary.max_error, 0.5);
            let at = summary.max_error_at.as_ref().expect("location");
            assert_eq!((at.curve.as_str(), at.timestep), ("vel", 0.0));
            assert!(records.contains_key("vel"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(req.location.stats_file().is_file());
}

#[test]
fn stats_use_case_matches_written_file() {
    let tmp = TempDir::new().expect("temp dir");
    let root = tmp.path();
    write(&root.join("baselines/BAR/a/bar1.answ"), "# ke\n0.5 1\n");
    write(&root.join("baselines/BAR/b/bar1.answ"), "# ke\n0.5 3\n");

    let location = TestLocation::new("BAR", "bar1", layout(root));
    let outcome = StatsUseCase::new(FsAnswerStore)
        .execute(&location)
        .expect("stats");
    assert_eq!(outcome.runs, 2);

    let reread = curvegate_adapters::read_stats_file(&outcome.path).expect("reread");
    assert_eq!(reread, outcome.stats);
    let stats = reread.get("ke", 0.5).expect("ke at 0.5");
    assert_eq!((stats.min, stats.max, stats.mean), (1.0, 3.0, 2.0));
}

#[test]
fn check_run_reports_every_test_once() {
    let tmp = TempDir::new().expect("temp dir");
    let root = tmp.path();
    write(&root.join("baselines/BAR/bar1.answ"), "# ke\n0 1\nend\n");
    write(&root.join("runs/BAR/bar1/bar1.jansw"), "# ke\n0 1\nend\n");
    write(&root.join("runs/BAR/bar1/bar1.hsp"), " n o r m a l    t e r m i n a t i o n\n");
    write(&root.join("baselines/BAR/bar2.answ"), "# ke\n0 1\nend\n");
    write(&root.join("runs/BAR/bar2/bar2.jansw"), "# ke\n0 1\nend\n");

    let config = parse_config(
        "[[suite]]\nname = \"BAR\"\ntests = [\"bar1\", \"bar2\"]\nrun_validation_suffix = \".hsp\"\n",
    )
    .expect("config");

    let overrides = Overrides {
        baseline_dir: Some(root.join("baselines")),
        output_dir: Some(root.join("runs")),
        ..Overrides::default()
    };
    let outcome = CheckUseCase::new(FsAnswerStore, FixedClock)
        .execute(CheckRequest {
            config,
            suites: vec!["BAR".into(), "SLIDE".into()],
            tests: vec![],
            overrides,
            tool: tool(),
        })
        .expect("check");

    let statuses: Vec<OutcomeStatus> = outcome
        .report
        .results
        .iter()
        .map(|r| r.outcome.status())
        .collect();
    assert_eq!(
        statuses,
        vec![
            OutcomeStatus::Passed,
            OutcomeStatus::RunError,
            OutcomeStatus::InvalidTest
        ]
    );
    assert_eq!(outcome.report.summary.total, 3);
    assert_eq!(outcome.report.summary.abnormal(), 1);
    assert!(outcome.log.contains("  Generated at: 2024-05-01T12:00:00Z\n"));

    // The JSON report renders back to the same test blocks and summary.
    let rerendered = render_run_report(&outcome.report, false);
    let body = outcome.log.split_once("\nSuite: BAR\n").expect("suite").1;
    assert!(rerendered.ends_with(body));
}
