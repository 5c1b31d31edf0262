//! `curvegate.report.v1` envelope.

use std::collections::BTreeMap;

use curvegate_types::{AnalysisSettings, REPORT_SCHEMA_V1, RunReport, TestResult, ToolInfo};

use crate::Aggregator;

/// Assemble the JSON report from finished results. Counters are recomputed
/// from `results` so the envelope can never disagree with its own contents.
pub fn build_run_report(
    tool: ToolInfo,
    run_id: String,
    generated_at: String,
    settings: AnalysisSettings,
    results: Vec<TestResult>,
) -> RunReport {
    let mut aggregator = Aggregator::new();
    for result in &results {
        aggregator.fold(result);
    }
    let (summary, suites) = aggregator.into_parts();
    RunReport {
        schema: REPORT_SCHEMA_V1.to_string(),
        tool,
        run_id,
        generated_at,
        settings,
        results,
        summary,
        suites,
        suite_settings: BTreeMap::new(),
    }
}

/// True when every result in the report passed.
pub fn all_passed(report: &RunReport) -> bool {
    report.results.iter().all(|r| r.outcome.is_passed())
}
