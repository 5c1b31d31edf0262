//! Plain-text run log.
//!
//! Layout mirrors the historical regression log: a run header, one block per
//! suite with one status line per test, failure tables, and the
//! global / per-suite summary at the end.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io;

use curvegate_types::{
    AnalysisSettings, AnalysisSummary, ComparisonRecord, Counters, CurveReport, CurveRecords,
    MESSAGE_UNKNOWN_TIMESTEP, RunReport, SamplePoint, TestOutcome, TestResult, format_sci,
};

use crate::Aggregator;

const SUMMARY_RULE_WIDTH: usize = 76;
const VALUE_COLUMN: usize = 24;

/// Run-level facts printed before the first suite.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportHeader {
    pub generated_at: String,
    pub os: String,
    pub arch: String,
    pub baseline_dir: String,
    pub output_dir: String,
    pub settings: AnalysisSettings,
}

impl ReportHeader {
    pub fn for_host(
        generated_at: String,
        baseline_dir: String,
        output_dir: String,
        settings: AnalysisSettings,
    ) -> Self {
        Self {
            generated_at,
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            baseline_dir,
            output_dir,
            settings,
        }
    }
}

pub fn render_header(header: &ReportHeader) -> String {
    let mut out = String::new();
    out.push_str("Summary for Testing\n\n");
    out.push_str("System Summary:\n");
    let _ = writeln!(out, "  OS type: {}", header.os);
    let _ = writeln!(out, "  Processor: {}\n", header.arch);
    out.push_str("Global Run Information\n");
    let _ = writeln!(out, "  Generated at: {}", header.generated_at);
    let _ = writeln!(out, "  Baseline directory: {}", header.baseline_dir);
    let _ = writeln!(out, "  Testing directory: {}", header.output_dir);
    let _ = writeln!(out, "  Test mode: {}", header.settings.mode);
    let _ = writeln!(
        out,
        "  Significant Digits: {}",
        header.settings.significant_digits
    );
    let _ = writeln!(
        out,
        "  Standard deviation multiplier: {}",
        header.settings.stddev_multiplier
    );
    out
}

pub fn render_suite_header(suite: &str) -> String {
    format!("\nSuite: {suite}\n")
}

/// Status line plus, for failures, the worst-case block and (unless `brief`)
/// the per-curve tables. `digits` is the significant-digit setting the test
/// was compared with.
pub fn render_test(result: &TestResult, digits: u32, brief: bool) -> String {
    let mut out = String::new();
    let test = &result.test;
    match &result.outcome {
        TestOutcome::Passed { .. } => {
            let _ = writeln!(out, "  **{test} status: passed");
        }
        TestOutcome::RunError { message } | TestOutcome::InvalidTest { message } => {
            let _ = writeln!(out, "  **{test} status: {message}.");
        }
        TestOutcome::SetupFailure { messages } => {
            let _ = writeln!(out, "  **{test} status: Test environment failure.");
            for m in messages {
                let _ = writeln!(out, "    {m}");
            }
        }
        TestOutcome::Failed { summary, records } => {
            let _ = writeln!(out, "  **{test} status: failed");
            render_worst_case(&mut out, summary);
            if !brief {
                render_records(&mut out, records, digits);
            }
        }
    }
    out
}

fn location(at: Option<&SamplePoint>) -> (String, String) {
    match at {
        Some(p) => (p.curve.clone(), format_sci(p.timestep, 1)),
        None => ("-".to_string(), "-".to_string()),
    }
}

fn render_worst_case(out: &mut String, s: &AnalysisSummary) {
    let (pct_curve, pct_step) = location(s.max_percent_error_at.as_ref());
    let (err_curve, err_step) = location(s.max_error_at.as_ref());

    let max_pct = format!("Max percent Error: {}%", format_sci(s.max_percent_error, 3));
    let assoc_err = format!("Error: {}", format_sci(s.error_at_max_percent, 4));
    let max_err = format!("Max Error: {}", format_sci(s.max_error, 4));
    let assoc_pct = format!("Perc Error: {}%", format_sci(s.percent_at_max_error, 3));

    let _ = writeln!(out, "     {max_pct:<23}");
    let _ = writeln!(out, "     {assoc_err:<22} Curve: {pct_curve:<23} Step: {pct_step}");
    let _ = writeln!(out, "     {max_err:<23}");
    let _ = writeln!(out, "     {assoc_pct:<22} Curve: {err_curve:<23} Step: {err_step}");
    if let Some(sigma) = s.max_sigma {
        let _ = writeln!(out, "     Max sigma: {}", format_sci(sigma, 3));
    }
    out.push('\n');
}

fn render_records(out: &mut String, records: &CurveRecords, digits: u32) {
    let value_digits = digits.saturating_sub(1) as usize;
    for (curve, report) in records {
        let _ = writeln!(out, "    Curve: {curve}");
        match report {
            CurveReport::MissingInTest => {
                let _ = writeln!(out, "      Baselines curve {curve} not generated in test");
            }
            CurveReport::UnknownCurve => {
                out.push_str("      Curve not in baselines\n");
            }
            CurveReport::Timesteps { records } => {
                let _ = writeln!(
                    out,
                    "      Timestep   {:>16}{:>22}{:>20}",
                    "Baseline", "Test", "% Error"
                );
                for record in records.values() {
                    render_record(out, record, value_digits);
                }
            }
        }
    }
}

fn render_record(out: &mut String, record: &ComparisonRecord, value_digits: usize) {
    let step = format_sci(record.timestep, 1);
    if !record.valid {
        if record.message == MESSAGE_UNKNOWN_TIMESTEP {
            let _ = writeln!(out, "      {step:<10} has no corresponding baseline value");
        } else {
            let _ = writeln!(out, "      {step} has no matching test result");
        }
        return;
    }

    let baseline = centered(record.baseline, value_digits);
    let test = centered(record.test_value, value_digits);
    match record.percent_error {
        Some(pct) => {
            let pct = format_sci(pct, 2);
            let _ = writeln!(out, "      {step:<10}{baseline:>24}{test:>24}{pct:>10}%");
        }
        None => {
            let _ = writeln!(out, "      {step:<10}{baseline:>24}{test:>24}");
        }
    }
}

/// Pad a value so it sits near the middle of its right-aligned column.
fn centered(value: Option<f64>, digits: usize) -> String {
    let text = value.map_or_else(|| "-".to_string(), |v| format_sci(v, digits));
    let pad = VALUE_COLUMN.saturating_sub(text.len()) / 2;
    format!("{text}{}", " ".repeat(pad))
}

pub fn render_summary(global: &Counters, suites: &BTreeMap<String, Counters>) -> String {
    let mut out = String::new();
    out.push_str(&"*".repeat(SUMMARY_RULE_WIDTH));
    out.push_str("\nSummary\n");
    let _ = writeln!(out, "Tests run:  {}", global.total);
    let _ = writeln!(out, "Total Tests passed: {}", global.passed);
    let _ = writeln!(out, "Total Tests failed: {}", global.failed);
    let _ = writeln!(out, "Abnormal termination: {}", global.abnormal());
    let _ = writeln!(out, "Invalid Tests: {}", global.invalid);
    out.push_str("\nSuite summaries\n");
    for (name, c) in suites {
        let _ = writeln!(out, "  Suite {name}");
        let _ = writeln!(out, "    Total tests run: {}", c.total);
        let _ = writeln!(out, "    Total Test passed: {}", c.passed);
        let _ = writeln!(out, "    Total Test failed: {}", c.failed);
        let _ = writeln!(out, "    {} failed to run", c.not_run());
    }
    out
}

/// Re-render a finished JSON report as a text log.
pub fn render_run_report(report: &RunReport, brief: bool) -> String {
    let mut out = String::new();
    let mut current: Option<&str> = None;
    for result in &report.results {
        if current != Some(result.suite.as_str()) {
            out.push_str(&render_suite_header(&result.suite));
            current = Some(result.suite.as_str());
        }
        let digits = report.settings_for(&result.suite).significant_digits;
        out.push_str(&render_test(result, digits, brief));
    }
    out.push_str(&render_summary(&report.summary, &report.suites));
    out
}

/// Streams the text log as tests finish.
pub struct TextReporter<W: io::Write> {
    out: W,
    brief: bool,
    current_suite: Option<String>,
}

impl<W: io::Write> TextReporter<W> {
    pub fn new(out: W, brief: bool) -> Self {
        Self {
            out,
            brief,
            current_suite: None,
        }
    }

    pub fn header(&mut self, header: &ReportHeader) -> io::Result<()> {
        self.out.write_all(render_header(header).as_bytes())
    }

    pub fn test(&mut self, result: &TestResult, digits: u32) -> io::Result<()> {
        if self.current_suite.as_deref() != Some(result.suite.as_str()) {
            self.out.write_all(render_suite_header(&result.suite).as_bytes())?;
            self.current_suite = Some(result.suite.clone());
        }
        self.out
            .write_all(render_test(result, digits, self.brief).as_bytes())
    }

    pub fn summary(&mut self, aggregator: &Aggregator) -> io::Result<()> {
        self.out
            .write_all(render_summary(&aggregator.global(), aggregator.suites()).as_bytes())?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
