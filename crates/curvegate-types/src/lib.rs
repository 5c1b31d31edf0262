//! Shared types for curvegate.
//!
//! Design goal: explicit, typed, boring.
//! The curve model is consumed by the parser and comparator; the outcome
//! and report structs are what ends up in `curvegate.report.v1` files.

mod curve;

pub use curve::{format_sci, Curve, CurveSet, StatsMap, Timestep, TimestepStats};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub const REPORT_SCHEMA_V1: &str = "curvegate.report.v1";

pub const MESSAGE_NO_MATCHING_TEST_RESULT: &str = "no matching test result";
pub const MESSAGE_UNKNOWN_TIMESTEP: &str = "is unknown timestep to baseline";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

// ----------------------------
// Analyzer selection
// ----------------------------

#[derive(
    Debug, Copy, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash,
)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerKind {
    /// Exact match after rounding to significant digits.
    #[default]
    Absolute,
    /// Historical min/max envelope.
    Range,
    /// Historical mean plus or minus a multiple of the standard deviation.
    Stddev,
}

impl AnalyzerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalyzerKind::Absolute => "absolute",
            AnalyzerKind::Range => "range",
            AnalyzerKind::Stddev => "stddev",
        }
    }

    /// Range and Stddev compare against statistics from historical runs.
    pub fn needs_history(self) -> bool {
        !matches!(self, AnalyzerKind::Absolute)
    }
}

impl fmt::Display for AnalyzerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown analyzer `{0}` (expected absolute|range|stddev)")]
pub struct UnknownAnalyzerKind(pub String);

impl FromStr for AnalyzerKind {
    type Err = UnknownAnalyzerKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "absolute" | "abs" => Ok(AnalyzerKind::Absolute),
            "range" => Ok(AnalyzerKind::Range),
            "stddev" => Ok(AnalyzerKind::Stddev),
            other => Err(UnknownAnalyzerKind(other.to_string())),
        }
    }
}

// ----------------------------
// Comparison records
// ----------------------------

/// One mismatching (or unmatched) timestep of one curve.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ComparisonRecord {
    pub timestep: f64,

    pub message: String,

    /// Reference value (or violated envelope bound), rounded for display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline: Option<f64>,

    /// Test value, rounded for display.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_value: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_error: Option<f64>,

    /// False when one side has no value at this timestep.
    pub valid: bool,
}

impl ComparisonRecord {
    /// A tolerance violation: both sides present.
    pub fn violation(
        timestep: f64,
        baseline: f64,
        test_value: f64,
        percent_error: f64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestep,
            message: message.into(),
            baseline: Some(baseline),
            test_value: Some(test_value),
            percent_error: Some(percent_error),
            valid: true,
        }
    }

    /// Baseline timestep with no value in the test output.
    pub fn no_matching_test_result(timestep: f64, baseline: Option<f64>) -> Self {
        Self {
            timestep,
            message: MESSAGE_NO_MATCHING_TEST_RESULT.to_string(),
            baseline,
            test_value: None,
            percent_error: None,
            valid: false,
        }
    }

    /// Test timestep the baseline knows nothing about.
    pub fn unknown_timestep(timestep: f64, test_value: Option<f64>) -> Self {
        Self {
            timestep,
            message: MESSAGE_UNKNOWN_TIMESTEP.to_string(),
            baseline: None,
            test_value,
            percent_error: None,
            valid: false,
        }
    }
}

/// Outcome of comparing one curve.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CurveReport {
    /// Baseline curve not generated by the test.
    MissingInTest,
    /// Test generated a curve the baseline does not have.
    UnknownCurve,
    /// Per-timestep mismatches, ascending by timestep.
    Timesteps {
        #[serde(with = "records_as_seq")]
        #[schemars(with = "Vec<ComparisonRecord>")]
        records: BTreeMap<Timestep, ComparisonRecord>,
    },
}

impl CurveReport {
    pub fn message(&self) -> Option<&'static str> {
        match self {
            CurveReport::MissingInTest => Some("Baseline curve not generated in test"),
            CurveReport::UnknownCurve => Some("Unknown curve generated"),
            CurveReport::Timesteps { .. } => None,
        }
    }
}

/// Comparison records for one test, keyed by curve name.
pub type CurveRecords = BTreeMap<String, CurveReport>;

mod records_as_seq {
    use super::{ComparisonRecord, Timestep};
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::BTreeMap;

    pub fn serialize<S: Serializer>(
        records: &BTreeMap<Timestep, ComparisonRecord>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(records.values())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<Timestep, ComparisonRecord>, D::Error> {
        let records = Vec::<ComparisonRecord>::deserialize(deserializer)?;
        Ok(records
            .into_iter()
            .map(|r| (Timestep(r.timestep), r))
            .collect())
    }
}

// ----------------------------
// Worst-case summary
// ----------------------------

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SamplePoint {
    pub curve: String,
    pub timestep: f64,
}

/// Worst-case errors observed across one comparison run.
///
/// All fields read zero (and the locations `None`) when no violation was
/// observed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct AnalysisSummary {
    pub max_error: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_error_at: Option<SamplePoint>,

    /// Percent error of the sample that produced `max_error`.
    pub percent_at_max_error: f64,

    pub max_percent_error: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_percent_error_at: Option<SamplePoint>,

    /// Absolute error of the sample that produced `max_percent_error`.
    pub error_at_max_percent: f64,

    /// Largest deviation in standard deviations (stddev analyzer only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_sigma: Option<f64>,
}

// ----------------------------
// Outcomes and counters
// ----------------------------

#[derive(Debug, Copy, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Passed,
    Failed,
    RunError,
    SetupFailure,
    InvalidTest,
}

impl OutcomeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OutcomeStatus::Passed => "passed",
            OutcomeStatus::Failed => "failed",
            OutcomeStatus::RunError => "run_error",
            OutcomeStatus::SetupFailure => "setup_failure",
            OutcomeStatus::InvalidTest => "invalid_test",
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal classification of one test execution.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TestOutcome {
    Passed {
        summary: AnalysisSummary,
    },
    Failed {
        summary: AnalysisSummary,
        records: CurveRecords,
    },
    /// The producing process terminated abnormally before comparison.
    RunError { message: String },
    /// Required input or baseline files were missing or unreadable.
    SetupFailure { messages: Vec<String> },
    /// The test is not in the suite's registry.
    InvalidTest { message: String },
}

impl TestOutcome {
    pub fn status(&self) -> OutcomeStatus {
        match self {
            TestOutcome::Passed { .. } => OutcomeStatus::Passed,
            TestOutcome::Failed { .. } => OutcomeStatus::Failed,
            TestOutcome::RunError { .. } => OutcomeStatus::RunError,
            TestOutcome::SetupFailure { .. } => OutcomeStatus::SetupFailure,
            TestOutcome::InvalidTest { .. } => OutcomeStatus::InvalidTest,
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, TestOutcome::Passed { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct TestResult {
    pub suite: String,
    pub test: String,
    pub outcome: TestOutcome,
}

/// Monotonic outcome counters for a suite or a whole run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Counters {
    pub total: u32,
    pub passed: u32,
    pub failed: u32,
    pub invalid: u32,
}

impl Counters {
    pub fn record(&mut self, status: OutcomeStatus) {
        self.total += 1;
        match status {
            OutcomeStatus::Passed => self.passed += 1,
            OutcomeStatus::Failed => self.failed += 1,
            OutcomeStatus::InvalidTest => self.invalid += 1,
            OutcomeStatus::RunError | OutcomeStatus::SetupFailure => {}
        }
    }

    /// Tests that neither passed, failed nor were invalid.
    pub fn abnormal(&self) -> u32 {
        self.total
            .saturating_sub(self.passed)
            .saturating_sub(self.failed)
            .saturating_sub(self.invalid)
    }

    /// Tests that neither passed nor failed (abnormal or invalid).
    pub fn not_run(&self) -> u32 {
        self.total
            .saturating_sub(self.passed)
            .saturating_sub(self.failed)
    }
}

// ----------------------------
// Report envelope
// ----------------------------

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct AnalysisSettings {
    pub mode: AnalyzerKind,
    pub significant_digits: u32,
    pub stddev_multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct RunReport {
    pub schema: String,
    pub tool: ToolInfo,
    pub run_id: String,
    pub generated_at: String,
    pub settings: AnalysisSettings,
    pub results: Vec<TestResult>,
    pub summary: Counters,
    pub suites: BTreeMap<String, Counters>,

    /// Settings a suite actually ran with, when they differ from `settings`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub suite_settings: BTreeMap<String, AnalysisSettings>,
}

impl RunReport {
    /// Settings used for `suite`, falling back to the run-level settings.
    pub fn settings_for(&self, suite: &str) -> &AnalysisSettings {
        self.suite_settings.get(suite).unwrap_or(&self.settings)
    }
}

// ----------------------------
// Config file schema
// ----------------------------

pub const DEFAULT_SIGNIFICANT_DIGITS: u32 = 6;
pub const DEFAULT_STDDEV_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_BASE_SUFFIX: &str = "answ";
pub const DEFAULT_OUTPUT_SUFFIX: &str = "jansw";

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub defaults: DefaultsConfig,

    #[serde(default, rename = "suite")]
    pub suites: Vec<SuiteConfig>,
}

impl ConfigFile {
    pub fn suite(&self, name: &str) -> Option<&SuiteConfig> {
        self.suites.iter().find(|s| s.name == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
pub struct DefaultsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<AnalyzerKind>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub significant_digits: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stddev_multiplier: Option<f64>,

    /// Root of `<suite>/<test>.<base_suffix>` baselines.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_dir: Option<String>,

    /// Root of `<suite>/<test>/<test>.<output_suffix>` run outputs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_suffix: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_suffix: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub brief: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SuiteConfig {
    pub name: String,

    /// Known tests for this suite.
    #[serde(default)]
    pub tests: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<AnalyzerKind>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub significant_digits: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stddev_multiplier: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_suffix: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_suffix: Option<String>,

    /// Suffix of a run log that must contain the normal-termination marker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_validation_suffix: Option<String>,
}

impl SuiteConfig {
    pub fn knows(&self, test: &str) -> bool {
        self.tests.iter().any(|t| t == test)
    }
}
