//! Tolerance analyzers.
//!
//! Every analyzer decides pass/fail for one sample against a [`Reference`]
//! and keeps worst-case error tracking for the whole comparison run.
//! Tracking is updated only by violations; a strictly larger error replaces
//! the previous worst case, so ties keep the first one seen.

use curvegate_types::{AnalysisSummary, AnalyzerKind, SamplePoint, TimestepStats};

use crate::rounding::round_to_significant_digits;

/// What a test value is judged against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reference {
    /// A single accepted baseline value.
    Value(f64),
    /// Statistics over historical baseline runs.
    Envelope(TimestepStats),
}

impl Reference {
    /// Point value: the value itself, or the envelope mean.
    pub fn center(&self) -> f64 {
        match self {
            Reference::Value(v) => *v,
            Reference::Envelope(s) => s.mean,
        }
    }

    fn min_max(&self) -> (f64, f64) {
        match self {
            Reference::Value(v) => (*v, *v),
            Reference::Envelope(s) => (s.min, s.max),
        }
    }

    fn mean_stddev(&self) -> (f64, f64) {
        match self {
            Reference::Value(v) => (*v, 0.0),
            Reference::Envelope(s) => (s.mean, s.stddev),
        }
    }
}

/// A failed sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// The baseline value, or the envelope bound that was crossed.
    pub baseline: f64,
    pub test: f64,
    pub error: f64,
    pub percent_error: f64,
    /// Distance from the mean in standard deviations (stddev analyzer).
    pub sigma: Option<f64>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Analysis {
    Pass,
    Fail(Violation),
}

impl Analysis {
    pub fn is_pass(&self) -> bool {
        matches!(self, Analysis::Pass)
    }
}

/// A tolerance strategy.
pub trait Analyzer {
    fn kind(&self) -> AnalyzerKind;

    /// Clear worst-case tracking.
    fn reset(&mut self);

    fn configure(&mut self, significant_digits: u32, stddev_multiplier: f64);

    /// Digits used for display rounding and, where relevant, for comparison.
    fn significant_digits(&self) -> u32;

    /// Judge one sample located at `curve`/`timestep`.
    fn analyze(&mut self, curve: &str, timestep: f64, reference: &Reference, test: f64)
    -> Analysis;

    /// Worst case so far; zeros when nothing was violated.
    fn summary(&self) -> AnalysisSummary;
}

/// Build an analyzer of the requested kind.
pub fn new_analyzer(
    kind: AnalyzerKind,
    significant_digits: u32,
    stddev_multiplier: f64,
) -> Box<dyn Analyzer> {
    let mut analyzer: Box<dyn Analyzer> = match kind {
        AnalyzerKind::Absolute => Box::new(AbsoluteAnalyzer::default()),
        AnalyzerKind::Range => Box::new(RangeAnalyzer::default()),
        AnalyzerKind::Stddev => Box::new(StddevAnalyzer::default()),
    };
    analyzer.configure(significant_digits, stddev_multiplier);
    analyzer
}

/// `|baseline - test| / |baseline| * 100`, or 100 when the baseline is zero.
pub fn percent_error(baseline: f64, test: f64) -> f64 {
    if baseline == 0.0 {
        100.0
    } else {
        (baseline - test).abs() / baseline.abs() * 100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Settings {
    significant_digits: u32,
    stddev_multiplier: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            significant_digits: curvegate_types::DEFAULT_SIGNIFICANT_DIGITS,
            stddev_multiplier: curvegate_types::DEFAULT_STDDEV_MULTIPLIER,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Located {
    value: f64,
    at: Option<SamplePoint>,
    associated: f64,
}

impl Located {
    fn sentinel() -> Self {
        Self {
            value: f64::NEG_INFINITY,
            at: None,
            associated: 0.0,
        }
    }

    fn offer(&mut self, value: f64, associated: f64, curve: &str, timestep: f64) {
        if value > self.value {
            self.value = value;
            self.associated = associated;
            self.at = Some(SamplePoint {
                curve: curve.to_string(),
                timestep,
            });
        }
    }

    fn reported(&self) -> f64 {
        if self.at.is_some() { self.value } else { 0.0 }
    }
}

/// Running worst case across one comparison.
#[derive(Debug, Clone, PartialEq)]
struct WorstCase {
    error: Located,
    percent: Located,
    sigma: f64,
}

impl Default for WorstCase {
    fn default() -> Self {
        Self {
            error: Located::sentinel(),
            percent: Located::sentinel(),
            sigma: f64::NEG_INFINITY,
        }
    }
}

impl WorstCase {
    fn record(&mut self, curve: &str, timestep: f64, violation: &Violation) {
        self.error
            .offer(violation.error, violation.percent_error, curve, timestep);
        self.percent
            .offer(violation.percent_error, violation.error, curve, timestep);
        if let Some(sigma) = violation.sigma
            && sigma > self.sigma
        {
            self.sigma = sigma;
        }
    }

    fn summary(&self, with_sigma: bool) -> AnalysisSummary {
        AnalysisSummary {
            max_error: self.error.reported(),
            max_error_at: self.error.at.clone(),
            percent_at_max_error: self.error.associated,
            max_percent_error: self.percent.reported(),
            max_percent_error_at: self.percent.at.clone(),
            error_at_max_percent: self.percent.associated,
            max_sigma: with_sigma.then(|| self.sigma.max(0.0)),
        }
    }
}

/// Exact match once both sides are rounded to the configured significant digits.
#[derive(Debug, Clone, Default)]
pub struct AbsoluteAnalyzer {
    settings: Settings,
    worst: WorstCase,
}

impl Analyzer for AbsoluteAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Absolute
    }

    fn reset(&mut self) {
        self.worst = WorstCase::default();
    }

    fn configure(&mut self, significant_digits: u32, stddev_multiplier: f64) {
        self.settings = Settings {
            significant_digits,
            stddev_multiplier,
        };
    }

    fn significant_digits(&self) -> u32 {
        self.settings.significant_digits
    }

    fn analyze(
        &mut self,
        curve: &str,
        timestep: f64,
        reference: &Reference,
        test: f64,
    ) -> Analysis {
        let baseline = reference.center();
        let digits = self.settings.significant_digits;
        if round_to_significant_digits(baseline, digits)
            == round_to_significant_digits(test, digits)
        {
            return Analysis::Pass;
        }

        let violation = Violation {
            baseline,
            test,
            error: (baseline - test).abs(),
            percent_error: percent_error(baseline, test),
            sigma: None,
            message: "Curve analysis failed".to_string(),
        };
        self.worst.record(curve, timestep, &violation);
        Analysis::Fail(violation)
    }

    fn summary(&self) -> AnalysisSummary {
        self.worst.summary(false)
    }
}

/// Historical min/max envelope. Bounds and test value are both rounded to the
/// configured digits before the check.
#[derive(Debug, Clone, Default)]
pub struct RangeAnalyzer {
    settings: Settings,
    worst: WorstCase,
}

impl Analyzer for RangeAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Range
    }

    fn reset(&mut self) {
        self.worst = WorstCase::default();
    }

    fn configure(&mut self, significant_digits: u32, stddev_multiplier: f64) {
        self.settings = Settings {
            significant_digits,
            stddev_multiplier,
        };
    }

    fn significant_digits(&self) -> u32 {
        self.settings.significant_digits
    }

    fn analyze(
        &mut self,
        curve: &str,
        timestep: f64,
        reference: &Reference,
        test: f64,
    ) -> Analysis {
        let digits = self.settings.significant_digits;
        let (min, max) = reference.min_max();
        let min = round_to_significant_digits(min, digits);
        let max = round_to_significant_digits(max, digits);
        let test = round_to_significant_digits(test, digits);

        let (bound, message) = if test < min {
            (min, "below minimum range")
        } else if test > max {
            (max, "above maximum range")
        } else {
            return Analysis::Pass;
        };

        let violation = Violation {
            baseline: bound,
            test,
            error: (bound - test).abs(),
            percent_error: percent_error(bound, test),
            sigma: None,
            message: message.to_string(),
        };
        self.worst.record(curve, timestep, &violation);
        Analysis::Fail(violation)
    }

    fn summary(&self) -> AnalysisSummary {
        self.worst.summary(false)
    }
}

/// `mean ± multiplier·stddev` envelope.
#[derive(Debug, Clone, Default)]
pub struct StddevAnalyzer {
    settings: Settings,
    worst: WorstCase,
}

impl Analyzer for StddevAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Stddev
    }

    fn reset(&mut self) {
        self.worst = WorstCase::default();
    }

    fn configure(&mut self, significant_digits: u32, stddev_multiplier: f64) {
        self.settings = Settings {
            significant_digits,
            stddev_multiplier,
        };
    }

    fn significant_digits(&self) -> u32 {
        self.settings.significant_digits
    }

    fn analyze(
        &mut self,
        curve: &str,
        timestep: f64,
        reference: &Reference,
        test: f64,
    ) -> Analysis {
        let multiplier = self.settings.stddev_multiplier;
        let (mean, stddev) = reference.mean_stddev();
        let lower = mean - multiplier * stddev;
        let upper = mean + multiplier * stddev;

        let bound = if test < lower {
            lower
        } else if test > upper {
            upper
        } else {
            return Analysis::Pass;
        };

        let error = (bound - test).abs();
        let sigma = if stddev == 0.0 {
            error
        } else {
            (test - mean).abs() / stddev
        };
        let violation = Violation {
            baseline: bound,
            test,
            error,
            percent_error: percent_error(bound, test),
            sigma: Some(sigma),
            message: format!("Outside {multiplier} standard deviations"),
        };
        self.worst.record(curve, timestep, &violation);
        Analysis::Fail(violation)
    }

    fn summary(&self) -> AnalysisSummary {
        self.worst.summary(true)
    }
}
