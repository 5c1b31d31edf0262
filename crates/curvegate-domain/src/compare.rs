//! Curve-set comparison.

use std::collections::{BTreeMap, BTreeSet};

use curvegate_types::{
    AnalysisSummary, ComparisonRecord, CurveRecords, CurveReport, CurveSet, StatsMap, Timestep,
};

use crate::analyzer::{Analysis, Analyzer, Reference};
use crate::rounding::round_to_significant_digits;

/// What the test output is compared against.
#[derive(Debug, Clone, Copy)]
pub enum Baseline<'a> {
    /// A single accepted answer set.
    Answers(&'a CurveSet),
    /// Statistics over historical runs.
    Stats(&'a StatsMap),
}

impl Baseline<'_> {
    fn curve_names(&self) -> BTreeSet<&str> {
        match self {
            Baseline::Answers(set) => set.names().collect(),
            Baseline::Stats(stats) => stats.curve_names().collect(),
        }
    }

    fn timesteps(&self, curve: &str) -> Vec<f64> {
        match self {
            Baseline::Answers(set) => set
                .get(curve)
                .map(|c| c.timesteps().collect())
                .unwrap_or_default(),
            Baseline::Stats(stats) => stats.timesteps(curve).collect(),
        }
    }

    /// The stored timestep matching `timestep`, with its reference.
    fn lookup(&self, curve: &str, timestep: f64) -> Option<(f64, Reference)> {
        match self {
            Baseline::Answers(set) => set
                .get(curve)?
                .first_value_at(timestep)
                .map(|v| (timestep, Reference::Value(v))),
            Baseline::Stats(stats) => stats
                .resolve(curve, timestep)
                .map(|(key, s)| (key, Reference::Envelope(*s))),
        }
    }
}

/// Result of one comparison run.
#[derive(Debug, Clone, PartialEq)]
pub struct CompareOutcome {
    pub passed: bool,
    pub records: CurveRecords,
    pub summary: AnalysisSummary,
}

/// Compare `test` against `baseline` with `analyzer`.
///
/// The analyzer is reset once up front; its worst-case summary therefore
/// covers the whole run. Curves are visited in name order and timesteps in
/// ascending order, so records and tie-breaks are deterministic.
pub fn compare(
    baseline: Baseline<'_>,
    test: &CurveSet,
    analyzer: &mut dyn Analyzer,
) -> CompareOutcome {
    analyzer.reset();
    let digits = analyzer.significant_digits();

    let baseline_names = baseline.curve_names();
    let names: BTreeSet<&str> = baseline_names
        .iter()
        .copied()
        .chain(test.names())
        .collect();

    let mut records = CurveRecords::new();
    for name in names {
        let Some(test_curve) = test.get(name) else {
            records.insert(name.to_string(), CurveReport::MissingInTest);
            continue;
        };
        if !baseline_names.contains(name) {
            records.insert(name.to_string(), CurveReport::UnknownCurve);
            continue;
        }

        let mut curve_records = BTreeMap::new();
        let mut matched = BTreeSet::new();

        for timestep in test_curve.timesteps() {
            let test_value = test_curve.first_value_at(timestep);
            match (baseline.lookup(name, timestep), test_value) {
                (Some((key, reference)), Some(value)) => {
                    matched.insert(Timestep(key));
                    if let Analysis::Fail(v) =
                        analyzer.analyze(name, timestep, &reference, value)
                    {
                        curve_records.insert(
                            Timestep(timestep),
                            ComparisonRecord::violation(
                                timestep,
                                round_to_significant_digits(v.baseline, digits),
                                round_to_significant_digits(v.test, digits),
                                v.percent_error,
                                v.message,
                            ),
                        );
                    }
                }
                (_, value) => {
                    curve_records.insert(
                        Timestep(timestep),
                        ComparisonRecord::unknown_timestep(
                            timestep,
                            value.map(|v| round_to_significant_digits(v, digits)),
                        ),
                    );
                }
            }
        }

        for timestep in baseline.timesteps(name) {
            if matched.contains(&Timestep(timestep)) {
                continue;
            }
            let reference = baseline
                .lookup(name, timestep)
                .map(|(_, r)| round_to_significant_digits(r.center(), digits));
            curve_records
                .entry(Timestep(timestep))
                .or_insert_with(|| ComparisonRecord::no_matching_test_result(timestep, reference));
        }

        if !curve_records.is_empty() {
            records.insert(
                name.to_string(),
                CurveReport::Timesteps {
                    records: curve_records,
                },
            );
        }
    }

    CompareOutcome {
        passed: records.is_empty(),
        records,
        summary: analyzer.summary(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::new_analyzer;
    use approx::assert_relative_eq;
    use curvegate_types::{
        AnalyzerKind, MESSAGE_NO_MATCHING_TEST_RESULT, MESSAGE_UNKNOWN_TIMESTEP, TimestepStats,
    };

    fn set(points: &[(&str, f64, f64)]) -> CurveSet {
        let mut s = CurveSet::new();
        for (c, t, v) in points {
            s.append(c, *t, *v);
        }
        s
    }

    fn timestep_records<'a>(
        outcome: &'a CompareOutcome,
        curve: &str,
    ) -> &'a BTreeMap<Timestep, ComparisonRecord> {
        match outcome.records.get(curve) {
            Some(CurveReport::Timesteps { records }) => records,
            other => panic!("expected timestep records for {curve}, got {other:?}"),
        }
    }

    #[test]
    fn scenario_a_passes_at_four_digits() {
        let base = set(&[("accx", 0.0, 1.0), ("accx", 1.0, 2.0)]);
        let test = set(&[("accx", 0.0, 1.00001), ("accx", 1.0, 2.0)]);
        let mut a = new_analyzer(AnalyzerKind::Absolute, 4, 2.0);

        let out = compare(Baseline::Answers(&base), &test, a.as_mut());
        assert!(out.passed);
        assert!(out.records.is_empty());
        assert_eq!(out.summary, AnalysisSummary::default());
    }

    #[test]
    fn scenario_b_fails_at_six_digits() {
        let base = set(&[("accx", 0.0, 1.0), ("accx", 1.0, 2.0)]);
        let test = set(&[("accx", 0.0, 1.00001), ("accx", 1.0, 2.0)]);
        let mut a = new_analyzer(AnalyzerKind::Absolute, 6, 2.0);

        let out = compare(Baseline::Answers(&base), &test, a.as_mut());
        assert!(!out.passed);
        let recs = timestep_records(&out, "accx");
        assert_eq!(recs.len(), 1);
        let r = &recs[&Timestep(0.0)];
        assert!(r.valid);
        assert_eq!(r.baseline, Some(1.0));
        assert_eq!(r.test_value, Some(1.00001));
        assert_relative_eq!(r.percent_error.unwrap(), 0.001, epsilon = 1e-9);

        let at = out.summary.max_error_at.as_ref().unwrap();
        assert_eq!((at.curve.as_str(), at.timestep), ("accx", 0.0));
    }

    #[test]
    fn scenario_c_range_reports_upper_bound() {
        let mut stats = StatsMap::new();
        stats.insert(
            "vel",
            0.0,
            TimestepStats {
                min: 1.0,
                max: 2.0,
                mean: 1.5,
                stddev: 0.5,
            },
        );
        let test = set(&[("vel", 0.0, 2.5)]);
        let mut a = new_analyzer(AnalyzerKind::Range, 6, 2.0);

        let out = compare(Baseline::Stats(&stats), &test, a.as_mut());
        assert!(!out.passed);
        let r = &timestep_records(&out, "vel")[&Timestep(0.0)];
        assert_eq!(r.baseline, Some(2.0));
        assert_eq!(r.message, "above maximum range");
        assert_relative_eq!(out.summary.max_error, 0.5);
    }

    #[test]
    fn scenario_d_unknown_timestep() {
        let base = set(&[("ke", 0.0, 1.0)]);
        let test = set(&[("ke", 0.0, 1.0), ("ke", 5.0, 3.0)]);
        let mut a = new_analyzer(AnalyzerKind::Absolute, 6, 2.0);

        let out = compare(Baseline::Answers(&base), &test, a.as_mut());
        assert!(!out.passed);
        let r = &timestep_records(&out, "ke")[&Timestep(5.0)];
        assert!(!r.valid);
        assert_eq!(r.message, MESSAGE_UNKNOWN_TIMESTEP);
        assert_eq!(r.test_value, Some(3.0));
        assert_eq!(r.percent_error, None);
    }

    #[test]
    fn scenario_e_missing_curve() {
        let base = set(&[("a", 0.0, 1.0), ("b", 0.0, 1.0)]);
        let test = set(&[("a", 0.0, 1.0)]);
        let mut a = new_analyzer(AnalyzerKind::Absolute, 6, 2.0);

        let out = compare(Baseline::Answers(&base), &test, a.as_mut());
        assert!(!out.passed);
        assert_eq!(out.records.get("b"), Some(&CurveReport::MissingInTest));
        assert!(!out.records.contains_key("a"));
    }

    #[test]
    fn missing_test_timestep_is_invalid_record() {
        let base = set(&[("ke", 0.0, 1.0), ("ke", 1.0, 2.0)]);
        let test = set(&[("ke", 0.0, 1.0)]);
        let mut a = new_analyzer(AnalyzerKind::Absolute, 6, 2.0);

        let out = compare(Baseline::Answers(&base), &test, a.as_mut());
        let r = &timestep_records(&out, "ke")[&Timestep(1.0)];
        assert!(!r.valid);
        assert_eq!(r.message, MESSAGE_NO_MATCHING_TEST_RESULT);
        assert_eq!(r.baseline, Some(2.0));
        assert_eq!(r.test_value, None);
    }

    #[test]
    fn extra_test_curve_is_unknown() {
        let base = set(&[("a", 0.0, 1.0)]);
        let test = set(&[("a", 0.0, 1.0), ("z", 0.0, 1.0)]);
        let mut a = new_analyzer(AnalyzerKind::Absolute, 6, 2.0);

        let out = compare(Baseline::Answers(&base), &test, a.as_mut());
        assert!(!out.passed);
        assert_eq!(out.records.get("z"), Some(&CurveReport::UnknownCurve));
    }

    #[test]
    fn stats_timesteps_match_through_stats_precision() {
        let mut stats = StatsMap::new();
        let s = TimestepStats {
            min: 0.0,
            max: 1.0,
            mean: 0.5,
            stddev: 0.1,
        };
        stats.insert("v", 1.2e-3, s);
        stats.insert("v", 2.5e-3, s);
        let test = set(&[("v", 1.23e-3, 0.5)]);
        let mut a = new_analyzer(AnalyzerKind::Stddev, 6, 2.0);

        let out = compare(Baseline::Stats(&stats), &test, a.as_mut());
        let recs = timestep_records(&out, "v");
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[&Timestep(2.5e-3)].message, MESSAGE_NO_MATCHING_TEST_RESULT);
        assert_eq!(recs[&Timestep(2.5e-3)].baseline, Some(0.5));
    }

    #[test]
    fn display_values_are_rounded() {
        let base = set(&[("x", 0.0, 1.23456789)]);
        let test = set(&[("x", 0.0, 1.23556789)]);
        let mut a = new_analyzer(AnalyzerKind::Absolute, 4, 2.0);

        let out = compare(Baseline::Answers(&base), &test, a.as_mut());
        let r = &timestep_records(&out, "x")[&Timestep(0.0)];
        assert_eq!(r.baseline, Some(1.235));
        assert_eq!(r.test_value, Some(1.236));
    }

    #[test]
    fn compare_resets_previous_run() {
        let base = set(&[("x", 0.0, 1.0)]);
        let bad = set(&[("x", 0.0, 9.0)]);
        let mut a = new_analyzer(AnalyzerKind::Absolute, 6, 2.0);

        let first = compare(Baseline::Answers(&base), &bad, a.as_mut());
        assert!(first.summary.max_error > 0.0);
        let second = compare(Baseline::Answers(&base), &base, a.as_mut());
        assert!(second.passed);
        assert_eq!(second.summary, AnalysisSummary::default());
    }

    #[test]
    fn worst_case_ties_keep_earliest_timestep() {
        let base = set(&[("x", 0.0, 1.0), ("x", 1.0, 1.0), ("x", 2.0, 1.0)]);
        let test = set(&[("x", 0.0, 1.0), ("x", 1.0, 3.0), ("x", 2.0, 3.0)]);
        let mut a = new_analyzer(AnalyzerKind::Absolute, 6, 2.0);

        let out = compare(Baseline::Answers(&base), &test, a.as_mut());
        let at = out.summary.max_error_at.unwrap();
        assert_eq!(at.timestep, 1.0);
        let at = out.summary.max_percent_error_at.unwrap();
        assert_eq!(at.timestep, 1.0);
    }
}
