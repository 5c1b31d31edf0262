//! Structure-aware fuzzing of the comparator with every analyzer kind.
//!
//! Checks that comparison never panics and that a set compared with itself
//! passes under every analyzer.

#![no_main]

use arbitrary::Arbitrary;
use curvegate_domain::{Baseline, compare, new_analyzer};
use curvegate_types::{AnalyzerKind, CurveSet};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct FuzzPoint {
    curve: u8,
    timestep: f64,
    value: f64,
}

#[derive(Arbitrary, Debug)]
struct CompareInput {
    kind: AnalyzerKind,
    digits: u8,
    multiplier: f64,
    baseline: Vec<FuzzPoint>,
    test: Vec<FuzzPoint>,
}

fn curve_set(points: &[FuzzPoint]) -> CurveSet {
    let mut set = CurveSet::new();
    for p in points.iter().take(64) {
        if p.timestep.is_finite() && p.value.is_finite() {
            set.append(&format!("c{}", p.curve % 4), p.timestep, p.value);
        }
    }
    set
}

fuzz_target!(|input: CompareInput| {
    let digits = u32::from(input.digits % 17) + 1;
    let multiplier = if input.multiplier.is_finite() {
        input.multiplier.abs()
    } else {
        2.0
    };
    let baseline = curve_set(&input.baseline);
    let test = curve_set(&input.test);

    let mut analyzer = new_analyzer(input.kind, digits, multiplier);
    let _ = compare(Baseline::Answers(&baseline), &test, analyzer.as_mut());

    let outcome = compare(Baseline::Answers(&baseline), &baseline, analyzer.as_mut());
    assert!(outcome.passed, "self comparison failed: {:?}", outcome.records);
});
