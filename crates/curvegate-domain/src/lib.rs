//! Domain logic for curvegate.
//!
//! This crate is intentionally I/O-free: it parses text, rounds numbers and
//! judges curves. Reading files and deciding which tests run live elsewhere.

mod analyzer;
mod answer;
mod compare;
mod rounding;

pub use analyzer::{
    AbsoluteAnalyzer, Analysis, Analyzer, RangeAnalyzer, Reference, StddevAnalyzer, Violation,
    new_analyzer, percent_error,
};
pub use answer::{parse_answer_texts, parse_answers, serialize_answers};
pub use compare::{Baseline, CompareOutcome, compare};
pub use rounding::round_to_significant_digits;
