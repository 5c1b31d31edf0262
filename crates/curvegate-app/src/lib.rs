//! Application layer for curvegate.
//!
//! The app layer coordinates adapters and domain logic.
//! It does not parse CLI flags and it does not touch the filesystem directly;
//! everything on disk is reached through [`curvegate_adapters::AnswerStore`].

mod aggregate;
mod check;
mod evaluate;
mod render;
mod report;
mod settings;

pub use aggregate::{Aggregator, fold_outcome};
pub use check::{CheckOutcome, CheckRequest, CheckUseCase};
pub use evaluate::{
    EvaluateRequest, EvaluateTestUseCase, RUN_ERROR_MESSAGE, StatsOutcome, StatsUseCase,
    outcome_from_comparison,
};
pub use render::{
    ReportHeader, TextReporter, render_header, render_run_report, render_suite_header,
    render_summary, render_test,
};
pub use report::{all_passed, build_run_report};
pub use settings::{Overrides, RunSettings, SuitePlan, parse_config};

pub trait Clock: Send + Sync {
    fn now_rfc3339(&self) -> String;
}

#[derive(Debug, Default, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_rfc3339(&self) -> String {
        use time::format_description::well_known::Rfc3339;
        time::OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
    }
}
