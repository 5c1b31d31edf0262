//! Outcome folding into suite and global counters.

use std::collections::BTreeMap;

use curvegate_types::{Counters, TestOutcome, TestResult};

/// Fold one terminal outcome into the suite's and the run's counters.
pub fn fold_outcome(outcome: &TestOutcome, suite: &mut Counters, global: &mut Counters) {
    let status = outcome.status();
    suite.record(status);
    global.record(status);
}

/// Run-wide counters plus one set per suite, in suite-name order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregator {
    global: Counters,
    suites: BTreeMap<String, Counters>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fold(&mut self, result: &TestResult) {
        let suite = self.suites.entry(result.suite.clone()).or_default();
        fold_outcome(&result.outcome, suite, &mut self.global);
    }

    pub fn global(&self) -> Counters {
        self.global
    }

    pub fn suite(&self, name: &str) -> Option<Counters> {
        self.suites.get(name).copied()
    }

    pub fn suites(&self) -> &BTreeMap<String, Counters> {
        &self.suites
    }

    pub fn into_parts(self) -> (Counters, BTreeMap<String, Counters>) {
        (self.global, self.suites)
    }
}
