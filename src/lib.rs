//! Curvegate workspace-level test utilities.
//!
//! This crate exists solely to host workspace-level integration tests,
//! particularly the BDD/cucumber tests in `tests/cucumber.rs`.
//!
//! The actual curvegate functionality is in the workspace member crates:
//! - `curvegate-types`: Curve model, outcomes, config and report schemas
//! - `curvegate-domain`: Answer-file parsing, rounding, analyzers, comparator
//! - `curvegate-stats`: Statistics over historical runs
//! - `curvegate-adapters`: Filesystem answer store
//! - `curvegate-app`: Use cases and the text log
//! - `curvegate-cli`: The `curvegate` binary
