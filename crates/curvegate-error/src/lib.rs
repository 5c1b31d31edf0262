//! Unified error types for curvegate.
//!
//! Parse and file-level problems abort a single test; they are converted
//! into a `setup_failure` outcome at the application boundary and never
//! abort the batch.

use std::path::PathBuf;

/// What went wrong on a particular line of an answer or stats file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("data line has no curve name comment in scope")]
    OrphanData,

    #[error("expected `<time> <value>`, found {tokens} token(s)")]
    MalformedLine { tokens: usize },

    #[error("`{token}` is not a decimal number")]
    InvalidNumber { token: String },

    #[error("`{token}` is not a finite number")]
    NonFinite { token: String },

    #[error("malformed stats line: {reason}")]
    MalformedStats { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{source_name}:{line}: {kind}")]
pub struct ParseError {
    /// File name or other label for the text being parsed.
    pub source_name: String,
    /// 1-based line number.
    pub line: usize,
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub fn new(source_name: impl Into<String>, line: usize, kind: ParseErrorKind) -> Self {
        Self {
            source_name: source_name.into(),
            line,
            kind,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CurvegateError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("missing file {}", path.display())]
    MissingFile { path: PathBuf },

    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Config(String),

    #[error("no historical baseline runs found for test `{test}`")]
    NoHistory { test: String },
}

impl CurvegateError {
    /// True for problems that mean the test could not be set up, as opposed
    /// to tool-level failures.
    pub fn is_setup_failure(&self) -> bool {
        matches!(
            self,
            CurvegateError::Parse(_)
                | CurvegateError::MissingFile { .. }
                | CurvegateError::Io { .. }
                | CurvegateError::NoHistory { .. }
        )
    }
}

pub type Result<T, E = CurvegateError> = std::result::Result<T, E>;
