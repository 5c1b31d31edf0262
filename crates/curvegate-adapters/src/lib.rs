//! Std adapters for curvegate.
//!
//! In clean-arch terms: this is where we touch the world. Everything that
//! knows where answer files live on disk is in here.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use curvegate_error::{CurvegateError, Result};
use curvegate_types::{CurveSet, DEFAULT_BASE_SUFFIX, DEFAULT_OUTPUT_SUFFIX, StatsMap};
use tracing::debug;

/// Marker a run log must contain when the producing code terminated normally.
pub const NORMAL_TERMINATION_MARKER: &str = "n o r m a l";

/// Where baselines and run outputs live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    pub baseline_dir: PathBuf,
    pub output_dir: PathBuf,
    pub base_suffix: String,
    pub output_suffix: String,
}

impl Default for StoreLayout {
    fn default() -> Self {
        Self {
            baseline_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            base_suffix: DEFAULT_BASE_SUFFIX.to_string(),
            output_suffix: DEFAULT_OUTPUT_SUFFIX.to_string(),
        }
    }
}

/// One test within a suite, resolved against a [`StoreLayout`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestLocation {
    pub suite: String,
    pub test: String,
    pub layout: StoreLayout,
}

impl TestLocation {
    pub fn new(suite: impl Into<String>, test: impl Into<String>, layout: StoreLayout) -> Self {
        Self {
            suite: suite.into(),
            test: test.into(),
            layout,
        }
    }

    /// `<baseline_dir>/<suite>`
    pub fn suite_baseline_dir(&self) -> PathBuf {
        self.layout.baseline_dir.join(&self.suite)
    }

    /// `<baseline_dir>/<suite>/<test>.<base_suffix>`
    pub fn baseline_file(&self) -> PathBuf {
        self.suite_baseline_dir()
            .join(format!("{}.{}", self.test, self.layout.base_suffix))
    }

    /// `<output_dir>/<suite>/<test>`
    pub fn run_dir(&self) -> PathBuf {
        self.layout.output_dir.join(&self.suite).join(&self.test)
    }

    /// `<run_dir>/<test>.<output_suffix>`
    pub fn output_file(&self) -> PathBuf {
        self.run_dir()
            .join(format!("{}.{}", self.test, self.layout.output_suffix))
    }

    /// `<run_dir>/<test>.stats`
    pub fn stats_file(&self) -> PathBuf {
        self.run_dir().join(format!("{}.stats", self.test))
    }

    /// `<run_dir>/<test><suffix>`; `suffix` usually starts with a dot.
    pub fn run_log_file(&self, suffix: &str) -> PathBuf {
        self.run_dir().join(format!("{}{}", self.test, suffix))
    }

    /// Glob for historical runs: any depth of subdirectories below the
    /// suite baseline directory, never the directory itself.
    pub fn history_pattern(&self) -> String {
        let dir = glob::Pattern::escape(&self.suite_baseline_dir().to_string_lossy());
        let file = glob::Pattern::escape(&format!("{}.{}", self.test, self.layout.base_suffix));
        format!("{dir}/*/**/{file}")
    }
}

/// Source of answer data for the evaluate use case.
pub trait AnswerStore {
    /// The accepted single baseline.
    fn load_baseline(&self, location: &TestLocation) -> Result<CurveSet>;

    /// The freshly generated output.
    fn load_output(&self, location: &TestLocation) -> Result<CurveSet>;

    /// Every historical baseline run, one [`CurveSet`] per run.
    fn load_history(&self, location: &TestLocation) -> Result<Vec<CurveSet>>;

    /// Persist computed stats; returns the written path.
    fn save_stats(&self, location: &TestLocation, stats: &StatsMap) -> Result<PathBuf>;

    /// Whether the run log named by `suffix` carries the normal-termination marker.
    /// A missing log counts as abnormal termination.
    fn terminated_normally(&self, location: &TestLocation, suffix: &str) -> Result<bool>;
}

impl<T: AnswerStore + ?Sized> AnswerStore for &T {
    fn load_baseline(&self, location: &TestLocation) -> Result<CurveSet> {
        (**self).load_baseline(location)
    }

    fn load_output(&self, location: &TestLocation) -> Result<CurveSet> {
        (**self).load_output(location)
    }

    fn load_history(&self, location: &TestLocation) -> Result<Vec<CurveSet>> {
        (**self).load_history(location)
    }

    fn save_stats(&self, location: &TestLocation, stats: &StatsMap) -> Result<PathBuf> {
        (**self).save_stats(location, stats)
    }

    fn terminated_normally(&self, location: &TestLocation, suffix: &str) -> Result<bool> {
        (**self).terminated_normally(location, suffix)
    }
}

#[derive(Debug, Default, Clone)]
pub struct FsAnswerStore;

impl AnswerStore for FsAnswerStore {
    fn load_baseline(&self, location: &TestLocation) -> Result<CurveSet> {
        read_answer_file(&location.baseline_file())
    }

    fn load_output(&self, location: &TestLocation) -> Result<CurveSet> {
        read_answer_file(&location.output_file())
    }

    fn load_history(&self, location: &TestLocation) -> Result<Vec<CurveSet>> {
        let paths = discover_history(location)?;
        if paths.is_empty() {
            return Err(CurvegateError::NoHistory {
                test: location.test.clone(),
            });
        }
        paths.iter().map(|p| read_answer_file(p)).collect()
    }

    fn save_stats(&self, location: &TestLocation, stats: &StatsMap) -> Result<PathBuf> {
        let path = location.stats_file();
        write_stats_file(&path, stats)?;
        Ok(path)
    }

    fn terminated_normally(&self, location: &TestLocation, suffix: &str) -> Result<bool> {
        let path = location.run_log_file(suffix);
        match fs::read(&path) {
            Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).contains(NORMAL_TERMINATION_MARKER)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "run log missing");
                Ok(false)
            }
            Err(source) => Err(CurvegateError::Io { path, source }),
        }
    }
}

/// Historical baseline files for `location`, sorted by path.
pub fn discover_history(location: &TestLocation) -> Result<Vec<PathBuf>> {
    let pattern = location.history_pattern();
    let entries = glob::glob(&pattern)
        .map_err(|e| CurvegateError::Config(format!("bad history pattern {pattern}: {e}")))?;

    let mut paths = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => paths.push(path),
            Ok(_) => {}
            Err(e) => {
                let path = e.path().to_path_buf();
                return Err(CurvegateError::Io {
                    path,
                    source: e.into_error(),
                });
            }
        }
    }
    paths.sort();
    debug!(pattern = %pattern, runs = paths.len(), "discovered historical runs");
    Ok(paths)
}

/// Read and parse one answer file.
pub fn read_answer_file(path: &Path) -> Result<CurveSet> {
    let text = read_text(path)?;
    let set = curvegate_domain::parse_answers(&path.display().to_string(), &text)?;
    debug!(path = %path.display(), curves = set.len(), "parsed answer file");
    Ok(set)
}

/// Read and merge several answer files (e.g. per-process partitions).
pub fn read_answer_files(paths: &[PathBuf]) -> Result<CurveSet> {
    let mut merged = CurveSet::new();
    for path in paths {
        merged.merge(read_answer_file(path)?);
    }
    Ok(merged)
}

pub fn read_stats_file(path: &Path) -> Result<StatsMap> {
    let text = read_text(path)?;
    Ok(curvegate_stats::parse_stats(
        &path.display().to_string(),
        &text,
    )?)
}

pub fn write_stats_file(path: &Path, stats: &StatsMap) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(|source| CurvegateError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, curvegate_stats::render_stats(stats)).map_err(|source| {
        CurvegateError::Io {
            path: path.to_path_buf(),
            source,
        }
    })?;
    debug!(path = %path.display(), curves = stats.len(), "wrote stats file");
    Ok(())
}

fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            CurvegateError::MissingFile {
                path: path.to_path_buf(),
            }
        } else {
            CurvegateError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}
